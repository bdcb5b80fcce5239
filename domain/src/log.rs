//! Event log port the registry reports into.
//!
//! The sink is fire-and-forget: `log` has no return value and implementations
//! must swallow their own failures so that registry operations never depend
//! on logging succeeding.

use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Which part of the application an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogCategory {
    Redirect,
    Component,
    Page,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Redirect => "redirect",
            LogCategory::Component => "component",
            LogCategory::Page => "page",
        }
    }
}

pub trait EventLog: Send + Sync {
    fn log(&self, level: LogLevel, category: LogCategory, message: &str);

    fn info(&self, category: LogCategory, message: &str) {
        self.log(LogLevel::Info, category, message)
    }

    fn error(&self, category: LogCategory, message: &str) {
        self.log(LogLevel::Error, category, message)
    }
}

impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    fn log(&self, level: LogLevel, category: LogCategory, message: &str) {
        (**self).log(level, category, message)
    }
}

/// Forwards events to `tracing`, with the category as a structured field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn log(&self, level: LogLevel, category: LogCategory, message: &str) {
        let category = category.as_str();
        match level {
            LogLevel::Info => tracing::info!(category, "{message}"),
            LogLevel::Error => tracing::error!(category, "{message}"),
        }
    }
}
