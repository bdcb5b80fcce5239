//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::adapters::memory_kv::InMemoryKv;
use crate::log::{EventLog, LogCategory, LogLevel};
use crate::{Clock, KeyValueStore, Shortcode, ShortcodeGenerator, StorageError};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Hands out a fixed sequence of codes.
pub struct ScriptedGenerator(Mutex<VecDeque<String>>);

impl ScriptedGenerator {
    pub fn new(codes: &[&str]) -> Self {
        Self(Mutex::new(codes.iter().map(|c| c.to_string()).collect()))
    }
}

impl ShortcodeGenerator for ScriptedGenerator {
    fn draw(&self) -> Shortcode {
        let next = self
            .0
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted generator ran out of codes");
        Shortcode::new(next).unwrap()
    }
}

/// Keeps every event so tests can assert on them.
#[derive(Default)]
pub struct RecordingLog(Mutex<Vec<(LogLevel, LogCategory, String)>>);

impl RecordingLog {
    pub fn events(&self) -> Vec<(LogLevel, LogCategory, String)> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, level: LogLevel, category: LogCategory) -> usize {
        self.events()
            .iter()
            .filter(|(l, c, _)| *l == level && *c == category)
            .count()
    }
}

impl EventLog for RecordingLog {
    fn log(&self, level: LogLevel, category: LogCategory, message: &str) {
        if let Ok(mut events) = self.0.lock() {
            events.push((level, category, message.to_string()));
        }
    }
}

/// Backend whose writes always fail, e.g. a full quota.
#[derive(Default)]
pub struct ReadOnlyKv(InMemoryKv);

impl ReadOnlyKv {
    pub fn seeded(key: &str, value: &str) -> Self {
        let kv = InMemoryKv::new();
        kv.set(key, value).unwrap();
        Self(kv)
    }
}

impl KeyValueStore for ReadOnlyKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("quota exceeded".into()))
    }
}
