//! Domain library for the link registry.
//!
//! Holds the link data model, the ports (traits) the registry talks to, and
//! the error definitions. The persisted collection is a single serialized
//! record in a [`KeyValueStore`]; [`store::LinkStore`] is the only code that
//! reads or writes it and [`service::LinkService`] layers the business rules
//! on top. Keep concrete storage backends and presentation out of this crate.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a short link, unique among the links present when it was
/// created.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shortcode(String);

impl Shortcode {
    /// Build a shortcode from user input. Surrounding whitespace is dropped.
    pub fn new<S: Into<String>>(s: S) -> Result<Self, ShortcodeError> {
        let val = s.into();
        let trimmed = val.trim();
        if trimmed.is_empty() {
            return Err(ShortcodeError::Blank);
        }
        if trimmed.len() == val.len() {
            Ok(Self(val))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Shortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One redirect traversal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    /// Referring origin, or [`ClickEvent::DIRECT`] when there was none.
    pub source: String,
    /// Origin the redirect was served from.
    pub location: String,
}

impl ClickEvent {
    /// Source recorded when the visitor arrived without a referrer.
    pub const DIRECT: &'static str = "direct";
}

/// Stored short link.
///
/// `clicks` always equals the length of `click_data`: both are private and
/// only [`Link::push_click`] changes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredLink")]
pub struct Link {
    pub shortcode: Shortcode,
    pub long_url: String,
    pub creation_time: DateTime<Utc>,
    /// Fixed at creation; never recomputed.
    pub expiry_time: DateTime<Utc>,
    /// Kept for display only, expiry is governed by `expiry_time`.
    pub validity_minutes: u32,
    clicks: u64,
    click_data: Vec<ClickEvent>,
}

/// On-disk form of [`Link`]. The stored `clicks` counter is ignored and
/// rebuilt from the click list.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLink {
    shortcode: Shortcode,
    long_url: String,
    creation_time: DateTime<Utc>,
    expiry_time: DateTime<Utc>,
    validity_minutes: u32,
    #[serde(default)]
    click_data: Vec<ClickEvent>,
}

impl From<StoredLink> for Link {
    fn from(raw: StoredLink) -> Self {
        Self {
            shortcode: raw.shortcode,
            long_url: raw.long_url,
            creation_time: raw.creation_time,
            expiry_time: raw.expiry_time,
            validity_minutes: raw.validity_minutes,
            clicks: raw.click_data.len() as u64,
            click_data: raw.click_data,
        }
    }
}

impl Link {
    /// Create a link with no clicks that expires `validity_minutes` after
    /// `creation_time`.
    pub fn new(
        shortcode: Shortcode,
        long_url: String,
        creation_time: DateTime<Utc>,
        validity_minutes: u32,
    ) -> Self {
        Self {
            shortcode,
            long_url,
            creation_time,
            expiry_time: creation_time + Duration::minutes(i64::from(validity_minutes)),
            validity_minutes,
            clicks: 0,
            click_data: Vec::new(),
        }
    }

    /// A link is expired strictly after its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_time
    }

    /// Append a click. `clicks` and `click_data` only ever move together.
    pub fn push_click(&mut self, event: ClickEvent) {
        self.click_data.push(event);
        self.clicks += 1;
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    /// Recorded clicks, oldest first.
    pub fn click_data(&self) -> &[ClickEvent] {
        &self.click_data
    }
}

/// Input data for creating a new short link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLink {
    pub long_url: String,
    /// Blank or `None` asks for a generated shortcode.
    pub custom_shortcode: Option<String>,
    /// Signed so that zero and negative input reach validation.
    pub validity_minutes: i64,
}

impl NewLink {
    pub fn new<S: Into<String>>(long_url: S, validity_minutes: i64) -> Self {
        Self {
            long_url: long_url.into(),
            custom_shortcode: None,
            validity_minutes,
        }
    }

    pub fn with_shortcode<S: Into<String>>(mut self, shortcode: S) -> Self {
        self.custom_shortcode = Some(shortcode.into());
        self
    }
}

/// What `create` hands back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub shortcode: Shortcode,
    pub short_url: String,
    pub expiry_time: DateTime<Utc>,
}

/// Request details attached to a click when a link is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickContext {
    pub source: String,
    pub location: String,
}

impl ClickContext {
    /// An absent or empty referrer is recorded as [`ClickEvent::DIRECT`].
    pub fn new<S: Into<String>>(referrer: Option<&str>, location: S) -> Self {
        let source = match referrer.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => ClickEvent::DIRECT.to_string(),
        };
        Self {
            source,
            location: location.into(),
        }
    }
}

/// Outcome of looking up a shortcode for redirection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Expired,
    /// The link is live; the click has already been recorded.
    Active(String),
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Produces candidate shortcodes. Uniqueness is checked by the caller.
pub trait ShortcodeGenerator: Send + Sync {
    fn draw(&self) -> Shortcode;
}

impl<T: ShortcodeGenerator + ?Sized> ShortcodeGenerator for Arc<T> {
    fn draw(&self) -> Shortcode {
        (**self).draw()
    }
}

/// Persistence port: a flat string-to-string store with whole-value writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Rejections of `create`. Messages are meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("URL is required")]
    EmptyUrl,
    #[error("Invalid URL format")]
    InvalidUrl,
    #[error("Validity must be greater than 0")]
    InvalidValidity,
    #[error("Shortcode already exists")]
    ShortcodeTaken,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcodeError {
    #[error("shortcode is blank")]
    Blank,
}

/// Failures of the key-value backend or of encoding the collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to shorten URL: {0}")]
    Storage(#[from] StorageError),
}

pub mod adapters;
pub mod log;
pub mod service;
pub mod shortcode;
pub mod stats;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;
