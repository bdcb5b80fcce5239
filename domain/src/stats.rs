//! Aggregate click statistics over a snapshot of links.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Link;

/// Totals across the whole collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_links: usize,
    pub total_clicks: u64,
    pub active_links: usize,
    pub expired_links: usize,
}

/// A link annotated with values derived at read time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    #[serde(flatten)]
    pub link: Link,
    pub is_expired: bool,
    pub short_url: String,
    pub time_remaining: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub totals: AggregateStats,
    /// Newest first; links created at the same instant keep insertion order.
    pub links: Vec<LinkView>,
}

/// Full URL a shortcode is served under.
pub fn short_url(origin: &str, shortcode: &str) -> String {
    format!("{}/{}", origin.trim_end_matches('/'), shortcode)
}

/// Human readable time left before `expiry`, e.g. `"2h 5m remaining"`.
pub fn time_remaining(now: DateTime<Utc>, expiry: DateTime<Utc>) -> String {
    let left = expiry - now;
    if left.num_milliseconds() <= 0 {
        return "Expired".to_string();
    }
    let hours = left.num_hours();
    let minutes = left.num_minutes() % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m remaining")
    } else {
        format!("{minutes}m remaining")
    }
}

/// Classify and total `links` in a single pass, then order newest first.
pub fn compute(links: Vec<Link>, now: DateTime<Utc>, origin: &str) -> StatsReport {
    let mut totals = AggregateStats {
        total_links: links.len(),
        ..AggregateStats::default()
    };
    let mut views: Vec<LinkView> = links
        .into_iter()
        .map(|link| {
            let is_expired = link.is_expired(now);
            totals.total_clicks += link.clicks();
            if is_expired {
                totals.expired_links += 1;
            } else {
                totals.active_links += 1;
            }
            LinkView {
                short_url: short_url(origin, link.shortcode.as_str()),
                time_remaining: time_remaining(now, link.expiry_time),
                is_expired,
                link,
            }
        })
        .collect();
    // sort_by is stable
    views.sort_by(|a, b| b.link.creation_time.cmp(&a.link.creation_time));
    StatsReport {
        totals,
        links: views,
    }
}
