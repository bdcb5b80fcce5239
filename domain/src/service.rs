use crate::log::{EventLog, LogCategory};
use crate::stats::{self, StatsReport};
use crate::store::LinkStore;
use crate::validate::{self, validate_new_link};
use crate::{
    ClickContext, ClickEvent, Clock, CreateError, KeyValueStore, Link, LinkSummary, NewLink,
    Resolution, Shortcode, ShortcodeGenerator, ValidationError,
};

/// Application service enforcing the registry's rules on top of [`LinkStore`].
///
/// Generic over the key-value backend, shortcode generator, clock and event
/// log. It holds no cached state: every operation starts from a fresh
/// snapshot, so separate services over one backend see each other's writes
/// but can still lose updates when their load/save windows overlap (see the
/// [`store`](crate::store) module docs).
pub struct LinkService<K, G, C, L>
where
    K: KeyValueStore,
    G: ShortcodeGenerator,
    C: Clock,
    L: EventLog + Clone,
{
    store: LinkStore<K, L>,
    generator: G,
    clock: C,
    log: L,
    origin: String,
}

impl<K, G, C, L> LinkService<K, G, C, L>
where
    K: KeyValueStore,
    G: ShortcodeGenerator,
    C: Clock,
    L: EventLog + Clone,
{
    /// `origin` is the base short URLs are built from, e.g.
    /// `https://sho.rt`.
    pub fn new<O: Into<String>>(kv: K, generator: G, clock: C, log: L, origin: O) -> Self {
        Self {
            store: LinkStore::new(kv, log.clone()),
            generator,
            clock,
            log,
            origin: origin.into(),
        }
    }

    pub fn store(&self) -> &LinkStore<K, L> {
        &self.store
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_valid_url(candidate: &str) -> bool {
        validate::is_valid_url(candidate)
    }

    /// Draw a shortcode not used by any link currently stored.
    pub fn generate_shortcode(&self) -> Shortcode {
        let snapshot = self.store.load_all();
        self.unused_shortcode(&snapshot)
    }

    fn unused_shortcode(&self, snapshot: &[Link]) -> Shortcode {
        // Rejection sampling without a cap; terminates while the generator's
        // code space is larger than the stored set.
        loop {
            let candidate = self.generator.draw();
            if !is_taken(snapshot, candidate.as_str()) {
                return candidate;
            }
        }
    }

    /// Create a new short link.
    pub fn create(&self, input: NewLink) -> Result<LinkSummary, CreateError> {
        let validity = validate_new_link(&input).map_err(|e| self.rejected(&input, e))?;

        let mut links = self.store.load_all();
        let shortcode = match validate::custom_shortcode(&input) {
            Some(custom) if is_taken(&links, custom) => {
                return Err(self.rejected(&input, ValidationError::ShortcodeTaken));
            }
            Some(custom) => Shortcode(custom.to_string()),
            None => self.unused_shortcode(&links),
        };

        let long_url = input.long_url.trim().to_string();
        let link = Link::new(shortcode, long_url, self.clock.now(), validity);
        let summary = LinkSummary {
            short_url: stats::short_url(&self.origin, link.shortcode.as_str()),
            shortcode: link.shortcode.clone(),
            expiry_time: link.expiry_time,
        };
        links.push(link);

        if let Err(e) = self.store.save_all(&links) {
            self.log.error(
                LogCategory::Component,
                &format!("Error shortening {}: {e}", input.long_url),
            );
            return Err(e.into());
        }
        self.log.info(
            LogCategory::Component,
            &format!(
                "Successfully shortened {} to {}",
                input.long_url, summary.shortcode
            ),
        );
        Ok(summary)
    }

    fn rejected(&self, input: &NewLink, err: ValidationError) -> CreateError {
        self.log.error(
            LogCategory::Component,
            &format!("Rejected {:?}: {err}", input.long_url),
        );
        err.into()
    }

    /// Create every non-blank entry in order. The result is index-aligned
    /// with `inputs`; blank entries are skipped and yield `None`.
    pub fn create_batch<I>(&self, inputs: I) -> Vec<Option<Result<LinkSummary, CreateError>>>
    where
        I: IntoIterator<Item = NewLink>,
    {
        self.log
            .info(LogCategory::Component, "Bulk URL shortening started");
        inputs
            .into_iter()
            .map(|input| {
                if input.long_url.trim().is_empty() {
                    None
                } else {
                    Some(self.create(input))
                }
            })
            .collect()
    }

    /// Look a shortcode up for redirection. A live link gets a click recorded
    /// before this returns.
    pub fn resolve(&self, code: &str, ctx: &ClickContext) -> Resolution {
        let Some(link) = self.store.find_by_shortcode(code) else {
            self.log.error(
                LogCategory::Redirect,
                &format!("Shortcode not found: {code}"),
            );
            return Resolution::NotFound;
        };
        if link.is_expired(self.clock.now()) {
            self.log.error(
                LogCategory::Redirect,
                &format!("Shortcode {code} has expired"),
            );
            return Resolution::Expired;
        }
        self.record_click(code, &ctx.source, &ctx.location);
        self.log.info(
            LogCategory::Redirect,
            &format!("Redirecting shortcode {code} to {}", link.long_url),
        );
        Resolution::Active(link.long_url)
    }

    /// Append a click to the link with `code`. Silently does nothing when the
    /// link is gone; a failed write is logged and dropped.
    pub fn record_click(&self, code: &str, source: &str, location: &str) {
        let mut links = self.store.load_all();
        let Some(link) = links.iter_mut().find(|l| l.shortcode.as_str() == code) else {
            return;
        };
        link.push_click(ClickEvent {
            timestamp: self.clock.now(),
            source: source.to_string(),
            location: location.to_string(),
        });
        if let Err(e) = self.store.save_all(&links) {
            self.log.error(
                LogCategory::Redirect,
                &format!("Failed to record click for {code}: {e}"),
            );
        }
    }

    /// Totals plus every link annotated for display, newest first.
    pub fn compute_stats(&self) -> StatsReport {
        let report = stats::compute(self.store.load_all(), self.clock.now(), &self.origin);
        self.log.info(
            LogCategory::Page,
            &format!(
                "Statistics loaded: {} links, {} clicks",
                report.totals.total_links, report.totals.total_clicks
            ),
        );
        report
    }
}

fn is_taken(snapshot: &[Link], code: &str) -> bool {
    snapshot.iter().any(|link| link.shortcode.as_str() == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_kv::InMemoryKv;
    use crate::log::LogLevel;
    use crate::shortcode::{in_alphabet, RandomShortcodeGenerator, DEFAULT_LENGTH};
    use crate::stats::AggregateStats;
    use crate::store::STORAGE_KEY;
    use crate::testing::{epoch, ManualClock, ReadOnlyKv, RecordingLog, ScriptedGenerator};
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Arc;

    const ORIGIN: &str = "http://localhost:3000";

    type TestService<G> = LinkService<Arc<InMemoryKv>, G, Arc<ManualClock>, Arc<RecordingLog>>;

    struct Harness<G: ShortcodeGenerator> {
        svc: TestService<G>,
        kv: Arc<InMemoryKv>,
        clock: Arc<ManualClock>,
        log: Arc<RecordingLog>,
    }

    fn harness_with<G: ShortcodeGenerator>(generator: G) -> Harness<G> {
        let kv = Arc::new(InMemoryKv::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let log = Arc::new(RecordingLog::default());
        let svc = LinkService::new(kv.clone(), generator, clock.clone(), log.clone(), ORIGIN);
        Harness { svc, kv, clock, log }
    }

    fn harness() -> Harness<RandomShortcodeGenerator> {
        harness_with(RandomShortcodeGenerator::default())
    }

    fn ctx() -> ClickContext {
        ClickContext::new(None, ORIGIN)
    }

    fn validation(err: CreateError) -> ValidationError {
        match err {
            CreateError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn generated_shortcodes_are_six_alphanumerics_and_unique() {
        let h = harness();
        let mut seen = HashSet::new();
        for i in 0..50 {
            let summary = h
                .svc
                .create(NewLink::new(format!("https://e.com/{i}"), 30))
                .expect("created");
            let code = summary.shortcode.as_str().to_string();
            assert_eq!(code.len(), DEFAULT_LENGTH);
            assert!(in_alphabet(&code));
            assert!(seen.insert(code), "duplicate shortcode");
        }
        assert_eq!(h.svc.store().load_all().len(), 50);
    }

    #[test]
    fn generation_skips_codes_already_stored() {
        let h = harness_with(ScriptedGenerator::new(&[
            "taken1", "fresh1", "taken1", "taken1", "fresh2",
        ]));
        h.svc
            .create(NewLink::new("https://a.com", 30).with_shortcode("taken1"))
            .unwrap();
        assert_eq!(h.svc.generate_shortcode().as_str(), "fresh1");
        let created = h.svc.create(NewLink::new("https://b.com", 30)).unwrap();
        assert_eq!(created.shortcode.as_str(), "fresh2");
    }

    #[test]
    fn create_rejects_invalid_input() {
        let h = harness();
        let err = h.svc.create(NewLink::new("not a url", 30)).unwrap_err();
        assert_eq!(validation(err), ValidationError::InvalidUrl);
        let err = h.svc.create(NewLink::new("", 30)).unwrap_err();
        assert_eq!(validation(err), ValidationError::EmptyUrl);
        let err = h.svc.create(NewLink::new("https://a.com", 0)).unwrap_err();
        assert_eq!(validation(err), ValidationError::InvalidValidity);
        let err = h.svc.create(NewLink::new("https://a.com", -10)).unwrap_err();
        assert_eq!(validation(err), ValidationError::InvalidValidity);

        assert_eq!(h.kv.get(STORAGE_KEY).unwrap(), None);
        assert_eq!(h.log.count(LogLevel::Error, LogCategory::Component), 4);
    }

    #[test]
    fn custom_shortcode_collision() {
        let h = harness();
        h.svc
            .create(NewLink::new("https://a.com", 30).with_shortcode("abc123"))
            .unwrap();
        let err = h
            .svc
            .create(NewLink::new("https://b.com", 30).with_shortcode("abc123"))
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::ShortcodeTaken);
        let stored = h.svc.store().find_by_shortcode("abc123").unwrap();
        assert_eq!(stored.long_url, "https://a.com");
    }

    #[test]
    fn custom_shortcode_is_trimmed_and_blank_means_generated() {
        let h = harness();
        let a = h
            .svc
            .create(NewLink::new("https://a.com", 30).with_shortcode("  mine "))
            .unwrap();
        assert_eq!(a.shortcode.as_str(), "mine");
        let b = h
            .svc
            .create(NewLink::new("https://b.com", 30).with_shortcode("   "))
            .unwrap();
        assert_eq!(b.shortcode.as_str().len(), DEFAULT_LENGTH);
    }

    #[test]
    fn create_returns_summary_and_persists_link() {
        let h = harness();
        let summary = h
            .svc
            .create(NewLink::new("https://x.com", 45).with_shortcode("x1"))
            .unwrap();
        assert_eq!(summary.short_url, "http://localhost:3000/x1");
        assert_eq!(summary.expiry_time, epoch() + Duration::minutes(45));

        let link = h.svc.store().find_by_shortcode("x1").unwrap();
        assert_eq!(link.creation_time, epoch());
        assert_eq!(link.validity_minutes, 45);
        assert_eq!(link.clicks(), 0);
        assert_eq!(h.log.count(LogLevel::Info, LogCategory::Component), 1);
    }

    #[test]
    fn resolve_active_then_expired() {
        let h = harness();
        h.svc
            .create(NewLink::new("https://x.com", 1).with_shortcode("x1"))
            .unwrap();

        h.clock.advance(Duration::seconds(30));
        assert_eq!(
            h.svc.resolve("x1", &ctx()),
            Resolution::Active("https://x.com".into())
        );
        let link = h.svc.store().find_by_shortcode("x1").unwrap();
        assert_eq!(link.clicks(), 1);
        assert_eq!(link.click_data().len(), 1);
        assert_eq!(link.click_data()[0].timestamp, epoch() + Duration::seconds(30));
        assert_eq!(link.click_data()[0].source, ClickEvent::DIRECT);
        assert_eq!(link.click_data()[0].location, ORIGIN);

        h.clock.advance(Duration::seconds(31));
        assert_eq!(h.svc.resolve("x1", &ctx()), Resolution::Expired);
        let link = h.svc.store().find_by_shortcode("x1").unwrap();
        assert_eq!(link.clicks(), 1, "expired lookups do not count");
    }

    #[test]
    fn resolve_unknown_shortcode() {
        let h = harness();
        assert_eq!(h.svc.resolve("missing", &ctx()), Resolution::NotFound);
        assert_eq!(h.log.count(LogLevel::Error, LogCategory::Redirect), 1);
        assert_eq!(h.kv.get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn resolve_records_referrer() {
        let h = harness();
        h.svc
            .create(NewLink::new("https://x.com", 10).with_shortcode("r"))
            .unwrap();
        let ctx = ClickContext::new(Some("https://news.example"), ORIGIN);
        h.svc.resolve("r", &ctx);
        h.svc.resolve("r", &ctx);
        let link = h.svc.store().find_by_shortcode("r").unwrap();
        assert_eq!(link.clicks(), 2);
        assert!(link
            .click_data()
            .iter()
            .all(|c| c.source == "https://news.example"));
    }

    #[test]
    fn record_click_on_absent_shortcode_is_noop() {
        let h = harness();
        h.svc.record_click("ghost", "direct", ORIGIN);
        assert_eq!(h.kv.get(STORAGE_KEY).unwrap(), None);

        h.svc
            .create(NewLink::new("https://a.com", 10).with_shortcode("a"))
            .unwrap();
        let before = h.kv.get(STORAGE_KEY).unwrap();
        h.svc.record_click("ghost", "direct", ORIGIN);
        assert_eq!(h.kv.get(STORAGE_KEY).unwrap(), before);
    }

    #[test]
    fn stats_over_mixed_links() {
        let h = harness();
        h.svc
            .create(NewLink::new("https://a.com", 60).with_shortcode("a"))
            .unwrap();
        h.svc
            .create(NewLink::new("https://b.com", 5).with_shortcode("b"))
            .unwrap();
        h.svc
            .create(NewLink::new("https://c.com", 60).with_shortcode("c"))
            .unwrap();
        for (code, n) in [("a", 2), ("c", 5)] {
            for _ in 0..n {
                h.svc.resolve(code, &ctx());
            }
        }
        h.clock.advance(Duration::minutes(10));

        let report = h.svc.compute_stats();
        assert_eq!(
            report.totals,
            AggregateStats {
                total_links: 3,
                total_clicks: 7,
                active_links: 2,
                expired_links: 1,
            }
        );
        let order: Vec<&str> = report
            .links
            .iter()
            .map(|v| v.link.shortcode.as_str())
            .collect();
        // same creation instant, so insertion order is kept
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(h.log.count(LogLevel::Info, LogCategory::Page), 1);
    }

    #[test]
    fn batch_skips_blank_rows_and_reports_each() {
        let h = harness();
        let results = h.svc.create_batch(vec![
            NewLink::new("https://a.com", 30).with_shortcode("dup"),
            NewLink::new("   ", 30),
            NewLink::new("https://b.com", 30).with_shortcode("dup"),
            NewLink::new("nope", 30),
        ]);
        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], Some(Ok(_))));
        assert!(results[1].is_none());
        assert!(matches!(
            results[2],
            Some(Err(CreateError::Validation(ValidationError::ShortcodeTaken)))
        ));
        assert!(matches!(
            results[3],
            Some(Err(CreateError::Validation(ValidationError::InvalidUrl)))
        ));
        assert_eq!(h.svc.store().load_all().len(), 1);
    }

    #[test]
    fn storage_failure_surfaces_from_create() {
        let log = Arc::new(RecordingLog::default());
        let svc = LinkService::new(
            ReadOnlyKv::default(),
            RandomShortcodeGenerator::default(),
            ManualClock::new(epoch()),
            log.clone(),
            ORIGIN,
        );
        let err = svc.create(NewLink::new("https://a.com", 30)).unwrap_err();
        assert!(matches!(err, CreateError::Storage(_)));
        assert_eq!(log.count(LogLevel::Error, LogCategory::Component), 1);
    }

    #[test]
    fn storage_failure_while_recording_click_still_redirects() {
        let seeded = Link::new(
            Shortcode::new("keep").unwrap(),
            "https://keep.example".into(),
            epoch(),
            30,
        );
        let raw = serde_json::to_string(&vec![seeded]).unwrap();
        let log = Arc::new(RecordingLog::default());
        let svc = LinkService::new(
            ReadOnlyKv::seeded(STORAGE_KEY, &raw),
            RandomShortcodeGenerator::default(),
            ManualClock::new(epoch()),
            log.clone(),
            ORIGIN,
        );
        assert_eq!(
            svc.resolve("keep", &ctx()),
            Resolution::Active("https://keep.example".into())
        );
        assert_eq!(svc.store().find_by_shortcode("keep").unwrap().clicks(), 0);
        assert!(log
            .events()
            .iter()
            .any(|(l, c, m)| *l == LogLevel::Error
                && *c == LogCategory::Redirect
                && m.contains("Failed to record click")));
    }

    #[test]
    fn corrupted_store_degrades_to_empty() {
        let h = harness();
        h.kv.set(STORAGE_KEY, "[{\"broken\":").unwrap();
        assert_eq!(h.svc.compute_stats().totals.total_links, 0);
        // The next write starts from an empty snapshot and replaces the bad record.
        h.svc
            .create(NewLink::new("https://a.com", 30).with_shortcode("fresh"))
            .unwrap();
        assert_eq!(h.svc.store().load_all().len(), 1);
    }

    #[test]
    fn two_services_on_one_backend_share_links() {
        let kv = Arc::new(InMemoryKv::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let tab_a = LinkService::new(
            kv.clone(),
            RandomShortcodeGenerator::default(),
            clock.clone(),
            Arc::new(RecordingLog::default()),
            ORIGIN,
        );
        let tab_b = LinkService::new(
            kv,
            RandomShortcodeGenerator::default(),
            clock,
            Arc::new(RecordingLog::default()),
            ORIGIN,
        );
        tab_a
            .create(NewLink::new("https://a.com", 30).with_shortcode("shared"))
            .unwrap();
        let err = tab_b
            .create(NewLink::new("https://b.com", 30).with_shortcode("shared"))
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::ShortcodeTaken);
        assert_eq!(
            tab_b.resolve("shared", &ctx()),
            Resolution::Active("https://a.com".into())
        );
        assert_eq!(tab_a.compute_stats().totals.total_clicks, 1);
    }

    #[test]
    fn url_predicate_is_exposed() {
        assert!(TestService::<RandomShortcodeGenerator>::is_valid_url("https://a.com"));
        assert!(!TestService::<RandomShortcodeGenerator>::is_valid_url("a.com"));
    }
}
