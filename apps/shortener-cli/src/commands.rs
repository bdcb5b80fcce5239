//! Command implementations. Each returns the text to print so the dispatch in
//! `main` stays a thin shell and the behavior is testable without a terminal.

use domain::log::TracingEventLog;
use domain::service::LinkService;
use domain::shortcode::RandomShortcodeGenerator;
use domain::stats::StatsReport;
use domain::{ClickContext, CreateError, NewLink, Resolution, StorageError, SystemClock};

use crate::backend::AnyKv;
use crate::config::Config;

pub type Service = LinkService<AnyKv, RandomShortcodeGenerator, SystemClock, TracingEventLog>;

pub fn build_service(cfg: &Config) -> Result<Service, StorageError> {
    Ok(service_over(AnyKv::from_config(cfg)?, &cfg.origin))
}

pub fn service_over(kv: AnyKv, origin: &str) -> Service {
    LinkService::new(
        kv,
        RandomShortcodeGenerator::default(),
        SystemClock,
        TracingEventLog,
        origin,
    )
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Create(#[from] CreateError),
    #[error("Shortcode not found: {0}")]
    NotFound(String),
    #[error("Shortcode {0} has expired")]
    Expired(String),
    #[error("line {line}: {message}")]
    BatchLine { line: usize, message: String },
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn shorten(
    svc: &Service,
    url: &str,
    code: Option<String>,
    validity_minutes: i64,
) -> Result<String, CommandError> {
    let mut input = NewLink::new(url, validity_minutes);
    input.custom_shortcode = code;
    let summary = svc.create(input)?;
    Ok(format!(
        "{} (expires {})",
        summary.short_url,
        summary.expiry_time.format("%Y-%m-%d %H:%M:%S UTC")
    ))
}

/// Parse batch input: one `url [shortcode [minutes]]` per line, fields
/// separated by whitespace, which a URL cannot contain unescaped. A shortcode
/// of `-` asks for a generated one. Lines starting with `#` are comments;
/// blank lines are kept so results line up with input.
pub fn parse_batch(input: &str, default_validity: i64) -> Result<Vec<NewLink>, CommandError> {
    let mut out = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() > 3 {
            return Err(CommandError::BatchLine {
                line: idx + 1,
                message: format!("expected at most 3 fields, got {}", fields.len()),
            });
        }
        let url = fields.first().copied().unwrap_or_default();
        let code = fields.get(1).filter(|c| **c != "-").map(|c| c.to_string());
        let validity = match fields.get(2) {
            Some(raw) => raw.parse::<i64>().map_err(|_| CommandError::BatchLine {
                line: idx + 1,
                message: format!("validity '{raw}' is not a number"),
            })?,
            None => default_validity,
        };
        out.push(NewLink {
            long_url: url.to_string(),
            custom_shortcode: code,
            validity_minutes: validity,
        });
    }
    Ok(out)
}

/// Result of a batch run: printable report plus how many entries failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub report: String,
    pub created: usize,
    pub failed: usize,
}

pub fn batch(svc: &Service, inputs: Vec<NewLink>) -> BatchOutcome {
    let urls: Vec<String> = inputs.iter().map(|i| i.long_url.trim().to_string()).collect();
    let mut outcome = BatchOutcome::default();
    let mut lines = Vec::new();
    for (n, result) in svc.create_batch(inputs).into_iter().enumerate() {
        match result {
            None => continue,
            Some(Ok(summary)) => {
                outcome.created += 1;
                lines.push(format!("#{} {} -> {}", n + 1, urls[n], summary.short_url));
            }
            Some(Err(e)) => {
                outcome.failed += 1;
                lines.push(format!("#{} {} !! {}", n + 1, urls[n], e));
            }
        }
    }
    outcome.report = lines.join("\n");
    outcome
}

/// Redirect entry point: hands back the target on success.
pub fn resolve(svc: &Service, code: &str, referrer: Option<&str>) -> Result<String, CommandError> {
    let ctx = ClickContext::new(referrer, svc.origin());
    match svc.resolve(code, &ctx) {
        Resolution::Active(url) => Ok(url),
        Resolution::NotFound => Err(CommandError::NotFound(code.to_string())),
        Resolution::Expired => Err(CommandError::Expired(code.to_string())),
    }
}

pub fn stats_json(report: &StatsReport) -> Result<String, CommandError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_stats(report: &StatsReport) -> String {
    let t = &report.totals;
    let mut out = format!(
        "Total URLs: {}  Total clicks: {}  Active: {}  Expired: {}\n",
        t.total_links, t.total_clicks, t.active_links, t.expired_links
    );
    if report.links.is_empty() {
        out.push_str("No shortened URLs yet.\n");
        return out;
    }
    for view in &report.links {
        let link = &view.link;
        out.push_str(&format!(
            "\n{}  [{}]  {} clicks\n  -> {}\n  created {}  validity {}m  {}\n",
            view.short_url,
            if view.is_expired { "expired" } else { "active" },
            link.clicks(),
            link.long_url,
            link.creation_time.format("%Y-%m-%d %H:%M:%S UTC"),
            link.validity_minutes,
            view.time_remaining,
        ));
        for click in link.click_data() {
            out.push_str(&format!(
                "    {}  from {}  via {}\n",
                click.timestamp.format("%Y-%m-%d %H:%M:%S"),
                click.source,
                click.location
            ));
        }
    }
    out
}
