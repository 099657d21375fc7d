//! End-of-run report, delivered through the notifier whatever the outcome.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use turnos_core::MergeStats;
use turnos_geo::ResolverStats;
use turnos_sync::PublishOutcome;

/// Longest failure detail carried in a summary, in characters.
pub const MAX_FAILURE_DETAIL: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug)]
pub struct RunSummary {
    pub status: RunStatus,
    pub started: DateTime<Local>,
    pub duration: Duration,
    pub log_file: Option<PathBuf>,
    pub scrapers_ok: usize,
    pub scrapers_failed: Vec<String>,
    pub records: usize,
    pub resolver: Option<ResolverStats>,
    pub merge: Option<MergeStats>,
    pub localities_added: Option<usize>,
    pub publish: Option<PublishOutcome>,
    pub failure: Option<String>,
}

impl RunSummary {
    pub fn new(started: DateTime<Local>, log_file: Option<PathBuf>) -> Self {
        Self {
            status: RunStatus::Success,
            started,
            duration: Duration::ZERO,
            log_file,
            scrapers_ok: 0,
            scrapers_failed: Vec::new(),
            records: 0,
            resolver: None,
            merge: None,
            localities_added: None,
            publish: None,
            failure: None,
        }
    }

    /// Close the summary at `ended`, recording a fatal error if there was one.
    pub fn finish(&mut self, ended: DateTime<Local>, error: Option<&anyhow::Error>) {
        self.duration = (ended - self.started).to_std().unwrap_or_default();
        if let Some(e) = error {
            self.status = RunStatus::Failed;
            self.failure = Some(truncate(&format!("{e:#}"), MAX_FAILURE_DETAIL));
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let status = match self.status {
            RunStatus::Success => "OK",
            RunStatus::Failed => "FAILED",
        };
        let _ = writeln!(out, "turnos run {status}");
        let _ = writeln!(out, "started: {}", self.started.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "duration: {}s", self.duration.as_secs());
        if let Some(log) = &self.log_file {
            let _ = writeln!(out, "log: {}", log.display());
        }

        let _ = writeln!(
            out,
            "scrapers: {} ok, {} failed",
            self.scrapers_ok,
            self.scrapers_failed.len()
        );
        if !self.scrapers_failed.is_empty() {
            let _ = writeln!(out, "  failed: {}", self.scrapers_failed.join(", "));
        }
        let _ = writeln!(out, "records: {}", self.records);

        if let Some(r) = &self.resolver {
            let _ = writeln!(
                out,
                "coordinates: {} cached, {} from map links, {}/{} browser lookups resolved, {} unresolved",
                r.cache_hits, r.from_map_url, r.browser_resolved, r.browser_lookups, r.failures
            );
        }
        if let Some(m) = &self.merge {
            let _ = writeln!(
                out,
                "dataset: +{} months, +{} localities, +{} days, {} replaced, {} appended",
                m.months_added, m.localities_added, m.days_added, m.replaced, m.appended
            );
        }
        if let Some(added) = self.localities_added {
            let _ = writeln!(out, "localities index: +{added}");
        }
        match &self.publish {
            Some(PublishOutcome::Pushed { commit }) => {
                let _ = writeln!(out, "published: {}", &commit[..commit.len().min(10)]);
            }
            Some(PublishOutcome::Unchanged) => {
                let _ = writeln!(out, "published: nothing to commit");
            }
            None => {}
        }
        if let Some(failure) = &self.failure {
            let _ = writeln!(out, "error: {failure}");
        }
        out
    }
}

/// First `max` characters of `text`, marked when cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn failure_detail_is_truncated() {
        let mut summary = RunSummary::new(started(), None);
        let err = anyhow::anyhow!("{}", "x".repeat(5000)).context("git push failed");

        summary.finish(started() + chrono::Duration::seconds(75), Some(&err));

        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(summary.duration, Duration::from_secs(75));
        let failure = summary.failure.as_deref().unwrap();
        assert!(failure.starts_with("git push failed: xxx"));
        assert_eq!(failure.chars().count(), MAX_FAILURE_DETAIL + 3);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Zárate", 2), "Zá...");
        assert_eq!(truncate("Tigre", 10), "Tigre");
    }

    #[test]
    fn render_lists_what_happened() {
        let mut summary = RunSummary::new(started(), Some("logs/run_2025-06-05_09-00-00.log".into()));
        summary.scrapers_ok = 3;
        summary.scrapers_failed = vec!["Zarate".into()];
        summary.records = 42;
        summary.merge = Some(MergeStats {
            replaced: 40,
            appended: 2,
            ..MergeStats::default()
        });
        summary.publish = Some(PublishOutcome::Pushed {
            commit: "0123456789abcdef".into(),
        });
        summary.finish(started(), None);

        let text = summary.render();

        assert!(text.starts_with("turnos run OK\n"));
        assert!(text.contains("log: logs/run_2025-06-05_09-00-00.log"));
        assert!(text.contains("scrapers: 3 ok, 1 failed"));
        assert!(text.contains("  failed: Zarate"));
        assert!(text.contains("40 replaced, 2 appended"));
        assert!(text.contains("published: 0123456789\n"));
        assert!(!text.contains("error:"));
    }
}
