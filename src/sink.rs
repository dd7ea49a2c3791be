use tracing::warn;

use crate::error::Result;
use crate::history::{HistoryDb, HistorySummary};
use crate::stats::SessionResult;

/// Receives the result of every completed session
pub trait ResultSink {
    fn record(&mut self, result: &SessionResult) -> Result<()>;

    /// Aggregates over everything recorded so far, if the sink keeps history
    fn summary(&self) -> Option<HistorySummary> {
        None
    }
}

/// Persists results to the history database under a profile name
#[derive(Debug)]
pub struct HistorySink {
    db: HistoryDb,
    profile: String,
}

impl HistorySink {
    pub fn new(db: HistoryDb, profile: impl Into<String>) -> Self {
        Self {
            db,
            profile: profile.into(),
        }
    }

    pub fn db(&self) -> &HistoryDb {
        &self.db
    }
}

impl ResultSink for HistorySink {
    fn record(&mut self, result: &SessionResult) -> Result<()> {
        self.db.record(&self.profile, result)
    }

    fn summary(&self) -> Option<HistorySummary> {
        match self.db.summary(&self.profile) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(%err, profile = %self.profile, "failed to load history summary");
                None
            }
        }
    }
}

/// Keeps results in memory; used when history is disabled for the run
#[derive(Debug, Default)]
pub struct MemorySink {
    pub results: Vec<SessionResult>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, result: &SessionResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn summary(&self) -> Option<HistorySummary> {
        Some(HistorySummary::from_results(&self.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::session::SessionConfig;
    use std::time::{Duration, SystemTime};

    fn finish_one(sink: &mut dyn ResultSink, typed: &str) {
        let mut engine = Engine::new("hello".into(), SessionConfig::default());
        let t0 = SystemTime::now();
        engine.apply_input(typed, t0);
        let now = t0 + Duration::from_secs(4);
        for result in [engine.finish(now), engine.finish(now)].into_iter().flatten() {
            sink.record(&result).unwrap();
        }
    }

    #[test]
    fn memory_sink_receives_exactly_one_result() {
        let mut sink = MemorySink::default();

        finish_one(&mut sink, "hell");

        assert_eq!(sink.results.len(), 1);
        assert_eq!(sink.results[0].total_chars, 4);
    }

    #[test]
    fn history_sink_persists_under_profile() {
        let mut sink = HistorySink::new(HistoryDb::in_memory().unwrap(), "tester");

        finish_one(&mut sink, "he");
        finish_one(&mut sink, "hel");

        let summary = sink.summary().unwrap();
        assert_eq!(summary.total_tests, 2);
        assert_eq!(sink.db().load("tester").unwrap().len(), 2);
        assert!(sink.db().load("guest").unwrap().is_empty());
    }
}
