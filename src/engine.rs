use chrono::{DateTime, Local};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::corpus::TextProvider;
use crate::session::{Phase, SessionConfig, SessionState};
use crate::stats::{compute_stats, secs_between, SessionResult, Stats};
use crate::time_series::{push_dedup, Sample};

/// The typing session being measured.
///
/// The engine is driven entirely from outside: input snapshots from the
/// presentation layer, countdown ticks and live samples from the runner's
/// drivers. Each transition that completes the session returns the
/// [`SessionResult`] exactly once; every later call observes `Finished` and
/// does nothing.
#[derive(Debug)]
pub struct Engine {
    pub session_config: SessionConfig,
    pub session_state: SessionState,
}

impl Engine {
    pub fn new(target: String, session_config: SessionConfig) -> Self {
        let session_state = SessionState::new(target, &session_config);
        Self {
            session_config,
            session_state,
        }
    }

    /// Replace the session with a fresh Idle one for `target`
    pub fn start(&mut self, target: String) {
        debug!(
            target_chars = target.chars().count(),
            previous = %self.session_state.phase,
            "starting session"
        );
        self.session_state = SessionState::new(target, &self.session_config);
    }

    /// Abandon the current session without a result and begin a new one
    pub fn restart(&mut self, provider: &dyn TextProvider) {
        self.start(provider.choose_text());
    }

    /// Take the full current input. Starts the clock on the first non-empty
    /// input and finishes once the whole target has been typed.
    pub fn apply_input(&mut self, new_input: &str, now: SystemTime) -> Option<SessionResult> {
        let state = &mut self.session_state;
        if state.phase == Phase::Finished {
            return None;
        }

        if state.phase == Phase::Idle && !new_input.is_empty() {
            state.phase = Phase::Running;
            state.started_at = Some(now);
            debug!("session running");
        }

        state.input.clear();
        state.input.push_str(new_input);

        if state.input_len() >= state.target_len {
            return self.finish(now);
        }
        None
    }

    /// Countdown driver: one whole second has passed
    pub fn tick(&mut self, now: SystemTime) -> Option<SessionResult> {
        let state = &mut self.session_state;
        if state.phase != Phase::Running {
            return None;
        }

        state.seconds_remaining = state.seconds_remaining.saturating_sub(1);
        if state.seconds_remaining == 0 {
            return self.finish(now);
        }
        None
    }

    /// Sampling driver: refresh the live stats and record a time-series point
    pub fn sample(&mut self, now: SystemTime) {
        let state = &mut self.session_state;
        let started_at = match (state.phase, state.started_at) {
            (Phase::Running, Some(started_at)) => started_at,
            _ => return,
        };

        let stats = compute_stats(&state.input, &state.target, Some(started_at), now);
        state.live = stats;

        let t = secs_between(started_at, now).round() as u64;
        push_dedup(&mut state.samples, Sample::new(t, stats.wpm));
    }

    /// Complete the session. Safe to call from the timer, from input
    /// reaching the end of the target, or manually; only the first call
    /// produces a result.
    pub fn finish(&mut self, now: SystemTime) -> Option<SessionResult> {
        let deadline = self.session_config.deadline();
        let duration_secs = self.session_config.duration_secs;
        let state = &mut self.session_state;
        if state.phase == Phase::Finished {
            return None;
        }

        let effective_start = state
            .started_at
            .unwrap_or_else(|| now.checked_sub(deadline).unwrap_or(now));

        let stats = compute_stats(&state.input, &state.target, Some(effective_start), now);
        let elapsed_time = secs_between(effective_start, now).max(1.0);

        let final_t = duration_secs.saturating_sub(state.seconds_remaining);
        let history = close_series(&state.samples, Sample::new(final_t, stats.wpm));

        let result = SessionResult {
            wpm: stats.wpm,
            accuracy: stats.accuracy,
            correct_chars: stats.correct_chars,
            incorrect_chars: stats.incorrect_chars,
            total_chars: state.input_len(),
            elapsed_time,
            history,
            date: DateTime::<Local>::from(now),
        };

        state.live = stats;
        state.phase = Phase::Finished;
        state.result = Some(result.clone());

        info!(
            wpm = result.wpm,
            accuracy = result.accuracy,
            elapsed_secs = result.elapsed_time,
            total_chars = result.total_chars,
            "session finished"
        );

        Some(result)
    }

    pub fn phase(&self) -> Phase {
        self.session_state.phase
    }

    pub fn has_started(&self) -> bool {
        self.session_state.started_at.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.session_state.phase == Phase::Finished
    }

    pub fn is_running(&self) -> bool {
        self.session_state.phase == Phase::Running
    }

    pub fn target(&self) -> &str {
        &self.session_state.target
    }

    pub fn input(&self) -> &str {
        &self.session_state.input
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.session_state.seconds_remaining
    }

    pub fn samples(&self) -> &[Sample] {
        &self.session_state.samples
    }

    pub fn live(&self) -> Stats {
        self.session_state.live
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.session_state.result.as_ref()
    }

    /// Share of the target typed so far, 0..=100
    pub fn progress(&self) -> f64 {
        let state = &self.session_state;
        if state.target_len == 0 {
            return 100.0;
        }
        (state.input_len() as f64 / state.target_len as f64 * 100.0).min(100.0)
    }
}

/// Series for the result: the recorded samples closed off by the completion
/// point. When sampling already reached that second (or rounded past it),
/// the last point takes the final wpm instead so times stay strictly
/// increasing.
fn close_series(samples: &[Sample], last: Sample) -> Vec<Sample> {
    let mut history = samples.to_vec();
    match history.last_mut() {
        Some(prev) if prev.t >= last.t => prev.wpm = last.wpm,
        _ => history.push(last),
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::FixedText;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn engine(target: &str) -> Engine {
        Engine::new(target.to_string(), SessionConfig::default())
    }

    fn after(start: SystemTime, millis: u64) -> SystemTime {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_engine_new() {
        let engine = engine("hello world");

        assert_eq!(engine.target(), "hello world");
        assert_eq!(engine.input(), "");
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.seconds_remaining(), 60);
        assert!(!engine.has_started());
        assert!(!engine.has_finished());
        assert!(engine.samples().is_empty());
    }

    #[test]
    fn test_first_input_starts_clock() {
        let mut engine = engine("hello");
        let t0 = SystemTime::now();

        assert!(engine.apply_input("h", t0).is_none());

        assert_eq!(engine.phase(), Phase::Running);
        assert_eq!(engine.session_state.started_at, Some(t0));
    }

    #[test]
    fn test_started_at_is_set_once() {
        let mut engine = engine("hello");
        let t0 = SystemTime::now();

        engine.apply_input("h", t0);
        engine.apply_input("he", after(t0, 300));

        assert_eq!(engine.session_state.started_at, Some(t0));
    }

    #[test]
    fn test_empty_input_stays_idle() {
        let mut engine = engine("hello");

        engine.apply_input("", SystemTime::now());

        assert_eq!(engine.phase(), Phase::Idle);
        assert!(!engine.has_started());
    }

    #[test]
    fn test_typing_full_target_finishes() {
        let mut engine = engine("cat");
        let t0 = SystemTime::now();

        engine.apply_input("c", t0);
        engine.apply_input("ca", after(t0, 1000));
        let result = engine.apply_input("cat", after(t0, 2000));

        let result = result.expect("completing the text should produce a result");
        assert_eq!(result.wpm, 18);
        assert_eq!(result.accuracy, 100);
        assert_eq!(result.correct_chars, 3);
        assert_eq!(result.incorrect_chars, 0);
        assert_eq!(result.total_chars, 3);
        assert_eq!(result.elapsed_time, 2.0);
        assert!(engine.has_finished());
    }

    #[test]
    fn test_overflow_input_finishes() {
        let mut engine = engine("ab");
        let t0 = SystemTime::now();

        let result = engine.apply_input("abc", t0);

        assert_matches!(result, Some(SessionResult { total_chars: 3, incorrect_chars: 1, .. }));
    }

    #[test]
    fn test_finish_twice_emits_once() {
        let mut engine = engine("hello");
        let t0 = SystemTime::now();
        engine.apply_input("he", t0);

        assert!(engine.finish(after(t0, 3000)).is_some());
        assert!(engine.finish(after(t0, 4000)).is_none());
        assert!(engine.result().is_some());
    }

    #[test]
    fn test_finished_ignores_input_and_ticks() {
        let mut engine = engine("hello");
        let t0 = SystemTime::now();
        engine.apply_input("he", t0);
        engine.finish(after(t0, 3000));

        assert!(engine.apply_input("hel", after(t0, 3100)).is_none());
        assert!(engine.tick(after(t0, 4000)).is_none());
        engine.sample(after(t0, 4000));

        assert_eq!(engine.input(), "he");
        assert_eq!(engine.phase(), Phase::Finished);
    }

    #[test]
    fn test_tick_ignored_while_idle() {
        let mut engine = engine("hello");

        engine.tick(SystemTime::now());

        assert_eq!(engine.seconds_remaining(), 60);
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_countdown_reaching_zero_finishes() {
        let mut engine = Engine::new("hello".into(), SessionConfig { duration_secs: 3 });
        let t0 = SystemTime::now();
        engine.apply_input("h", t0);

        assert!(engine.tick(after(t0, 1000)).is_none());
        assert!(engine.tick(after(t0, 2000)).is_none());
        let result = engine.tick(after(t0, 3000)).unwrap();

        assert_eq!(engine.seconds_remaining(), 0);
        assert!(result.elapsed_time >= 1.0);
        assert_eq!(result.history.last().map(|s| s.t), Some(3));
    }

    #[test]
    fn test_sample_dedups_same_second() {
        let mut engine = engine("hello world");
        let t0 = SystemTime::now();
        engine.apply_input("h", t0);

        engine.sample(after(t0, 500)); // rounds to 1
        engine.sample(after(t0, 1000)); // 1 again
        engine.sample(after(t0, 1500)); // 2
        engine.sample(after(t0, 2000)); // 2 again

        let times: Vec<u64> = engine.samples().iter().map(|s| s.t).collect();
        assert_eq!(times, vec![1, 2]);
    }

    #[test]
    fn test_sample_updates_live_stats() {
        let mut engine = engine("hello world");
        let t0 = SystemTime::now();
        engine.apply_input("hellx", t0);

        engine.sample(after(t0, 6000));

        let live = engine.live();
        assert_eq!(live.correct_chars, 4);
        assert_eq!(live.incorrect_chars, 1);
        assert_eq!(live.accuracy, 80);
        assert_eq!(live.wpm, 8);
    }

    #[test]
    fn test_sample_ignored_before_start() {
        let mut engine = engine("hello");

        engine.sample(SystemTime::now());

        assert!(engine.samples().is_empty());
    }

    #[test]
    fn test_forced_finish_without_input_reports_zero() {
        let mut engine = engine("hello");

        let result = engine.finish(SystemTime::now()).unwrap();

        assert_eq!(result.wpm, 0);
        assert_eq!(result.accuracy, 0);
        assert_eq!(result.total_chars, 0);
        // Fallback start assumes the full deadline ran
        assert_eq!(result.elapsed_time, 60.0);
        assert_eq!(result.history, vec![Sample::new(0, 0)]);
    }

    #[test]
    fn test_final_sample_appended_after_samples() {
        let mut engine = engine("hello world");
        let t0 = SystemTime::now();
        engine.apply_input("h", t0);
        engine.sample(after(t0, 1000));
        engine.tick(after(t0, 1000));
        engine.tick(after(t0, 2000));
        engine.tick(after(t0, 3000));
        engine.apply_input("hello", after(t0, 3000));

        let result = engine.finish(after(t0, 3200)).unwrap();

        let times: Vec<u64> = result.history.iter().map(|s| s.t).collect();
        assert_eq!(times, vec![1, 3]);
        assert_eq!(result.history.last().map(|s| s.wpm), Some(result.wpm));
        // samples themselves are left untouched
        assert_eq!(engine.samples().len(), 1);
    }

    #[test]
    fn test_final_sample_merges_with_same_second() {
        let mut engine = engine("hello world");
        let t0 = SystemTime::now();
        engine.apply_input("hello", t0);
        engine.tick(after(t0, 1000));
        engine.tick(after(t0, 2000));
        engine.sample(after(t0, 2000));

        let result = engine.finish(after(t0, 2100)).unwrap();

        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].t, 2);
        assert_eq!(result.history[0].wpm, result.wpm);
    }

    #[test]
    fn test_history_strictly_increasing() {
        let mut engine = engine("the quick brown fox jumps over the lazy dog");
        let t0 = SystemTime::now();
        let target: Vec<char> = engine.target().chars().collect();

        for step in 1..=20u64 {
            let typed: String = target.iter().take(step as usize).collect();
            engine.apply_input(&typed, after(t0, step * 250));
            engine.sample(after(t0, step * 250));
            if step % 4 == 0 {
                engine.tick(after(t0, step * 250));
            }
        }
        let result = engine.finish(after(t0, 5200)).unwrap();

        assert!(result.history.windows(2).all(|w| w[0].t < w[1].t));
        assert!(engine.samples().windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn test_restart_discards_samples() {
        let mut engine = engine("hello world");
        let t0 = SystemTime::now();
        engine.apply_input("hel", t0);
        engine.sample(after(t0, 1000));
        assert!(!engine.samples().is_empty());

        engine.restart(&FixedText::new("new text"));

        assert_eq!(engine.target(), "new text");
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.samples().is_empty());
        assert!(engine.result().is_none());
        assert_eq!(engine.seconds_remaining(), 60);
    }

    #[test]
    fn test_restart_from_finished() {
        let mut engine = engine("hi");
        engine.apply_input("hi", SystemTime::now());
        assert!(engine.has_finished());

        engine.start("again".to_string());

        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.apply_input("a", SystemTime::now()).is_none());
        assert!(engine.is_running());
    }

    #[test]
    fn test_progress() {
        let mut engine = engine("abcd");
        assert_eq!(engine.progress(), 0.0);

        engine.apply_input("ab", SystemTime::now());

        assert_eq!(engine.progress(), 50.0);
    }

    #[test]
    fn test_result_date_matches_finish_time() {
        let mut engine = engine("hello");
        let t0 = SystemTime::now();
        engine.apply_input("h", t0);

        let result = engine.finish(after(t0, 5000)).unwrap();

        assert_eq!(result.date, DateTime::<Local>::from(after(t0, 5000)));
    }
}
