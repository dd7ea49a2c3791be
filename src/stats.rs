use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::time_series::Sample;

/// Characters per word in the standard wpm convention
pub const CHARS_PER_WORD: f64 = 5.0;

/// Durations shorter than this are rounded up before computing wpm,
/// so a near-instant completion cannot report an unbounded speed.
pub const MIN_STATS_SECS: f64 = 2.0;

/// Live or final statistics for one input snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
}

/// Final outcome of a completed session, handed to the result sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub total_chars: usize,
    /// seconds, never below 1
    pub elapsed_time: f64,
    pub history: Vec<Sample>,
    pub date: DateTime<Local>,
}

impl SessionResult {
    /// Whole words typed correctly, as shown on the results screen
    pub fn words_typed(&self) -> usize {
        self.correct_chars / CHARS_PER_WORD as usize
    }
}

/// Seconds between `start` and `end`, zero if the clock went backwards
pub fn secs_between(start: SystemTime, end: SystemTime) -> f64 {
    end.duration_since(start)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

/// Score a full input snapshot against the target text.
///
/// Every typed position is compared with the target position at the same
/// index by exact `char` equality; positions past the end of the target
/// count as incorrect. Wpm is net: `(typed - incorrect) / 5` words per
/// minute, with the elapsed time floored at [`MIN_STATS_SECS`].
pub fn compute_stats(
    input: &str,
    target: &str,
    started_at: Option<SystemTime>,
    now: SystemTime,
) -> Stats {
    let started_at = match started_at {
        Some(s) if !input.is_empty() => s,
        _ => return Stats::default(),
    };

    let duration_secs = secs_between(started_at, now).max(MIN_STATS_SECS);
    let minutes = duration_secs / 60.0;

    let mut expected = target.chars();
    let (mut correct_chars, mut incorrect_chars) = (0usize, 0usize);
    let mut typed = 0usize;
    for c in input.chars() {
        typed += 1;
        match expected.next() {
            Some(e) if e == c => correct_chars += 1,
            _ => incorrect_chars += 1,
        }
    }

    let net_words = ((typed - incorrect_chars) as f64 / CHARS_PER_WORD).max(0.0);
    let wpm = (net_words / minutes).round() as u32;
    let accuracy = ((correct_chars as f64 / typed as f64) * 100.0).round() as u32;

    Stats {
        wpm,
        accuracy,
        correct_chars,
        incorrect_chars,
    }
}
