use serde::{Deserialize, Serialize};

/// One point of the WPM-over-time series: whole elapsed seconds and the wpm at that moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "time")]
    pub t: u64,
    pub wpm: u32,
}

impl Sample {
    pub fn new(t: u64, wpm: u32) -> Self {
        Self { t, wpm }
    }
}

impl From<(u64, u32)> for Sample {
    fn from(v: (u64, u32)) -> Self {
        Sample { t: v.0, wpm: v.1 }
    }
}

impl From<Sample> for (f64, f64) {
    fn from(p: Sample) -> Self {
        (p.t as f64, p.wpm as f64)
    }
}

/// Append `point` unless a sample for the same second is already last.
/// Returns whether the point was recorded.
pub fn push_dedup(series: &mut Vec<Sample>, point: Sample) -> bool {
    match series.last() {
        Some(last) if last.t == point.t => false,
        _ => {
            series.push(point);
            true
        }
    }
}
