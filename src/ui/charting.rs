use itertools::{Itertools, MinMaxResult};
use typemaster::stats::SessionResult;

/// Chart points for a finished session. A session too short to have been
/// sampled is drawn as a straight line from the origin to its final wpm.
pub fn result_series(result: &SessionResult) -> Vec<(f64, f64)> {
    if result.history.is_empty() {
        return vec![(0.0, 0.0), (result.elapsed_time, result.wpm as f64)];
    }
    result.history.iter().map(|&p| p.into()).collect()
}

/// Compute X (seconds) and Y (WPM) upper bounds for a chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let overall_duration = points.last().map_or(1.0, |p| p.0).max(1.0);

    let highest_wpm = match points.iter().map(|p| p.1).minmax() {
        MinMaxResult::NoElements => 0.0,
        MinMaxResult::OneElement(w) => w,
        MinMaxResult::MinMax(_, w) => w,
    };

    (overall_duration, highest_wpm.round().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
