use std::time::Duration;

use crate::metrics::SteelHeuristic;

/// Length of a keep/discard unit.
pub const DEFAULT_CHUNK_DURATION: Duration = Duration::from_secs(10);
/// Laplacian variance below which a frame counts as blurry.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;
/// Mean luma below which a frame counts as blacked out.
pub const DEFAULT_BLACKOUT_THRESHOLD: f64 = 30.0;

/// Tunables for a filtering run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    pub chunk_duration: Duration,
    pub blur_threshold: f64,
    pub blackout_threshold: f64,
    pub steel: SteelHeuristic,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            chunk_duration: DEFAULT_CHUNK_DURATION,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            blackout_threshold: DEFAULT_BLACKOUT_THRESHOLD,
            steel: SteelHeuristic::default(),
        }
    }
}
