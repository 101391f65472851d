use std::collections::HashMap;

use cutout_common::color::{is_similar, threshold_for_tolerance, Color};
use cutout_common::frame::FrameBuffer;
use tracing::debug;

use super::border;

/// The background color chosen by the border vote on frame 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyColor {
    pub color: Color,
    /// Votes the winning color received.
    pub count: usize,
    /// Total border samples, corners included more than once.
    pub samples: usize,
    /// Share of samples within the coverage tolerance of `color`.
    pub coverage: f64,
}

impl KeyColor {
    /// Whether enough of the border matches the key color for a flood fill
    /// cutout to be reliable. The bound is inclusive.
    pub fn is_uniform(&self, min_coverage: f64) -> bool {
        self.coverage >= min_coverage
    }
}

/// Majority vote over the border of frame 0.
///
/// The winner only changes when a color's count strictly exceeds the current
/// maximum, so ties go to the color that reached the count first in
/// [`border::voting_order`]. Later frames are assumed to share the background.
pub fn detect_key_color(buffer: &FrameBuffer, coverage_tolerance: i32) -> KeyColor {
    let (h, w) = (buffer.height(), buffer.width());
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut best = Color::default();
    let mut best_count = 0;
    let mut samples = 0;

    for (y, x) in border::voting_order(h, w) {
        let color = buffer.get(0, y, x);
        let count = counts.entry(color.pack()).or_insert(0);
        *count += 1;
        samples += 1;
        if *count > best_count {
            best_count = *count;
            best = color;
        }
    }

    let threshold = threshold_for_tolerance(coverage_tolerance);
    let covered: usize = counts
        .iter()
        .filter(|(key, _)| is_similar(Color::unpack(**key), best, threshold))
        .map(|(_, &count)| count)
        .sum();
    let coverage = covered as f64 / samples as f64;

    debug!(
        distinct = counts.len(),
        samples,
        coverage = format!("{:.3}", coverage),
        "border vote finished"
    );

    KeyColor {
        color: best,
        count: best_count,
        samples,
        coverage,
    }
}
