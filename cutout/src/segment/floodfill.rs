use cutout_common::color::{is_similar, Color};
use cutout_common::frame::FrameBuffer;
use tracing::{debug, trace};

use super::border;

/// Up, down, left, right as `(dy, dx)`.
const NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Border-seeded flood fill that clears background regions to transparent.
///
/// Every neighbor is compared against the fixed key color, never against the
/// pixel it was reached from, so tolerance does not accumulate along a
/// gradient. Pixels are cleared the moment they are accepted, which makes the
/// transparent alpha double as the visited mark: each pixel is cleared at most
/// once per frame.
pub struct FloodFill {
    key: Color,
    threshold: u64,
    /// Worklist of `(y, x)`, kept across fills to reuse its allocation.
    stack: Vec<(usize, usize)>,
}

/// Outcome of processing a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Border pixels that started a fill.
    pub seeds: usize,
    /// Pixels turned transparent.
    pub filled: usize,
}

/// Totals over all frames of a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub frames: usize,
    pub seeds: usize,
    pub filled: usize,
}

impl FloodFill {
    pub fn new(key: Color, threshold: u64) -> Self {
        Self {
            key,
            threshold,
            stack: Vec::new(),
        }
    }

    /// Process every frame in order.
    pub fn run(&mut self, buffer: &mut FrameBuffer) -> RunReport {
        let mut total = RunReport::default();
        for t in 0..buffer.frames() {
            let report = self.run_frame(buffer, t);
            debug!(frame = t, seeds = report.seeds, filled = report.filled, "frame done");
            total.frames += 1;
            total.seeds += report.seeds;
            total.filled += report.filled;
        }
        total
    }

    /// Seed a fill from every opaque border pixel of frame `t` that matches
    /// the key color.
    pub fn run_frame(&mut self, buffer: &mut FrameBuffer, t: usize) -> FrameReport {
        let (h, w) = (buffer.height(), buffer.width());
        let frame = buffer.frame_mut(t);
        let mut report = FrameReport::default();

        for (y, x) in border::scan_order(h, w) {
            let c = frame[y * w + x];
            if c.is_opaque() && is_similar(c, self.key, self.threshold) {
                report.seeds += 1;
                report.filled += self.fill(frame, h, w, y, x);
            }
        }
        report
    }

    /// Clear the 4-connected region of matching opaque pixels around
    /// `(sy, sx)`. The seed itself is cleared unconditionally. Returns the
    /// number of pixels cleared.
    fn fill(&mut self, frame: &mut [Color], h: usize, w: usize, sy: usize, sx: usize) -> usize {
        trace!(y = sy, x = sx, "start floodfill");
        self.stack.clear();
        frame[sy * w + sx] = Color::TRANSPARENT;
        self.stack.push((sy, sx));
        let mut filled = 1;

        while let Some((y, x)) = self.stack.pop() {
            for (dy, dx) in NEIGHBORS {
                let (Some(ny), Some(nx)) = (y.checked_add_signed(dy), x.checked_add_signed(dx)) else {
                    continue;
                };
                if ny >= h || nx >= w {
                    continue;
                }
                let c = &mut frame[ny * w + nx];
                if !c.is_opaque() || !is_similar(*c, self.key, self.threshold) {
                    continue;
                }
                *c = Color::TRANSPARENT;
                self.stack.push((ny, nx));
                filled += 1;
            }
        }
        filled
    }
}
