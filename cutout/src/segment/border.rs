/// Border positions `(y, x)` in voting order: left column top to bottom,
/// right column top to bottom, top row left to right, bottom row left to right.
///
/// Corners are yielded more than once (twice for ordinary frames, four times
/// for a 1x1 frame), which weights them heavier in the key color vote.
pub fn voting_order(h: usize, w: usize) -> impl Iterator<Item = (usize, usize)> {
    let left = (0..h).map(|y| (y, 0));
    let right = (0..h).map(move |y| (y, w - 1));
    let top = (0..w).map(|x| (0, x));
    let bottom = (0..w).map(move |x| (h - 1, x));
    left.chain(right).chain(top).chain(bottom)
}

/// Each border position exactly once, in row-major order.
pub fn scan_order(h: usize, w: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..h).flat_map(move |y| {
        let full_row = y == 0 || y == h - 1;
        let xs: Box<dyn Iterator<Item = usize>> = if full_row {
            Box::new(0..w)
        } else if w > 1 {
            Box::new([0, w - 1].into_iter())
        } else {
            Box::new(std::iter::once(0))
        };
        xs.map(move |x| (y, x))
    })
}
