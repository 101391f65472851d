/// Size in bytes of one serialized pixel record (r, g, b, a).
pub const COLOR_SIZE: usize = 4;

/// An RGBA pixel with 8 bits per channel.
///
/// `a == 0` marks a pixel as transparent; such pixels are never matched
/// against a key color again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black, written over every removed background pixel.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_bytes(bytes: [u8; COLOR_SIZE]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub const fn to_bytes(self) -> [u8; COLOR_SIZE] {
        [self.r, self.g, self.b, self.a]
    }

    /// Pack the four channels into a single integer key, `r` in the lowest byte.
    pub const fn pack(self) -> u32 {
        u32::from_le_bytes(self.to_bytes())
    }

    pub const fn unpack(key: u32) -> Self {
        Self::from_bytes(key.to_le_bytes())
    }

    pub const fn is_opaque(self) -> bool {
        self.a != 0
    }

    /// Squared Euclidean distance over RGB. Alpha is ignored.
    pub fn diff(self, other: Color) -> u32 {
        let sq = |a: u8, b: u8| {
            let d = a.abs_diff(b) as u32;
            d * d
        };
        sq(self.r, other.r) + sq(self.g, other.g) + sq(self.b, other.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Convert a per-channel tolerance into a squared-distance threshold.
///
/// Two colors whose R, G and B each differ by at most `tolerance` always
/// satisfy `diff <= threshold`; the worst case hits the threshold exactly.
/// Negative tolerances are treated by magnitude.
pub fn threshold_for_tolerance(tolerance: i32) -> u64 {
    let t = tolerance.unsigned_abs() as u64;
    3 * t * t
}

/// Whether `color` is within `threshold` of `reference`.
#[inline]
pub fn is_similar(color: Color, reference: Color, threshold: u64) -> bool {
    color.diff(reference) as u64 <= threshold
}
