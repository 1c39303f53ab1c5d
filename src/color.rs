use rgb::RGB8;

/// Floating-point RGB triple used for centroids and distances.
///
/// Channels are on the same 0..=255 scale as the input pixels, so Euclidean
/// distance here is distance in RGB space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgbf {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgbf {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn from_rgb8(p: RGB8) -> Self {
        Self::new(p.r as f32, p.g as f32, p.b as f32)
    }

    /// Squared Euclidean distance in RGB space.
    #[inline]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        dr * dr + dg * dg + db * db
    }

    /// Channel value by axis index (0 = R, 1 = G, 2 = B).
    #[inline]
    pub fn channel(self, axis: usize) -> f32 {
        match axis {
            0 => self.r,
            1 => self.g,
            _ => self.b,
        }
    }

    /// Round each channel to the nearest integer, clamped to 0..=255.
    pub fn to_rgb8(self) -> RGB8 {
        RGB8::new(round_channel(self.r), round_channel(self.g), round_channel(self.b))
    }
}

impl From<RGB8> for Rgbf {
    fn from(p: RGB8) -> Self {
        Self::from_rgb8(p)
    }
}

#[inline]
fn round_channel(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Index of the centroid nearest to `color`. Ties go to the lowest index;
/// an empty slice yields 0.
#[inline]
pub fn nearest_index(centroids: &[Rgbf], color: Rgbf) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f32::MAX;

    for (i, c) in centroids.iter().enumerate() {
        let d = color.distance_sq(*c);
        if d < best_dist {
            best_dist = d;
            best_idx = i;
        }
    }

    best_idx
}

/// Pack an RGB8 into a 24-bit key. Ordering follows (r, g, b).
#[inline]
pub(crate) fn pack(p: RGB8) -> u32 {
    (p.r as u32) << 16 | (p.g as u32) << 8 | p.b as u32
}

#[inline]
pub(crate) fn unpack(key: u32) -> RGB8 {
    RGB8::new((key >> 16) as u8, (key >> 8) as u8, key as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero_and_clamped() {
        assert_eq!(Rgbf::new(0.5, 127.49, 254.5).to_rgb8(), RGB8::new(1, 127, 255));
        assert_eq!(Rgbf::new(-3.0, 300.0, f32::NAN).to_rgb8(), RGB8::new(0, 255, 0));
    }

    #[test]
    fn distance_is_euclidean_squared() {
        let a = Rgbf::new(0.0, 0.0, 0.0);
        let b = Rgbf::new(3.0, 4.0, 12.0);
        assert_eq!(a.distance_sq(b), 169.0);
    }

    #[test]
    fn pack_roundtrip_preserves_order() {
        let a = RGB8::new(1, 2, 3);
        let b = RGB8::new(1, 3, 0);
        assert_eq!(unpack(pack(a)), a);
        assert!(pack(a) < pack(b));
    }
}
