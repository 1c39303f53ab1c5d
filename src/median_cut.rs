use alloc::vec::Vec;

use crate::buffer::ColorSum;
use crate::color::{Rgbf, pack};
use crate::histogram::HistEntry;

/// A box of distinct colors for median cut subdivision.
#[derive(Debug, Clone)]
struct ColorBox {
    entries: Vec<HistEntry>,
}

impl ColorBox {
    fn new(entries: Vec<HistEntry>) -> Self {
        Self { entries }
    }

    fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Range (max - min) along R, G and B.
    fn ranges(&self) -> [u8; 3] {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];

        for e in &self.entries {
            let c = [e.color.r, e.color.g, e.color.b];
            for axis in 0..3 {
                min[axis] = min[axis].min(c[axis]);
                max[axis] = max[axis].max(c[axis]);
            }
        }

        [
            max[0].saturating_sub(min[0]),
            max[1].saturating_sub(min[1]),
            max[2].saturating_sub(min[2]),
        ]
    }

    /// Widest channel and its range. Ties prefer R, then G.
    fn widest_axis(&self) -> (usize, u8) {
        let [rr, rg, rb] = self.ranges();
        if rr >= rg && rr >= rb {
            (0, rr)
        } else if rg >= rb {
            (1, rg)
        } else {
            (2, rb)
        }
    }

    fn centroid(&self) -> Rgbf {
        let mut sum = ColorSum::default();
        for e in &self.entries {
            sum.add(e.color, e.count);
        }
        sum.mean().unwrap_or_default()
    }

    /// Split along the widest channel at the pixel-count median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (axis, _) = self.widest_axis();

        self.entries.sort_unstable_by_key(|e| {
            let v = [e.color.r, e.color.g, e.color.b][axis];
            (v, pack(e.color))
        });

        let half = self.total_count().div_ceil(2);
        let mut accumulated = 0u64;
        let mut split_idx = 1;

        for (i, e) in self.entries.iter().enumerate() {
            accumulated += e.count;
            if accumulated >= half {
                split_idx = i + 1;
                break;
            }
        }

        // At least one entry per side
        split_idx = split_idx.clamp(1, self.entries.len() - 1);

        let right = self.entries.split_off(split_idx);
        (ColorBox::new(self.entries), ColorBox::new(right))
    }
}

/// Median cut over a distinct-color histogram.
///
/// Repeatedly splits the box with the greatest channel range until there are
/// `max_colors` boxes or no box spans more than one color. Returns one mean
/// color per box, in box order.
pub fn median_cut(histogram: Vec<HistEntry>, max_colors: usize) -> Vec<Rgbf> {
    if histogram.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    if histogram.len() <= max_colors {
        return histogram
            .into_iter()
            .map(|e| Rgbf::from_rgb8(e.color))
            .collect();
    }

    let mut boxes = Vec::with_capacity(max_colors);
    boxes.push(ColorBox::new(histogram));

    while boxes.len() < max_colors {
        let mut best: Option<(usize, u8)> = None;
        for (i, b) in boxes.iter().enumerate() {
            let (_, range) = b.widest_axis();
            if range > 0 && best.map_or(true, |(_, r)| range > r) {
                best = Some((i, range));
            }
        }

        let Some((idx, _)) = best else {
            break; // No more splittable boxes
        };

        let (left, right) = boxes.remove(idx).split();
        boxes.insert(idx, right);
        boxes.insert(idx, left);
    }

    boxes.iter().map(ColorBox::centroid).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGB8;

    fn entry(r: u8, g: u8, b: u8, count: u64) -> HistEntry {
        HistEntry {
            color: RGB8::new(r, g, b),
            count,
        }
    }

    #[test]
    fn empty_histogram() {
        assert!(median_cut(Vec::new(), 16).is_empty());
    }

    #[test]
    fn fewer_colors_than_max_are_kept_exactly() {
        let hist = alloc::vec![entry(0, 0, 0, 2), entry(255, 255, 255, 2)];
        let result = median_cut(hist, 16);
        assert_eq!(
            result,
            [Rgbf::new(0.0, 0.0, 0.0), Rgbf::new(255.0, 255.0, 255.0)]
        );
    }

    #[test]
    fn produces_requested_count() {
        let hist = (0..100).map(|i| entry(i as u8, 0, 0, 1)).collect();
        assert_eq!(median_cut(hist, 8).len(), 8);
    }

    #[test]
    fn splits_along_widest_channel() {
        // Wide in blue, narrow in red.
        let hist = alloc::vec![
            entry(10, 0, 0, 1),
            entry(12, 0, 10, 1),
            entry(10, 0, 240, 1),
            entry(12, 0, 250, 1),
        ];
        let mut result = median_cut(hist, 2);
        result.sort_by(|a, b| a.b.total_cmp(&b.b));
        assert_eq!(result[0], Rgbf::new(11.0, 0.0, 5.0));
        assert_eq!(result[1], Rgbf::new(11.0, 0.0, 245.0));
    }

    #[test]
    fn median_is_weighted_by_pixel_count() {
        // One heavy dark color plus three light ones; the dark color alone
        // holds half the pixels, so it becomes its own box.
        let hist = alloc::vec![
            entry(0, 0, 0, 30),
            entry(200, 200, 200, 10),
            entry(220, 220, 220, 10),
            entry(240, 240, 240, 10),
        ];
        let result = median_cut(hist, 2);
        assert!(result.contains(&Rgbf::new(0.0, 0.0, 0.0)));
        assert!(result.contains(&Rgbf::new(220.0, 220.0, 220.0)));
    }

    #[test]
    fn counts_beyond_u32_are_weighted() {
        let heavy = u32::MAX as u64 + 10;
        let hist = alloc::vec![
            entry(0, 0, 0, heavy),
            entry(100, 100, 100, 1),
            entry(101, 100, 100, 1),
        ];
        let result = median_cut(hist, 2);
        assert!(result.contains(&Rgbf::new(0.0, 0.0, 0.0)));
        let light = result.iter().find(|c| c.r > 50.0).unwrap();
        assert!((light.r - 100.5).abs() < 1e-3, "got {light:?}");
    }

    #[test]
    fn deterministic() {
        let hist: Vec<HistEntry> = (0..64u64)
            .map(|i| entry((i * 37 % 256) as u8, (i * 11) as u8, (i * 3) as u8, i + 1))
            .collect();
        assert_eq!(median_cut(hist.clone(), 7), median_cut(hist, 7));
    }
}
