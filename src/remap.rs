use alloc::vec;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::buffer::{PixelBuffer, validate_dimensions};
use crate::color::{Rgbf, nearest_index};
use crate::error::QuantizeError;
use crate::palette::Palette;

/// Paint an output buffer from a palette and one label per pixel.
///
/// Every label must index into `palette`, and there must be exactly
/// `width * height` of them.
pub fn remap(
    palette: &Palette,
    labels: &[usize],
    width: usize,
    height: usize,
) -> Result<PixelBuffer, QuantizeError> {
    validate_dimensions(labels.len(), width, height)?;

    let entries = palette.entries();
    let mut pixels = Vec::with_capacity(labels.len());
    for (index, &label) in labels.iter().enumerate() {
        let Some(&color) = entries.get(label) else {
            return Err(QuantizeError::LabelOutOfRange {
                index,
                label,
                palette_len: entries.len(),
            });
        };
        pixels.push(color);
    }

    PixelBuffer::new(width, height, pixels)
}

/// Label every pixel with its nearest palette centroid (Euclidean distance,
/// ties to the lowest index).
pub fn assign_nearest(pixels: &[RGB8], palette: &Palette) -> Vec<usize> {
    nearest_each(pixels, palette.centroids(), |p| Rgbf::from_rgb8(*p))
}

/// Nearest-centroid index for each item. Each output slot is written once
/// and the centroids are read-only, so this splits cleanly across threads.
pub(crate) fn nearest_each<T, F>(items: &[T], centroids: &[Rgbf], color: F) -> Vec<usize>
where
    T: Sync,
    F: Fn(&T) -> Rgbf + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        items
            .par_iter()
            .map(|item| nearest_index(centroids, color(item)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        items
            .iter()
            .map(|item| nearest_index(centroids, color(item)))
            .collect()
    }
}

/// Drop palette entries no label points at, renumbering labels to match.
/// Surviving entries keep their relative order.
pub fn compact(palette: &Palette, labels: &mut [usize]) -> Palette {
    let mut used = vec![false; palette.len()];
    for &label in labels.iter() {
        if let Some(u) = used.get_mut(label) {
            *u = true;
        }
    }

    if used.iter().all(|&u| u) {
        return palette.clone();
    }

    let mut new_index = vec![usize::MAX; palette.len()];
    let mut kept = Vec::new();
    for (i, &u) in used.iter().enumerate() {
        if u {
            new_index[i] = kept.len();
            kept.push(palette.centroids()[i]);
        }
    }

    for label in labels.iter_mut() {
        if let Some(&n) = new_index.get(*label) {
            *label = n;
        }
    }

    Palette::from_centroids(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_palette() -> Palette {
        Palette::from_centroids(vec![
            Rgbf::new(0.0, 0.0, 0.0),
            Rgbf::new(85.0, 85.0, 85.0),
            Rgbf::new(170.2, 170.2, 170.2),
            Rgbf::new(255.0, 255.0, 255.0),
        ])
    }

    #[test]
    fn remap_paints_rounded_entries() {
        let palette = gray_palette();
        let out = remap(&palette, &[2, 0, 3, 1], 2, 2).unwrap();
        assert_eq!(
            out.pixels(),
            [
                RGB8::new(170, 170, 170),
                RGB8::new(0, 0, 0),
                RGB8::new(255, 255, 255),
                RGB8::new(85, 85, 85),
            ]
        );
    }

    #[test]
    fn remap_rejects_wrong_label_count() {
        let palette = gray_palette();
        assert!(matches!(
            remap(&palette, &[0, 1, 2], 2, 2),
            Err(QuantizeError::DimensionMismatch { len: 3, .. })
        ));
    }

    #[test]
    fn remap_rejects_out_of_range_label() {
        let palette = gray_palette();
        assert!(matches!(
            remap(&palette, &[0, 1, 9, 1], 2, 2),
            Err(QuantizeError::LabelOutOfRange { index: 2, label: 9, palette_len: 4 })
        ));
    }

    #[test]
    fn assign_nearest_finds_closest_gray() {
        let palette = gray_palette();
        let pixels = [
            RGB8::new(10, 0, 5),
            RGB8::new(90, 80, 85),
            RGB8::new(250, 251, 255),
        ];
        assert_eq!(assign_nearest(&pixels, &palette), [0, 1, 3]);
    }

    #[test]
    fn compact_drops_unused_entries() {
        let palette = gray_palette();
        let mut labels = vec![3, 1, 3, 1];
        let compacted = compact(&palette, &mut labels);
        assert_eq!(compacted.len(), 2);
        assert_eq!(labels, [1, 0, 1, 0]);
        assert_eq!(
            compacted.entries(),
            [RGB8::new(85, 85, 85), RGB8::new(255, 255, 255)]
        );
    }
}
