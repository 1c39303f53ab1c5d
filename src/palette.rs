use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::color::{Rgbf, nearest_index, pack};

/// A finalized, ordered set of cluster centroids.
///
/// Keeps both the float centroid (used for nearest-color search) and its
/// integer rounding (what ends up in the output buffer). Entries are distinct
/// after rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<RGB8>,
    centroids: Vec<Rgbf>,
}

impl Palette {
    /// Build a palette from centroids in order. Centroids that round to an
    /// already-present color collapse onto the first one.
    pub fn from_centroids(centroids: Vec<Rgbf>) -> Self {
        Self::from_centroids_with_slots(centroids).0
    }

    /// Like [`Palette::from_centroids`], also returning, for each input
    /// centroid, the palette index it ended up at.
    pub fn from_centroids_with_slots(centroids: Vec<Rgbf>) -> (Self, Vec<usize>) {
        let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
        let mut entries = Vec::with_capacity(centroids.len());
        let mut kept = Vec::with_capacity(centroids.len());
        let mut slots = Vec::with_capacity(centroids.len());

        for c in centroids {
            let rounded = c.to_rgb8();
            let slot = *seen.entry(pack(rounded)).or_insert_with(|| {
                entries.push(rounded);
                kept.push(c);
                entries.len() - 1
            });
            slots.push(slot);
        }

        (
            Self {
                entries,
                centroids: kept,
            },
            slots,
        )
    }

    /// Rounded palette colors.
    pub fn entries(&self) -> &[RGB8] {
        &self.entries
    }

    /// Unrounded centroids, same order as [`Palette::entries`].
    pub fn centroids(&self) -> &[Rgbf] {
        &self.centroids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the centroid nearest to `color`. Ties go to the lowest index.
    pub fn nearest(&self, color: Rgbf) -> usize {
        nearest_index(&self.centroids, color)
    }

    /// Distance from a color to a palette centroid.
    pub fn distance_sq(&self, color: Rgbf, index: usize) -> f32 {
        color.distance_sq(self.centroids[index])
    }
}
