//! Density clustering (DBSCAN) over distinct colors.
//!
//! Points are pixels in RGB space. Identical pixels share one histogram entry
//! and carry its count as weight, so a distinct color is a core point when the
//! pixels within `eps` of it (itself and its duplicates included) number at
//! least `min_samples + 1`. Neighbor queries go through a fixed-resolution
//! spatial hash whose cell edge is `max(eps, 1)`, so only the 27 surrounding
//! cells are ever scanned.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use std::collections::HashMap;

use crate::buffer::ColorSum;
use crate::color::{Rgbf, pack};
use crate::error::QuantizeError;
use crate::histogram::HistEntry;
use crate::palette::Palette;

/// Spatial hash over RGB space.
#[derive(Debug)]
struct ColorGrid {
    cell: f32,
    cells: HashMap<u32, Vec<u32>>,
}

impl ColorGrid {
    fn new(points: &[Rgbf], eps: f32) -> Self {
        let mut grid = Self {
            cell: eps.max(1.0),
            cells: HashMap::new(),
        };
        for (i, p) in points.iter().enumerate() {
            let [x, y, z] = grid.coords(*p);
            grid.cells.entry(cell_key(x, y, z)).or_default().push(i as u32);
        }
        grid
    }

    #[inline]
    fn coords(&self, p: Rgbf) -> [i32; 3] {
        [
            (p.r / self.cell).floor() as i32,
            (p.g / self.cell).floor() as i32,
            (p.b / self.cell).floor() as i32,
        ]
    }

    /// Call `f` for every point within `eps` of `points[center]`, the center
    /// included. Stops early when `f` returns `false`.
    fn for_each_within(
        &self,
        points: &[Rgbf],
        center: usize,
        eps_sq: f32,
        mut f: impl FnMut(usize) -> bool,
    ) {
        let p = points[center];
        let [cx, cy, cz] = self.coords(p);
        for x in cx - 1..=cx + 1 {
            for y in cy - 1..=cy + 1 {
                for z in cz - 1..=cz + 1 {
                    if !(0..256).contains(&x) || !(0..256).contains(&y) || !(0..256).contains(&z) {
                        continue;
                    }
                    let Some(members) = self.cells.get(&cell_key(x, y, z)) else {
                        continue;
                    };
                    for &j in members {
                        let j = j as usize;
                        if p.distance_sq(points[j]) <= eps_sq && !f(j) {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[inline]
fn cell_key(x: i32, y: i32, z: i32) -> u32 {
    (x as u32) << 16 | (y as u32) << 8 | z as u32
}

/// Raw DBSCAN output, one entry per histogram color.
#[derive(Debug, Clone)]
pub(crate) struct DensityClusters {
    /// Cluster id per distinct color; `None` is noise.
    pub labels: Vec<Option<usize>>,
    /// Number of clusters discovered.
    pub cluster_count: usize,
    /// Distinct colors that are core points.
    pub core_count: usize,
}

/// Run DBSCAN over a distinct-color histogram.
///
/// Clusters are numbered in discovery order, scanning colors in histogram
/// order. A border color reachable from several clusters joins the first.
/// `eps` must already be validated as finite and positive.
pub(crate) fn dbscan(histogram: &[HistEntry], eps: f32, min_samples: usize) -> DensityClusters {
    let points: Vec<Rgbf> = histogram.iter().map(|e| Rgbf::from_rgb8(e.color)).collect();
    let grid = ColorGrid::new(&points, eps);
    let eps_sq = eps * eps;
    let needed = (min_samples as u64).saturating_add(1);

    let is_core = |i: usize| {
        let mut weight = 0u64;
        grid.for_each_within(&points, i, eps_sq, |j| {
            weight += histogram[j].count;
            weight < needed
        });
        weight >= needed
    };

    #[cfg(feature = "parallel")]
    let core: Vec<bool> = {
        use rayon::prelude::*;
        (0..points.len()).into_par_iter().map(is_core).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let core: Vec<bool> = (0..points.len()).map(is_core).collect();

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut cluster_count = 0;
    let mut queue = VecDeque::new();

    for start in 0..points.len() {
        if !core[start] || labels[start].is_some() {
            continue;
        }

        let id = cluster_count;
        cluster_count += 1;
        labels[start] = Some(id);
        queue.push_back(start);

        while let Some(i) = queue.pop_front() {
            grid.for_each_within(&points, i, eps_sq, |j| {
                if labels[j].is_none() {
                    labels[j] = Some(id);
                    if core[j] {
                        queue.push_back(j);
                    }
                }
                true
            });
        }
    }

    DensityClusters {
        labels,
        cluster_count,
        core_count: core.iter().filter(|&&c| c).count(),
    }
}

/// Palette and final labels derived from density clusters.
#[derive(Debug, Clone)]
pub(crate) struct DensityPalette {
    pub palette: Palette,
    /// Palette index per histogram color, no noise left.
    pub color_labels: Vec<usize>,
    /// Clusters kept after capping.
    pub retained: usize,
    /// Pixels that were noise or belonged to a discarded cluster.
    pub reassigned_pixels: u64,
}

/// Turn raw clusters into a palette of at most `max_colors` centroids.
///
/// When capping, clusters are ranked by pixel count (ties to the lower id)
/// and the largest are kept, in discovery order. Noise colors and members of
/// discarded clusters go to the nearest retained centroid, however far.
pub(crate) fn finalize(
    histogram: &[HistEntry],
    clusters: &DensityClusters,
    max_colors: Option<usize>,
) -> Result<DensityPalette, QuantizeError> {
    if clusters.cluster_count == 0 {
        return Err(QuantizeError::NoClusterFound);
    }

    let mut stats = vec![ColorSum::default(); clusters.cluster_count];
    for (e, label) in histogram.iter().zip(&clusters.labels) {
        if let Some(id) = label {
            stats[*id].add(e.color, e.count);
        }
    }

    let mut keep = vec![true; clusters.cluster_count];
    if let Some(max) = max_colors {
        if clusters.cluster_count > max {
            let mut ranked: Vec<usize> = (0..clusters.cluster_count).collect();
            ranked.sort_by_key(|&id| (core::cmp::Reverse(stats[id].count()), id));
            keep = vec![false; clusters.cluster_count];
            for &id in ranked.iter().take(max) {
                keep[id] = true;
            }
        }
    }

    // Cluster id -> index into the retained centroid list.
    let mut retained_index = vec![None; clusters.cluster_count];
    let mut centroids = Vec::new();
    for (id, s) in stats.iter().enumerate() {
        if keep[id] {
            if let Some(mean) = s.mean() {
                retained_index[id] = Some(centroids.len());
                centroids.push(mean);
            }
        }
    }
    let retained = centroids.len();
    let (palette, slots) = Palette::from_centroids_with_slots(centroids);

    let mut reassigned_pixels = 0u64;
    let color_labels = histogram
        .iter()
        .zip(&clusters.labels)
        .map(|(e, label)| match label.and_then(|id| retained_index[id]) {
            Some(r) => slots[r],
            None => {
                reassigned_pixels += e.count;
                palette.nearest(Rgbf::from_rgb8(e.color))
            }
        })
        .collect();

    Ok(DensityPalette {
        palette,
        color_labels,
        retained,
        reassigned_pixels,
    })
}

/// Expand per-color labels to per-pixel labels.
///
/// `histogram` must be the (key-sorted) histogram of `pixels`.
pub(crate) fn pixel_labels(
    pixels: &[rgb::RGB8],
    histogram: &[HistEntry],
    color_labels: &[usize],
) -> Result<Vec<usize>, QuantizeError> {
    pixels
        .iter()
        .enumerate()
        .map(|(index, &p)| {
            histogram
                .binary_search_by_key(&pack(p), |e| pack(e.color))
                .ok()
                .and_then(|idx| color_labels.get(idx).copied())
                .ok_or(QuantizeError::ColorNotInHistogram { index })
        })
        .collect()
}
