//! Lloyd's k-means and mini-batch k-means in RGB space.
//!
//! Both start from k-means++ seeding over the distinct-color histogram, with
//! every random draw taken from a caller-seeded [`StdRng`]. Centroids stay in
//! `f32` throughout; rounding happens only when the palette is built.

use alloc::vec;
use alloc::vec::Vec;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rgb::RGB8;

use crate::buffer::ColorSum;
use crate::color::{Rgbf, nearest_index};
use crate::histogram::HistEntry;
use crate::remap::nearest_each;

/// Centroids produced by a k-means run.
#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    pub centroids: Vec<Rgbf>,
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether the run stopped on its own rather than at the iteration cap.
    pub converged: bool,
}

/// k-means++ seeding, weighted by pixel count.
///
/// Picks at most `min(k, histogram.len())` centroids, all at distinct input
/// colors. Stops early if every remaining color coincides with a centroid.
pub fn plus_plus_init(histogram: &[HistEntry], k: usize, rng: &mut StdRng) -> Vec<Rgbf> {
    let k = k.min(histogram.len());
    let mut centroids = Vec::with_capacity(k);
    if k == 0 {
        return centroids;
    }

    let total: u64 = histogram.iter().map(|e| e.count).sum();
    let mut target = rng.gen_range(0..total);
    let mut first = histogram.len() - 1;
    for (i, e) in histogram.iter().enumerate() {
        if target < e.count {
            first = i;
            break;
        }
        target -= e.count;
    }
    let first = Rgbf::from_rgb8(histogram[first].color);
    centroids.push(first);

    let points: Vec<Rgbf> = histogram.iter().map(|e| Rgbf::from_rgb8(e.color)).collect();
    let mut d2: Vec<f64> = points.iter().map(|p| p.distance_sq(first) as f64).collect();

    while centroids.len() < k {
        let weighted: f64 = d2
            .iter()
            .zip(histogram)
            .map(|(d, e)| d * e.count as f64)
            .sum();
        if weighted <= 0.0 {
            break;
        }

        let threshold = rng.gen::<f64>() * weighted;
        let mut acc = 0.0;
        let mut pick = None;
        for (i, (d, e)) in d2.iter().zip(histogram).enumerate() {
            if *d <= 0.0 {
                continue;
            }
            acc += d * e.count as f64;
            pick = Some(i);
            if acc > threshold {
                break;
            }
        }
        let Some(pick) = pick else {
            break;
        };

        let chosen = points[pick];
        centroids.push(chosen);
        for (d, p) in d2.iter_mut().zip(&points) {
            *d = d.min(p.distance_sq(chosen) as f64);
        }
    }

    centroids
}

/// Lloyd's algorithm over the weighted histogram.
///
/// Each iteration assigns every distinct color to its nearest centroid, then
/// moves each centroid to the mean of its members. Stops when no assignment
/// changes or after `max_iterations`. Centroids left without members are
/// dropped from the result.
pub fn kmeans(histogram: &[HistEntry], k: usize, max_iterations: usize, seed: u64) -> KMeansOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = plus_plus_init(histogram, k, &mut rng);
    let mut assignments = vec![usize::MAX; histogram.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        // Assignment phase completes before any centroid moves.
        let next = nearest_each(histogram, &centroids, |e| Rgbf::from_rgb8(e.color));
        if next == assignments {
            converged = true;
            break;
        }
        assignments = next;

        let mut sums = vec![ColorSum::default(); centroids.len()];
        for (e, &a) in histogram.iter().zip(&assignments) {
            sums[a].add(e.color, e.count);
        }
        for (c, s) in centroids.iter_mut().zip(&sums) {
            if let Some(mean) = s.mean() {
                *c = mean;
            }
        }
    }

    let mut used = vec![false; centroids.len()];
    for &a in &assignments {
        if let Some(u) = used.get_mut(a) {
            *u = true;
        }
    }
    let centroids = centroids
        .into_iter()
        .zip(used)
        .filter_map(|(c, u)| u.then_some(c))
        .collect();

    KMeansOutcome {
        centroids,
        iterations,
        converged,
    }
}

/// Mini-batch k-means tuning.
#[derive(Debug, Clone, Copy)]
pub struct MiniBatchParams {
    pub k: usize,
    pub batch_size: usize,
    pub max_iterations: usize,
    /// Stop once no centroid moves farther than this in one iteration.
    pub tolerance: f32,
    pub seed: u64,
}

/// Mini-batch k-means (Sculley 2010).
///
/// Each iteration draws `batch_size` pixels uniformly with replacement,
/// assigns the whole batch against the current centroids, then nudges each
/// centroid toward its batch members with a per-centroid learning rate of
/// 1 / (members seen so far).
pub fn minibatch_kmeans(
    pixels: &[RGB8],
    histogram: &[HistEntry],
    params: MiniBatchParams,
) -> KMeansOutcome {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = plus_plus_init(histogram, params.k, &mut rng);
    if centroids.len() <= 1 || pixels.is_empty() {
        // One centroid: the optimum is the global mean.
        if centroids.len() == 1 {
            let mut sum = ColorSum::default();
            for e in histogram {
                sum.add(e.color, e.count);
            }
            centroids[0] = sum.mean().unwrap_or(centroids[0]);
        }
        return KMeansOutcome {
            centroids,
            iterations: 0,
            converged: true,
        };
    }

    let mut seen = vec![0u64; centroids.len()];
    let mut batch: Vec<Rgbf> = Vec::with_capacity(params.batch_size);
    let tolerance_sq = params.tolerance * params.tolerance;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;

        batch.clear();
        for _ in 0..params.batch_size {
            let idx = rng.gen_range(0..pixels.len());
            batch.push(Rgbf::from_rgb8(pixels[idx]));
        }

        let labels = nearest_each(&batch, &centroids, |p| *p);

        let before = centroids.clone();
        for (x, &c) in batch.iter().zip(&labels) {
            seen[c] += 1;
            let eta = 1.0 / seen[c] as f32;
            let centroid = &mut centroids[c];
            centroid.r += eta * (x.r - centroid.r);
            centroid.g += eta * (x.g - centroid.g);
            centroid.b += eta * (x.b - centroid.b);
        }

        let shift = before
            .iter()
            .zip(&centroids)
            .map(|(a, b)| a.distance_sq(*b))
            .fold(0.0f32, f32::max);
        if shift <= tolerance_sq {
            converged = true;
            break;
        }
    }

    // Keep only centroids that some pixel color actually lands on.
    let mut used = vec![false; centroids.len()];
    for e in histogram {
        used[nearest_index(&centroids, Rgbf::from_rgb8(e.color))] = true;
    }
    let centroids = centroids
        .into_iter()
        .zip(used)
        .filter_map(|(c, u)| u.then_some(c))
        .collect();

    KMeansOutcome {
        centroids,
        iterations,
        converged,
    }
}
