//! Color quantization for RGB pixel buffers.
//!
//! Fixed-size palettes come from [`quantize`] with one of the
//! [`QuantizeMethod`] strategies; [`quantize_density`] discovers the palette
//! size from color density instead. Both return a new [`PixelBuffer`] in
//! which every pixel is one of the palette colors.
//!
//! ```
//! use clusterquant::{PixelBuffer, QuantizeConfig, QuantizeMethod};
//! use rgb::RGB8;
//!
//! let pixels = vec![
//!     RGB8::new(0, 0, 0),
//!     RGB8::new(0, 0, 0),
//!     RGB8::new(255, 255, 255),
//!     RGB8::new(255, 255, 255),
//! ];
//! let input = PixelBuffer::new(2, 2, pixels).unwrap();
//! let config = QuantizeConfig::new().method(QuantizeMethod::MedianCut).colors(2);
//! let output = clusterquant::quantize(&input, &config).unwrap();
//! assert_eq!(output, input);
//! ```

#![forbid(unsafe_code)]

extern crate alloc;

pub mod buffer;
pub mod color;
mod dbscan;
pub mod error;
pub mod histogram;
#[cfg(feature = "kmeans")]
pub mod kmeans;
pub mod median_cut;
pub mod octree;
pub mod palette;
pub mod remap;

pub use buffer::{ColorSum, PixelBuffer};
pub use color::Rgbf;
pub use error::QuantizeError;
pub use palette::Palette;
pub use rgb::RGB8;

use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use tracing::debug;

use crate::histogram::HistEntry;

/// Fixed-palette-size strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantizeMethod {
    /// Recursive median split of the widest channel. Deterministic.
    MedianCut,
    /// Uniform octree with bottom-up leaf merging. Deterministic.
    Octree,
    /// Lloyd's k-means with k-means++ seeding. Reproducible for a fixed seed.
    KMeans,
    /// Mini-batch k-means. Reproducible for a fixed seed.
    MiniBatchKMeans,
}

impl QuantizeMethod {
    /// Whether this build can run the method.
    pub fn is_available(self) -> bool {
        match self {
            Self::MedianCut | Self::Octree => true,
            Self::KMeans | Self::MiniBatchKMeans => cfg!(feature = "kmeans"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MedianCut => "median",
            Self::Octree => "octree",
            Self::KMeans => "kmeans",
            Self::MiniBatchKMeans => "minibatch",
        }
    }
}

impl Default for QuantizeMethod {
    fn default() -> Self {
        Self::MedianCut
    }
}

impl fmt::Display for QuantizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuantizeMethod {
    type Err = QuantizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "median" | "median-cut" | "mediancut" => Ok(Self::MedianCut),
            "octree" | "uniform" | "fastoctree" => Ok(Self::Octree),
            "kmeans" | "k-means" => Ok(Self::KMeans),
            "minibatch" | "mini-batch" | "minibatch-kmeans" => Ok(Self::MiniBatchKMeans),
            other => Err(QuantizeError::invalid(
                "method",
                alloc::format!("unknown quantization method {other:?}"),
            )),
        }
    }
}

/// Configuration for fixed-size palette quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeConfig {
    pub method: QuantizeMethod,
    /// Target palette size k (>= 1).
    pub colors: usize,
    /// Seed for k-means++ seeding and mini-batch sampling.
    pub seed: u64,
    /// Iteration cap for both k-means variants.
    pub max_iterations: usize,
    /// Pixels sampled per mini-batch iteration.
    pub batch_size: usize,
    /// Mini-batch stops once no centroid moves more than this per iteration.
    pub tolerance: f32,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            method: QuantizeMethod::MedianCut,
            colors: 16,
            seed: 0,
            max_iterations: 300,
            batch_size: 4096,
            tolerance: 0.01,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: QuantizeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn colors(mut self, k: usize) -> Self {
        self.colors = k;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<(), QuantizeError> {
        if self.colors < 1 {
            return Err(QuantizeError::invalid("colors", "must be at least 1, got 0"));
        }
        if self.max_iterations < 1 {
            return Err(QuantizeError::invalid("max_iterations", "must be at least 1, got 0"));
        }
        if self.batch_size < 1 {
            return Err(QuantizeError::invalid("batch_size", "must be at least 1, got 0"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(QuantizeError::invalid(
                "tolerance",
                alloc::format!("must be finite and non-negative, got {}", self.tolerance),
            ));
        }
        if !self.method.is_available() {
            return Err(QuantizeError::UnavailableBackend(self.method));
        }
        Ok(())
    }
}

/// Configuration for density-based quantization.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityConfig {
    /// Neighborhood radius in RGB units (> 0).
    pub eps: f32,
    /// Other pixels required within `eps` for a core point (>= 1).
    pub min_samples: usize,
    /// Optional palette cap (>= 1).
    pub max_colors: Option<usize>,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            eps: 8.0,
            min_samples: 100,
            max_colors: None,
        }
    }
}

impl DensityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn min_samples(mut self, n: usize) -> Self {
        self.min_samples = n;
        self
    }

    pub fn max_colors(mut self, n: usize) -> Self {
        self.max_colors = Some(n);
        self
    }

    fn validate(&self) -> Result<(), QuantizeError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(QuantizeError::invalid(
                "eps",
                alloc::format!("must be finite and greater than 0, got {}", self.eps),
            ));
        }
        if self.min_samples < 1 {
            return Err(QuantizeError::invalid("min_samples", "must be at least 1, got 0"));
        }
        if self.max_colors == Some(0) {
            return Err(QuantizeError::invalid("max_colors", "must be at least 1, got 0"));
        }
        Ok(())
    }
}

/// Quantization result: palette, per-pixel labels and the repainted buffer.
#[derive(Debug, Clone)]
pub struct QuantizeResult {
    palette: Palette,
    labels: Vec<usize>,
    buffer: PixelBuffer,
}

impl QuantizeResult {
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Number of colors in the palette.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Palette index for each pixel, row-major.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }
}

/// Reduce `buffer` to at most `config.colors` colors.
pub fn quantize(buffer: &PixelBuffer, config: &QuantizeConfig) -> Result<PixelBuffer, QuantizeError> {
    quantize_indexed(buffer, config).map(QuantizeResult::into_buffer)
}

/// Like [`quantize`], also returning the palette and labels.
pub fn quantize_indexed(
    buffer: &PixelBuffer,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    config.validate()?;

    let pixels = buffer.pixels();
    let hist = histogram::build_histogram(pixels);
    let distinct = hist.len();

    let centroids = match config.method {
        QuantizeMethod::MedianCut => median_cut::median_cut(hist, config.colors),
        QuantizeMethod::Octree => octree::octree(&hist, config.colors),
        QuantizeMethod::KMeans | QuantizeMethod::MiniBatchKMeans => {
            kmeans_centroids(pixels, &hist, config)?
        }
    };

    let palette = Palette::from_centroids(centroids);
    let mut labels = remap::assign_nearest(pixels, &palette);
    let palette = remap::compact(&palette, &mut labels);
    let output = remap::remap(&palette, &labels, buffer.width(), buffer.height())?;

    debug!(
        method = %config.method,
        width = buffer.width(),
        height = buffer.height(),
        requested = config.colors,
        distinct,
        palette = palette.len(),
        "quantized"
    );

    Ok(QuantizeResult {
        palette,
        labels,
        buffer: output,
    })
}

#[cfg(feature = "kmeans")]
fn kmeans_centroids(
    pixels: &[RGB8],
    hist: &[HistEntry],
    config: &QuantizeConfig,
) -> Result<Vec<Rgbf>, QuantizeError> {
    let outcome = match config.method {
        QuantizeMethod::MiniBatchKMeans => kmeans::minibatch_kmeans(
            pixels,
            hist,
            kmeans::MiniBatchParams {
                k: config.colors,
                batch_size: config.batch_size,
                max_iterations: config.max_iterations,
                tolerance: config.tolerance,
                seed: config.seed,
            },
        ),
        _ => kmeans::kmeans(hist, config.colors, config.max_iterations, config.seed),
    };

    debug!(
        method = %config.method,
        iterations = outcome.iterations,
        converged = outcome.converged,
        centroids = outcome.centroids.len(),
        "k-means finished"
    );

    Ok(outcome.centroids)
}

#[cfg(not(feature = "kmeans"))]
fn kmeans_centroids(
    _pixels: &[RGB8],
    _hist: &[HistEntry],
    config: &QuantizeConfig,
) -> Result<Vec<Rgbf>, QuantizeError> {
    Err(QuantizeError::UnavailableBackend(config.method))
}

/// Reduce `buffer` to the colors of its density clusters.
///
/// Fails with [`QuantizeError::NoClusterFound`] when every pixel is noise.
pub fn quantize_density(
    buffer: &PixelBuffer,
    config: &DensityConfig,
) -> Result<PixelBuffer, QuantizeError> {
    quantize_density_indexed(buffer, config).map(QuantizeResult::into_buffer)
}

/// Like [`quantize_density`], also returning the palette and labels.
pub fn quantize_density_indexed(
    buffer: &PixelBuffer,
    config: &DensityConfig,
) -> Result<QuantizeResult, QuantizeError> {
    config.validate()?;

    let pixels = buffer.pixels();
    let hist = histogram::build_histogram(pixels);
    let clusters = dbscan::dbscan(&hist, config.eps, config.min_samples);

    debug!(
        eps = config.eps,
        min_samples = config.min_samples,
        distinct = hist.len(),
        core = clusters.core_count,
        clusters = clusters.cluster_count,
        "density clustering finished"
    );

    let density = dbscan::finalize(&hist, &clusters, config.max_colors)?;
    let labels = dbscan::pixel_labels(pixels, &hist, &density.color_labels)?;
    let output = remap::remap(&density.palette, &labels, buffer.width(), buffer.height())?;

    debug!(
        retained = density.retained,
        palette = density.palette.len(),
        reassigned = density.reassigned_pixels,
        "density palette built"
    );

    Ok(QuantizeResult {
        palette: density.palette,
        labels,
        buffer: output,
    })
}
