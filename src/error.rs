use thiserror::Error;

use crate::QuantizeMethod;

#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("label {label} at pixel {index} is outside a palette of {palette_len} colors")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        palette_len: usize,
    },

    #[error("pixel {index} has no entry in the color histogram")]
    ColorNotInHistogram { index: usize },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("density clustering found no clusters; every pixel is noise")]
    NoClusterFound,

    #[error("{0} quantization is not available in this build")]
    UnavailableBackend(QuantizeMethod),
}

impl QuantizeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
