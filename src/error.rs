use ndarray_linalg::c64;
use thiserror::Error;

/// Failures raised while loading, fitting or compensating a calibration record.
///
/// Every variant is local to one instrument record: a batch keeps going when one record fails.
#[derive(Debug, Error)]
pub enum Error {
    /// A calibration record violates one of its invariants
    #[error("invalid calibration input, field `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The data cannot determine a polynomial of the requested degree
    #[error(
        "degenerate fit: {points} points ({distinct} distinct) cannot determine a degree \
         {degree} polynomial, design matrix rank is {rank}"
    )]
    DegenerateFit {
        points: usize,
        distinct: usize,
        degree: usize,
        rank: usize,
    },

    /// The fitted polynomial never crosses zero
    #[error("fitted polynomial has no real root, roots are {roots:?}")]
    NoRealRoot { roots: Vec<c64> },

    #[error(transparent)]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
