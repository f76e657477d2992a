#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

// Links the OpenBLAS/LAPACK backend used by `ndarray-linalg`
extern crate blas_src;

pub mod axis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod input;
pub mod math;
pub mod offset;
pub mod output;
pub mod polyfit;
pub mod report;
pub mod simulate;

pub use calibration::{CalibrationEngine, CalibrationResult, EngineConfig, RecordOutcome};
pub use error::Error;
pub use input::CalibrationInput;

pub type Result<T> = ::std::result::Result<T, Error>;
