use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::input::CalibrationInput;
use crate::math::{interp, linspace};
use crate::offset::OffsetCompensator;
use crate::polyfit::{polyfit, FitResult};
use crate::{Error, Result};

/// Settings shared by every record the engine processes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of samples on the nominal line, endpoints included
    #[serde(default = "default_nominal_points")]
    pub nominal_points: usize,
    /// Fit every record at this degree instead of the degree it declares
    #[serde(default)]
    pub degree_override: Option<usize>,
    #[serde(default = "default_real_root_tolerance")]
    pub real_root_tolerance: f64,
    /// Count offset to use when a fitted curve has no real zero crossing. When unset such
    /// records fail with [`Error::NoRealRoot`].
    #[serde(default)]
    pub fallback_count_offset: Option<f64>,
}

const fn default_nominal_points() -> usize {
    5
}

const fn default_real_root_tolerance() -> f64 {
    1e-7
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nominal_points: default_nominal_points(),
            degree_override: None,
            real_root_tolerance: default_real_root_tolerance(),
            fallback_count_offset: None,
        }
    }
}

/// Where the count offset of a result came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetSource {
    /// The real root of the primary fit closest to zero counts
    Root,
    /// [`EngineConfig::fallback_count_offset`], as the primary fit has no real root
    Fallback,
}

/// The calibration of one instrument
///
/// Built once by [`CalibrationEngine::process`] and read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationResult {
    input: CalibrationInput,
    /// Fit of measured EU against raw counts
    primary_fit: FitResult,
    /// `primary_fit(count) - eu` at each measured point
    per_point_error: Vec<f64>,
    /// `per_point_error` as a percentage of the nominal EU span
    error_pct_of_range: Vec<f64>,
    count_offset: f64,
    offset_source: OffsetSource,
    /// Measured counts shifted down by `count_offset`
    offset_counts: Vec<f64>,
    /// Fit of measured EU against `offset_counts`
    offset_fit: FitResult,
    nominal_counts: Array1<f64>,
    nominal_eus: Array1<f64>,
    fitted_line: Array1<f64>,
    offset_line: Array1<f64>,
    min_max_transfer: (f64, f64),
    min_max_offset_transfer: (f64, f64),
}

impl CalibrationResult {
    pub const fn input(&self) -> &CalibrationInput {
        &self.input
    }

    pub fn instrument_name(&self) -> &str {
        &self.input.instrument_name
    }

    pub const fn primary_fit(&self) -> &FitResult {
        &self.primary_fit
    }

    pub fn per_point_error(&self) -> &[f64] {
        &self.per_point_error
    }

    pub fn error_pct_of_range(&self) -> &[f64] {
        &self.error_pct_of_range
    }

    pub const fn count_offset(&self) -> f64 {
        self.count_offset
    }

    pub const fn offset_source(&self) -> OffsetSource {
        self.offset_source
    }

    pub fn offset_counts(&self) -> &[f64] {
        &self.offset_counts
    }

    pub const fn offset_fit(&self) -> &FitResult {
        &self.offset_fit
    }

    pub const fn nominal_counts(&self) -> &Array1<f64> {
        &self.nominal_counts
    }

    pub const fn nominal_eus(&self) -> &Array1<f64> {
        &self.nominal_eus
    }

    /// The primary fit sampled at the nominal counts
    pub const fn fitted_line(&self) -> &Array1<f64> {
        &self.fitted_line
    }

    /// The offset fit sampled at the nominal counts
    pub const fn offset_line(&self) -> &Array1<f64> {
        &self.offset_line
    }

    /// EU of the primary fit at the configured min and max counts
    pub const fn min_max_transfer(&self) -> (f64, f64) {
        self.min_max_transfer
    }

    /// EU of the offset fit at the configured min and max counts
    pub const fn min_max_offset_transfer(&self) -> (f64, f64) {
        self.min_max_offset_transfer
    }

    /// The primary fit evaluated at each measured count
    pub fn calculated_eus(&self) -> Vec<f64> {
        self.primary_fit.evaluate(self.input.act_counts.as_slice())
    }
}

/// The outcome of one record of a batch
#[derive(Debug)]
pub struct RecordOutcome {
    pub instrument: String,
    pub result: Result<CalibrationResult>,
}

/// Fits calibration records and compensates them for count offset
pub struct CalibrationEngine {
    config: EngineConfig,
    compensator: OffsetCompensator,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CalibrationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let compensator = OffsetCompensator::new(config.real_root_tolerance);
        Self {
            config,
            compensator,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Calibrate a single instrument
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the record breaks one of its invariants
    /// - [`Error::DegenerateFit`] if the measurements cannot determine the polynomial
    /// - [`Error::NoRealRoot`] if the fit never crosses zero EU and no fallback offset is
    ///   configured
    pub fn process(&self, input: &CalibrationInput) -> Result<CalibrationResult> {
        let degree = self.config.degree_override.unwrap_or(input.degree);
        input.validate(degree)?;
        if self.config.nominal_points < 2 {
            return Err(Error::invalid(
                "nominal_points",
                format!("need at least 2, got {}", self.config.nominal_points),
            ));
        }
        let tolerance = self.config.real_root_tolerance;
        if !(tolerance.is_finite() && tolerance >= 0.) {
            return Err(Error::invalid(
                "real_root_tolerance",
                format!("must be finite and non-negative, got {tolerance}"),
            ));
        }

        let counts = input.act_counts.as_slice();
        let eus = input.act_eus.as_slice();

        let primary_fit = polyfit(counts, eus, degree)?;

        let eu_span = input.min_max_eu.1 - input.min_max_eu.0;
        let per_point_error = primary_fit
            .evaluate(counts)
            .into_iter()
            .zip(eus)
            .map(|(calculated, measured)| calculated - measured)
            .collect::<Vec<_>>();
        let error_pct_of_range = per_point_error
            .iter()
            .map(|error| error / eu_span * 100.)
            .collect();

        let (count_offset, offset_source) = match self.compensator.compute_offset(&primary_fit) {
            Ok(offset) => (offset, OffsetSource::Root),
            Err(Error::NoRealRoot { roots }) => match self.config.fallback_count_offset {
                Some(fallback) => {
                    log::warn!(
                        "{}: fit has no real root {roots:?}, using configured offset {fallback}",
                        input.instrument_name
                    );
                    (fallback, OffsetSource::Fallback)
                }
                None => return Err(Error::NoRealRoot { roots }),
            },
            Err(e) => return Err(e),
        };

        let offset_counts = OffsetCompensator::apply_offset(counts, count_offset);
        let offset_fit = OffsetCompensator::refit(&offset_counts, eus, degree)?;

        let (count_low, count_high) = input.min_max_counts;
        let (eu_low, eu_high) = input.min_max_eu;
        let nominal_counts = linspace(count_low, count_high, self.config.nominal_points);
        let nominal_eus =
            nominal_counts.mapv(|count| interp(count, &[count_low, count_high], &[eu_low, eu_high]));

        let fitted_line = primary_fit.evaluate(&nominal_counts);
        let offset_line = offset_fit.evaluate(&nominal_counts);
        let min_max_transfer = primary_fit.evaluate(input.min_max_counts);
        let min_max_offset_transfer = offset_fit.evaluate(input.min_max_counts);

        log::info!(
            "{}: degree {degree} fit {}, count offset {count_offset}",
            input.instrument_name,
            primary_fit.polynomial()
        );

        Ok(CalibrationResult {
            input: input.clone(),
            primary_fit,
            per_point_error,
            error_pct_of_range,
            count_offset,
            offset_source,
            offset_counts,
            offset_fit,
            nominal_counts,
            nominal_eus,
            fitted_line,
            offset_line,
            min_max_transfer,
            min_max_offset_transfer,
        })
    }

    /// Calibrate each record independently, in input order
    ///
    /// A failing record is logged and reported in its outcome; it never stops the batch.
    pub fn process_batch(&self, inputs: &[CalibrationInput]) -> Vec<RecordOutcome> {
        inputs
            .iter()
            .map(|input| {
                let result = self.process(input);
                if let Err(e) = &result {
                    log::warn!("{}: calibration failed: {e}", input.instrument_name);
                }
                RecordOutcome {
                    instrument: input.instrument_name.clone(),
                    result,
                }
            })
            .collect()
    }
}
