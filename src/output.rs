use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::calibration::CalibrationResult;
use crate::report;
use crate::Result;

/// `<prefix>_<instrument>.<extension>`
pub fn output_path(prefix: &str, instrument: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}_{instrument}.{extension}"))
}

/// Append the text report for `result` to `<prefix>_<instrument>.txt`
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn write_report(prefix: &str, result: &CalibrationResult) -> Result<PathBuf> {
    let path = output_path(prefix, result.instrument_name(), "txt");
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(report::format(result).as_bytes())?;
    log::info!("appended report to {}", path.display());
    Ok(path)
}

#[derive(Serialize)]
struct PointRow {
    measured_counts: f64,
    measured_eu: f64,
    calculated_eu: f64,
    error: f64,
    error_pct_of_range: f64,
    adjusted_counts: f64,
}

/// Write one row per measured point to `<prefix>_<instrument>.csv`
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_points_csv(prefix: &str, result: &CalibrationResult) -> Result<PathBuf> {
    let path = output_path(prefix, result.instrument_name(), "csv");
    let input = result.input();
    let mut wtr = csv::Writer::from_path(&path)?;
    for (ii, calculated_eu) in result.calculated_eus().into_iter().enumerate() {
        wtr.serialize(PointRow {
            measured_counts: input.act_counts[ii],
            measured_eu: input.act_eus[ii],
            calculated_eu,
            error: result.per_point_error()[ii],
            error_pct_of_range: result.error_pct_of_range()[ii],
            adjusted_counts: result.offset_counts()[ii],
        })?;
    }
    wtr.flush()?;
    log::info!("wrote point table to {}", path.display());
    Ok(path)
}
