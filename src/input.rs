use std::borrow::Cow;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// The calibration record for a single instrument
///
/// Field names on disk follow the numbered keys of the calibration input file, so the file
/// lists its keys in a stable order when sorted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationInput {
    #[serde(rename = "01_instName", alias = "instName")]
    pub instrument_name: String,
    /// Free-form date, conventionally `MM/DD/YYYY HH:mm`
    #[serde(rename = "02_calDate", alias = "calDate")]
    pub cal_date: String,
    #[serde(rename = "03_EuUnits", alias = "euUnits")]
    pub eu_units: String,
    /// Configured controller counts at the low and high end of the range
    #[serde(rename = "04_minMaxCounts", alias = "minMaxCounts")]
    pub min_max_counts: (f64, f64),
    /// Engineering units the configured counts correspond to
    #[serde(rename = "05_minMaxEu", alias = "minMaxEu")]
    pub min_max_eu: (f64, f64),
    /// Counts read from the controller during calibration
    #[serde(rename = "06_actCounts", alias = "actCounts")]
    pub act_counts: Vec<f64>,
    /// Reference values applied during calibration, one per entry of `act_counts`
    #[serde(rename = "07_actEus", alias = "actEus")]
    pub act_eus: Vec<f64>,
    #[serde(
        rename = "08_notes",
        alias = "notes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(
        rename = "09_equipment",
        alias = "equipment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub equipment: Option<String>,
    #[serde(
        rename = "10_docTitle",
        alias = "docTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub doc_title: Option<String>,
    #[serde(rename = "11_degree", alias = "degree", default = "default_degree")]
    pub degree: usize,
}

const fn default_degree() -> usize {
    1
}

impl CalibrationInput {
    pub fn doc_title(&self) -> Cow<'_, str> {
        self.doc_title.as_deref().map_or_else(
            || Cow::Owned(format!("{} Calibration", self.instrument_name)),
            Cow::Borrowed,
        )
    }

    pub fn notes(&self) -> &str {
        self.notes.as_deref().unwrap_or_default()
    }

    pub fn equipment(&self) -> &str {
        self.equipment.as_deref().unwrap_or_default()
    }

    /// Check the record can be fitted with a polynomial of `degree`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first field found to break an invariant.
    pub fn validate(&self, degree: usize) -> Result<()> {
        if self.instrument_name.trim().is_empty() {
            return Err(Error::invalid("01_instName", "instrument name is empty"));
        }
        check_range("04_minMaxCounts", self.min_max_counts)?;
        check_range("05_minMaxEu", self.min_max_eu)?;
        check_finite("06_actCounts", &self.act_counts)?;
        check_finite("07_actEus", &self.act_eus)?;

        if self.act_counts.len() != self.act_eus.len() {
            return Err(Error::invalid(
                "07_actEus",
                format!(
                    "{} values for {} entries in 06_actCounts",
                    self.act_eus.len(),
                    self.act_counts.len()
                ),
            ));
        }
        if degree < 1 {
            return Err(Error::invalid("11_degree", "degree must be at least 1"));
        }
        if self.act_counts.len() < degree + 1 {
            return Err(Error::invalid(
                "06_actCounts",
                format!(
                    "a degree {degree} fit needs at least {} points, got {}",
                    degree + 1,
                    self.act_counts.len()
                ),
            ));
        }
        Ok(())
    }
}

fn check_range(field: &'static str, (low, high): (f64, f64)) -> Result<()> {
    if !(low.is_finite() && high.is_finite()) {
        return Err(Error::invalid(field, "limits must be finite"));
    }
    if low >= high {
        return Err(Error::invalid(
            field,
            format!("low limit {low} is not below high limit {high}"),
        ));
    }
    Ok(())
}

fn check_finite(field: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(Error::invalid(
            field,
            format!("entry {index} is {}", values[index]),
        )),
        None => Ok(()),
    }
}

/// Read calibration records from a JSON file
///
/// # Errors
///
/// Returns an error if the file cannot be read or [`parse_inputs`] rejects its contents.
pub fn load_inputs(path: &Path) -> Result<Vec<CalibrationInput>> {
    log::info!("reading calibration records from {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_inputs(&text)
}

/// Parse calibration records from JSON text
///
/// The document is either a single record object or an array of record objects. A single
/// record is returned as a one element `Vec`.
///
/// # Errors
///
/// Returns an error if the text is not JSON, a record is malformed, or the document is neither
/// an object nor an array.
pub fn parse_inputs(text: &str) -> Result<Vec<CalibrationInput>> {
    let root: Value = serde_json::from_str(text)?;
    let records = match root {
        Value::Array(records) => records
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<CalibrationInput>, _>>()?,
        record @ Value::Object(_) => vec![serde_json::from_value(record)?],
        _ => {
            return Err(Error::invalid(
                "<document>",
                "expected a calibration record or a list of records",
            ))
        }
    };
    log::debug!("parsed {} calibration records", records.len());
    Ok(records)
}

/// Example records to start a calibration input file from
pub fn template() -> Vec<CalibrationInput> {
    vec![
        CalibrationInput {
            instrument_name: "Instrument A".to_owned(),
            cal_date: "10/5/2017 12:10".to_owned(),
            eu_units: "units".to_owned(),
            min_max_counts: (0., 32767.),
            min_max_eu: (0., 100.),
            act_counts: vec![1265., 12093., 26989.],
            act_eus: vec![0., 50., 90.],
            notes: Some("calibration notes".to_owned()),
            equipment: Some("equipment notes".to_owned()),
            doc_title: Some("Document Title".to_owned()),
            degree: 1,
        },
        CalibrationInput {
            instrument_name: "Instrument B".to_owned(),
            cal_date: "10/5/2017 12:10".to_owned(),
            eu_units: "units".to_owned(),
            min_max_counts: (-27648., 27648.),
            min_max_eu: (-100., 100.),
            act_counts: vec![1265., 5209., 10093., 22345., 26989.],
            act_eus: vec![-90., -50., 0., 50., 90.],
            notes: Some("calibration notes".to_owned()),
            equipment: Some("equipment notes".to_owned()),
            doc_title: Some("Document Title".to_owned()),
            degree: 1,
        },
    ]
}

/// Write [`template`] to `path` as pretty-printed JSON
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_template(path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&template())?;
    fs::write(path, text)?;
    log::info!("wrote input template to {}", path.display());
    Ok(())
}
