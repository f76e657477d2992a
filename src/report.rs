use std::fmt;

use crate::calibration::{CalibrationResult, OffsetSource};

const RULE: usize = 72;

/// Render the traveler calibration sheet for one instrument
pub fn format(result: &CalibrationResult) -> String {
    Report(result).to_string()
}

struct Report<'a>(&'a CalibrationResult);

/// Counts are whole numbers on the sheet
fn whole(count: f64) -> f64 {
    let rounded = count.round();
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}

fn polynomial_heading(degree: usize) -> String {
    if degree == 1 {
        "The least squares fit 1 degree polynomial (line)".to_owned()
    } else {
        format!("The least squares fit {degree} degree polynomial")
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let input = result.input();
        let units = &input.eu_units;
        let underline = ("_".repeat(15), "_".repeat(15));

        writeln!(f, "{}", "*".repeat(RULE))?;
        writeln!(
            f,
            "Traveler Number _____________________________________________________\n"
        )?;
        writeln!(
            f,
            "Traveler Operation(s) _______________  Traveler Page(s) _____________\n"
        )?;
        writeln!(f, "{}\n", input.doc_title())?;
        writeln!(f, "Nominal and Actual Calibration Data")?;
        writeln!(f, "{}", input.instrument_name)?;
        writeln!(f, "{}\n", input.cal_date)?;
        writeln!(f, "Equipment Used: {}\n", input.equipment())?;
        writeln!(f, "NOTE: {}\n", input.notes())?;

        let (count_low, count_high) = input.min_max_counts;
        let (eu_low, eu_high) = input.min_max_eu;
        writeln!(
            f,
            "{:<37} {:>9} {:>9}",
            "Min and Max PLC Nominal Counts: ",
            whole(count_low),
            whole(count_high)
        )?;
        writeln!(
            f,
            "{:<37} {:>9.2} {:>9.2}\n",
            format!("Min and Max Nominal EU ({units}): "),
            eu_low,
            eu_high
        )?;

        writeln!(
            f,
            "{:<16}  {:<16}  {:<16}  {:<12}  {:<10}",
            "Measured Counts",
            format!("Measured EU ({units})"),
            "Calculated EU",
            "Error",
            "% of Range"
        )?;
        writeln!(
            f,
            "{:<16}  {:<16}  {:<16}  {:<12}  {:<10}",
            underline.0, underline.1, underline.1, "_".repeat(12), "_".repeat(10)
        )?;
        for (((count, eu), calculated), (error, pct)) in input
            .act_counts
            .iter()
            .zip(&input.act_eus)
            .zip(result.calculated_eus())
            .zip(result.per_point_error().iter().zip(result.error_pct_of_range()))
        {
            writeln!(
                f,
                "{:<16}  {:<16.2}  {:<16.4}  {:<12.4}  {:<10.3}",
                whole(*count),
                eu,
                calculated,
                error,
                pct
            )?;
        }

        let primary = result.primary_fit();
        writeln!(f, "\n{} is:", polynomial_heading(primary.degree()))?;
        writeln!(f, "y = {}\n", primary.polynomial())?;
        writeln!(f, "Calibrated engineering units for the min and max")?;
        writeln!(f, "PLC counts are as follows:")?;
        let (low, high) = result.min_max_transfer();
        writeln!(f, "EU at min and max PLC Counts:  {low:11.4}   {high:11.4}\n")?;

        writeln!(f, "Compensate for a non-zero count value at zero EU.")?;
        writeln!(f, "Shift the curve fit up or down by the count value of")?;
        writeln!(f, "the zero EU value (the x-intercept of EU axis).")?;
        match result.offset_source() {
            OffsetSource::Root => {
                writeln!(f, "Count at zero EU: {:.4}", result.count_offset())?;
            }
            OffsetSource::Fallback => {
                writeln!(
                    f,
                    "The fit does not cross zero EU, the configured count offset {:.4} is used.",
                    result.count_offset()
                )?;
            }
        }
        writeln!(f, "The adjusted count values vs EU values are:\n")?;
        writeln!(
            f,
            "{:<16}  {:<30}",
            "Adjusted Counts",
            format!("Measured EU ({units})")
        )?;
        writeln!(f, "{:<16}  {:<30}", underline.0, "_".repeat(30))?;
        for (count, eu) in result.offset_counts().iter().zip(&input.act_eus) {
            writeln!(f, "{:<16}  {:<30.2}", whole(*count), eu)?;
        }

        let offset = result.offset_fit();
        writeln!(
            f,
            "\n{} for the adjusted counts is:",
            polynomial_heading(offset.degree())
        )?;
        writeln!(f, "y = {}\n", offset.polynomial())?;
        writeln!(f, "Calibrated engineering units for the adjusted")?;
        writeln!(f, "min and max PLC counts are as follows:")?;
        let (low, high) = result.min_max_offset_transfer();
        writeln!(f, "EU at min and max PLC Counts:  {low:11.4}   {high:11.4}")?;

        writeln!(f, "\n\n\nMfg Sign/Date  {}\n\n", "_".repeat(50))?;
        writeln!(f, "QA Sign/Date   {}\n\n", "_".repeat(50))?;
        writeln!(f, "{}", "*".repeat(RULE))
    }
}

#[cfg(test)]
mod tests {
    use super::format;
    use crate::calibration::{CalibrationEngine, EngineConfig};
    use crate::input::template;
    use crate::Result;

    #[test]
    fn report_lists_instrument_and_both_fits() -> Result<()> {
        let result = CalibrationEngine::default().process(&template().remove(0))?;

        let report = format(&result);

        assert!(report.starts_with(&"*".repeat(72)));
        assert!(report.contains("Document Title"));
        assert!(report.contains("Instrument A\n10/5/2017 12:10"));
        assert!(report.contains("Equipment Used: equipment notes"));
        assert!(report.contains("NOTE: calibration notes"));
        assert!(report.contains("Measured EU (units)"));
        assert!(report.contains("The least squares fit 1 degree polynomial (line) is:"));
        assert!(
            report.contains("The least squares fit 1 degree polynomial (line) for the adjusted")
        );
        assert_eq!(report.matches("EU at min and max PLC Counts:").count(), 2);
        assert!(report.contains("QA Sign/Date"));
        Ok(())
    }

    #[test]
    fn counts_are_shown_as_whole_numbers() -> Result<()> {
        let result = CalibrationEngine::default().process(&template().remove(0))?;

        let report = format(&result);

        let first_row = report
            .lines()
            .find(|line| line.starts_with("1265 "))
            .expect("measured row present");
        assert!(first_row.contains("0.00"));
        let nominal = report
            .lines()
            .find(|line| line.starts_with("Min and Max PLC Nominal Counts:"))
            .expect("nominal counts present");
        assert!(nominal.trim_end().ends_with("0     32767"));
        Ok(())
    }

    #[test]
    fn higher_degree_heading_names_the_degree() -> Result<()> {
        let engine = CalibrationEngine::new(EngineConfig {
            degree_override: Some(2),
            ..EngineConfig::default()
        });
        let result = engine.process(&template().remove(1))?;

        let report = format(&result);

        assert!(report.contains("The least squares fit 2 degree polynomial is:"));
        assert!(report.contains(" x^2 "));
        Ok(())
    }
}
