use ndarray_rand::rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
use tempdir::TempDir;

use plc_calibration::calibration::OffsetSource;
use plc_calibration::input::{load_inputs, template, write_template};
use plc_calibration::output::{output_path, write_points_csv, write_report};
use plc_calibration::{CalibrationEngine, CalibrationInput, Error, Result};

fn create_working_dir(test_name: &str) -> TempDir {
    TempDir::new(test_name).unwrap()
}

/// A linear instrument with a count bias, measured with a little noise
fn generate_instrument<R: Rng>(name: &str, rng: &mut R, num_samples: usize) -> CalibrationInput {
    let slope = rng.gen_range(0.002..0.004);
    let bias = rng.gen_range(-1500.0..1500.0);
    let act_counts = (0..num_samples)
        .map(|n| 1000. + 30000. * n as f64 / num_samples as f64)
        .collect::<Vec<_>>();
    let act_eus = act_counts
        .iter()
        .map(|count| slope * (count - bias) + rng.gen_range(-0.05..0.05))
        .collect();

    CalibrationInput {
        instrument_name: name.to_owned(),
        cal_date: "6/1/2023 14:00".to_owned(),
        eu_units: "inH2O".to_owned(),
        min_max_counts: (0., 32767.),
        min_max_eu: (0., 100.),
        act_counts,
        act_eus,
        notes: None,
        equipment: Some("Fluke 754".to_owned()),
        doc_title: None,
        degree: 1,
    }
}

#[test]
fn template_file_round_trips_through_the_engine() -> Result<()> {
    let tmp_dir = create_working_dir("template_file_round_trips_through_the_engine");
    let template_path = tmp_dir.path().join("template.json");

    write_template(&template_path)?;
    let inputs = load_inputs(&template_path)?;
    assert_eq!(inputs, template());

    let outcomes = CalibrationEngine::default().process_batch(&inputs);

    assert_eq!(outcomes.len(), 2);
    for (outcome, input) in outcomes.iter().zip(&inputs) {
        assert_eq!(outcome.instrument, input.instrument_name);
        let result = outcome.result.as_ref().unwrap();
        assert_eq!(result.offset_source(), OffsetSource::Root);
        assert_eq!(result.offset_counts().len(), input.act_counts.len());
    }
    Ok(())
}

#[test]
fn single_record_file_is_loaded() -> Result<()> {
    let tmp_dir = create_working_dir("single_record_file_is_loaded");
    let path = tmp_dir.path().join("single.json");
    std::fs::write(&path, serde_json::to_string(&template()[0]).unwrap()).unwrap();

    let inputs = load_inputs(&path)?;

    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].instrument_name, "Instrument A");
    Ok(())
}

#[test]
fn biased_instrument_offset_matches_generated_bias() -> Result<()> {
    let seed = 40;
    let mut rng = Isaac64Rng::seed_from_u64(seed);

    for ii in 0..5 {
        let num_samples = rng.gen_range(3..20);
        let input = generate_instrument(&format!("LT-{ii}"), &mut rng, num_samples);
        let result = CalibrationEngine::default().process(&input)?;

        let slope = result.primary_fit().solution()[0];
        let intercept = result.primary_fit().solution()[1];
        approx::assert_relative_eq!(result.count_offset(), -intercept / slope, max_relative = 1e-9);

        // After compensation the offset fit reads zero EU at zero counts
        approx::assert_abs_diff_eq!(result.offset_fit().evaluate(0.), 0., epsilon = 1e-9);
        approx::assert_relative_eq!(
            result.offset_fit().solution()[0],
            slope,
            max_relative = 1e-9
        );
    }
    Ok(())
}

#[test]
fn reports_are_appended_per_instrument() -> Result<()> {
    let tmp_dir = create_working_dir("reports_are_appended_per_instrument");
    let prefix = tmp_dir.path().join("cal").to_string_lossy().into_owned();

    let engine = CalibrationEngine::default();
    let result = engine.process(&template()[0])?;

    let path = write_report(&prefix, &result)?;
    assert_eq!(path, output_path(&prefix, "Instrument A", "txt"));
    let once = std::fs::read_to_string(&path)?;

    write_report(&prefix, &result)?;
    let twice = std::fs::read_to_string(&path)?;

    assert_eq!(twice.len(), 2 * once.len());
    assert!(twice.starts_with(&once));
    Ok(())
}

#[test]
fn point_table_has_a_row_per_measurement() -> Result<()> {
    let tmp_dir = create_working_dir("point_table_has_a_row_per_measurement");
    let prefix = tmp_dir.path().join("cal").to_string_lossy().into_owned();

    let result = CalibrationEngine::default().process(&template()[1])?;
    let path = write_points_csv(&prefix, &result)?;

    let mut rdr = csv::Reader::from_path(&path)?;
    let headers = rdr.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "measured_counts",
            "measured_eu",
            "calculated_eu",
            "error",
            "error_pct_of_range",
            "adjusted_counts"
        ]
    );

    let rows = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<(f64, f64, f64, f64, f64, f64)>, _>>()?;
    assert_eq!(rows.len(), 5);
    for (row, count) in rows.iter().zip(&result.input().act_counts) {
        assert_eq!(row.0, *count);
        approx::assert_relative_eq!(row.3, row.2 - row.1, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn failed_records_do_not_stop_the_batch() {
    let mut flat = template()[0].clone();
    flat.instrument_name = "flat".to_owned();
    flat.act_counts = vec![5000., 5000., 5000.];

    let mut inverted = template()[1].clone();
    inverted.instrument_name = "inverted".to_owned();
    inverted.min_max_counts = (27648., -27648.);

    let inputs = vec![flat, template()[0].clone(), inverted, template()[1].clone()];
    let outcomes = CalibrationEngine::default().process_batch(&inputs);

    assert!(matches!(outcomes[0].result, Err(Error::DegenerateFit { .. })));
    assert!(outcomes[1].result.is_ok());
    assert!(matches!(
        outcomes[2].result,
        Err(Error::InvalidInput {
            field: "04_minMaxCounts",
            ..
        })
    ));
    assert!(outcomes[3].result.is_ok());
}
