use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use ndarray_rand::rand::SeedableRng;
use rand_isaac::Isaac64Rng;

use plc_calibration::config::RunConfig;
use plc_calibration::input::{load_inputs, write_template};
use plc_calibration::output::{write_points_csv, write_report};
use plc_calibration::simulate::simulate_counts;
use plc_calibration::{report, CalibrationEngine, CalibrationResult};

fn main() -> Result<ExitCode> {
    env_logger::init();

    let Some(config_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: plc-calibration <run-config.toml>");
    };
    let config = RunConfig::from_file(&config_path)
        .with_context(|| format!("loading run configuration {}", config_path.display()))?;

    if config.create_template {
        let Some(prefix) = &config.output_prefix else {
            bail!("`output_prefix` names the template file and must be set with `create_template`");
        };
        write_template(Path::new(prefix))
            .with_context(|| format!("writing input template {prefix}"))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(input_file) = &config.input_file else {
        bail!("`input_file` must be set");
    };
    let mut inputs = load_inputs(input_file)
        .with_context(|| format!("loading calibration records {}", input_file.display()))?;

    if let Some(simulation) = &config.simulate {
        let mut rng = Isaac64Rng::seed_from_u64(simulation.seed);
        inputs = inputs
            .iter()
            .map(|input| simulate_counts(input, simulation.noise_fraction, &mut rng))
            .collect::<plc_calibration::Result<_>>()
            .context("simulating counts")?;
    }

    let engine = CalibrationEngine::new(config.engine.clone());
    let mut failures = 0;
    for outcome in engine.process_batch(&inputs) {
        let written = outcome
            .result
            .map_err(anyhow::Error::from)
            .and_then(|result| emit(&config, &result));
        if let Err(e) = written {
            failures += 1;
            eprintln!("{}: {e:#}", outcome.instrument);
        }
    }

    log::info!(
        "calibrated {} of {} instruments",
        inputs.len() - failures,
        inputs.len()
    );
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit(config: &RunConfig, result: &CalibrationResult) -> Result<()> {
    if let Some(prefix) = &config.output_prefix {
        write_report(prefix, result).context("writing report")?;
        write_points_csv(prefix, result).context("writing point table")?;
    }
    if config.verbose {
        println!("{}", report::format(result));
    }
    Ok(())
}
