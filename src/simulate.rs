use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};

use crate::input::CalibrationInput;
use crate::math::interp;
use crate::{Error, Result};

/// Replace measured counts with noisy synthetic counts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Each simulated count is drawn uniformly within this fraction of its nominal value
    #[serde(default = "default_noise_fraction")]
    pub noise_fraction: f64,
}

const fn default_noise_fraction() -> f64 {
    0.2
}

/// Simulate the counts a controller would report at each measured EU
///
/// The nominal count for each EU value is read off the configured transfer line, then drawn
/// uniformly from `[1 - noise_fraction, 1 + noise_fraction]` times itself and rounded to a whole
/// count. A nominal count of zero stays zero, as does any count whose band is too narrow to
/// sample. Records with an unusable range are returned unchanged so the engine can reject them.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `noise_fraction` is negative or not finite.
pub fn simulate_counts<R: Rng>(
    input: &CalibrationInput,
    noise_fraction: f64,
    rng: &mut R,
) -> Result<CalibrationInput> {
    if !(noise_fraction.is_finite() && noise_fraction >= 0.) {
        return Err(Error::invalid(
            "noise_fraction",
            format!("must be finite and non-negative, got {noise_fraction}"),
        ));
    }

    let (eu_low, eu_high) = input.min_max_eu;
    let (count_low, count_high) = input.min_max_counts;
    if !(eu_low < eu_high && count_low < count_high) {
        log::warn!(
            "{}: not simulating counts, configured range is empty",
            input.instrument_name
        );
        return Ok(input.clone());
    }

    let act_counts = input
        .act_eus
        .iter()
        .map(|&eu| {
            let nominal = interp(eu, &[eu_low, eu_high], &[count_low, count_high]);
            let a = nominal * (1. - noise_fraction);
            let b = nominal * (1. + noise_fraction);
            let (low, high) = (a.min(b), a.max(b));
            if low < high {
                rng.gen_range(low..high).round()
            } else {
                nominal.round()
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "{}: simulated counts {act_counts:?}",
        input.instrument_name
    );

    Ok(CalibrationInput {
        act_counts,
        ..input.clone()
    })
}
