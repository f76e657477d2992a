use itertools::{Itertools, MinMaxResult};
use ndarray::Array1;

use crate::calibration::CalibrationResult;
use crate::math::linspace;

/// A labelled position along an axis
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

/// Axis limits, ticks and line series for drawing one calibration
#[derive(Clone, Debug, PartialEq)]
pub struct AxisLayout {
    /// Counts
    pub x_limits: (f64, f64),
    /// Engineering units
    pub y_limits: (f64, f64),
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    /// `(count, eu)` samples of the nominal transfer line inside the window
    pub nominal_series: Vec<(f64, f64)>,
    /// `(count, eu)` samples of the primary fit inside the window
    pub fitted_series: Vec<(f64, f64)>,
    /// `(count, eu)` samples of the offset fit inside the window
    pub offset_series: Vec<(f64, f64)>,
}

/// Chooses plot axes from the configured count and EU ranges
///
/// The axes span the configured ranges plus a margin. When measured points fall outside that
/// window it is widened to hold them, with the same margin beyond the outermost point. Line
/// samples never widen the window; those falling outside it are dropped from their series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisScaler {
    /// Fraction of the configured span added beyond each end of an axis
    pub margin_fraction: f64,
    pub x_ticks: usize,
    pub y_ticks: usize,
}

impl Default for AxisScaler {
    fn default() -> Self {
        Self {
            margin_fraction: 0.05,
            x_ticks: 5,
            y_ticks: 9,
        }
    }
}

impl AxisScaler {
    pub fn scale(&self, result: &CalibrationResult) -> AxisLayout {
        let input = result.input();
        let (count_low, count_high) = input.min_max_counts;
        let count_span = count_high - count_low;

        let x_limits = self.limits(input.min_max_counts, input.act_counts.iter().copied());
        let y_limits = self.limits(input.min_max_eu, input.act_eus.iter().copied());

        let x_ticks = linspace(count_low, count_high, self.x_ticks)
            .into_iter()
            .map(|value| {
                let percent = (value - count_low) / count_span * 100.;
                Tick {
                    value,
                    label: format!("{}\n{percent:.0}%", value.round()),
                }
            })
            .collect();

        let (eu_low, eu_high) = input.min_max_eu;
        let y_ticks = linspace(eu_low, eu_high, self.y_ticks)
            .into_iter()
            .map(|value| Tick {
                value,
                label: format!("{value}"),
            })
            .collect();

        let counts = result.nominal_counts();
        let clip = |eus: &Array1<f64>| {
            counts
                .iter()
                .zip(eus)
                .map(|(&count, &eu)| (count, eu))
                .filter(|&(count, eu)| within(count, x_limits) && within(eu, y_limits))
                .collect::<Vec<_>>()
        };

        AxisLayout {
            x_limits,
            y_limits,
            x_ticks,
            y_ticks,
            nominal_series: clip(result.nominal_eus()),
            fitted_series: clip(result.fitted_line()),
            offset_series: clip(result.offset_line()),
        }
    }

    fn limits(&self, (low, high): (f64, f64), data: impl Iterator<Item = f64>) -> (f64, f64) {
        let margin = (high - low) * self.margin_fraction;
        let (mut lower, mut upper) = (low - margin, high + margin);
        let (data_low, data_high) = match data.minmax() {
            MinMaxResult::NoElements => return (lower, upper),
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        if data_low < lower {
            lower = data_low - margin;
        }
        if data_high > upper {
            upper = data_high + margin;
        }
        (lower, upper)
    }
}

fn within(value: f64, (low, high): (f64, f64)) -> bool {
    (low..=high).contains(&value)
}
