use ndarray_linalg::c64;

use crate::polyfit::{polyfit, FitResult};
use crate::{Error, Result};

/// Removes the count bias of a fit, the count at which the fitted curve reads zero EU
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetCompensator {
    /// A root counts as real when its imaginary part is within this fraction of its modulus
    /// (or of unity, for roots near the origin)
    real_root_tolerance: f64,
}

impl Default for OffsetCompensator {
    fn default() -> Self {
        Self::new(1e-7)
    }
}

impl OffsetCompensator {
    pub const fn new(real_root_tolerance: f64) -> Self {
        Self {
            real_root_tolerance,
        }
    }

    /// The count offset of `fit`: its real root of smallest magnitude
    ///
    /// Of two real roots with equal magnitude the positive one is taken.
    ///
    /// # Errors
    ///
    /// - [`Error::NoRealRoot`] if the fitted polynomial never crosses zero
    /// - [`Error::Linalg`] if the roots cannot be computed
    pub fn compute_offset(&self, fit: &FitResult) -> Result<f64> {
        let roots = fit.roots()?;
        let offset = self
            .real_roots(&roots)
            .into_iter()
            .min_by(|a, b| a.abs().total_cmp(&b.abs()).then(b.total_cmp(a)))
            .ok_or(Error::NoRealRoot { roots })?;
        log::debug!("count offset {offset} selected from roots of {}", fit.polynomial());
        Ok(offset)
    }

    /// The real parts of those `roots` whose imaginary part is negligible
    pub fn real_roots(&self, roots: &[c64]) -> Vec<f64> {
        roots
            .iter()
            .filter(|root| root.im.abs() <= self.real_root_tolerance * root.norm().max(1.))
            .map(|root| root.re)
            .collect()
    }

    /// Shift every count down by `offset`, preserving order and length
    pub fn apply_offset(counts: &[f64], offset: f64) -> Vec<f64> {
        counts.iter().map(|count| count - offset).collect()
    }

    /// Fit the shifted counts against the measured EU at the same degree
    ///
    /// # Errors
    ///
    /// Propagates any failure of [`polyfit`].
    pub fn refit(offset_counts: &[f64], eus: &[f64], degree: usize) -> Result<FitResult> {
        polyfit(offset_counts, eus, degree)
    }
}

#[cfg(test)]
mod tests {
    use ndarray_linalg::c64;

    use super::OffsetCompensator;
    use crate::polyfit::{polyfit, Polynomial};
    use crate::{Error, Result};

    fn sample(polynomial: &Polynomial, x: &[f64]) -> Vec<f64> {
        polynomial.evaluate(x)
    }

    #[test]
    fn linear_offset_is_the_x_intercept() -> Result<()> {
        let x = [1000., 2000., 3000.];
        let y = sample(&Polynomial::new(vec![0.01, -5.]), &x);
        let fit = polyfit(&x, &y, 1)?;

        let offset = OffsetCompensator::default().compute_offset(&fit)?;

        approx::assert_relative_eq!(offset, 500., max_relative = 1e-9);
        Ok(())
    }

    #[test]
    fn root_closest_to_zero_is_selected() -> Result<()> {
        // (x + 5)(x - 3)
        let x = [-8., -6., -4., -2., 0., 2., 4., 6.];
        let y = sample(&Polynomial::new(vec![1., 2., -15.]), &x);
        let fit = polyfit(&x, &y, 2)?;

        let offset = OffsetCompensator::default().compute_offset(&fit)?;

        approx::assert_relative_eq!(offset, 3., max_relative = 1e-9);
        Ok(())
    }

    #[test]
    fn positive_root_wins_a_magnitude_tie() {
        let compensator = OffsetCompensator::default();
        let roots = [c64::new(-3., 0.), c64::new(3., 0.)];
        let selected = compensator
            .real_roots(&roots)
            .into_iter()
            .min_by(|a, b| a.abs().total_cmp(&b.abs()).then(b.total_cmp(a)));
        assert_eq!(selected, Some(3.));
    }

    #[test]
    fn curve_that_never_crosses_zero_has_no_offset() -> Result<()> {
        // x^2 + 1
        let x = [-2., -1., 0., 1., 2.];
        let y = sample(&Polynomial::new(vec![1., 0., 1.]), &x);
        let fit = polyfit(&x, &y, 2)?;

        let result = OffsetCompensator::default().compute_offset(&fit);

        match result {
            Err(Error::NoRealRoot { roots }) => assert_eq!(roots.len(), 2),
            other => panic!("expected no real root, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn complex_roots_are_filtered_out() {
        let compensator = OffsetCompensator::default();
        let roots = [
            c64::new(0.5, 2.),
            c64::new(0.5, -2.),
            c64::new(7., 1e-12),
            c64::new(-9., 0.),
        ];
        assert_eq!(compensator.real_roots(&roots), vec![7., -9.]);
    }

    #[test]
    fn offset_is_subtracted_elementwise() {
        let shifted = OffsetCompensator::apply_offset(&[1265., 12093., 26989.], 1265.);
        assert_eq!(shifted, vec![0., 10828., 25724.]);
        assert!(OffsetCompensator::apply_offset(&[], 3.).is_empty());
    }

    #[test]
    fn refit_reproduces_measurements_after_shift() -> Result<()> {
        let x = [1265., 5209., 10093., 22345., 26989.];
        let y = sample(&Polynomial::new(vec![2e-8, 6e-3, -8.]), &x);
        let fit = polyfit(&x, &y, 2)?;

        let offset = OffsetCompensator::default().compute_offset(&fit)?;
        let shifted = OffsetCompensator::apply_offset(&x, offset);
        let refit = OffsetCompensator::refit(&shifted, &y, 2)?;

        for (calculated, expected) in refit.evaluate(shifted.as_slice()).iter().zip(&y) {
            approx::assert_abs_diff_eq!(*calculated, *expected, epsilon = 1e-6);
        }
        // The shifted curve passes through the origin
        approx::assert_abs_diff_eq!(refit.evaluate(0.), 0., epsilon = 1e-6);
        Ok(())
    }
}
