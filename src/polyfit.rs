use std::fmt;

use itertools::Itertools;
use ndarray::{s, Array1, ArrayBase, Data, Ix1};
use ndarray_linalg::{c64, EigVals, LeastSquaresSvd, Norm};

use crate::math::{companion, vandermonde};
use crate::{Error, Result};

/// A polynomial in one variable with real coefficients
///
/// Coefficients are stored highest power first, so `[2., -3., 1.]` is `2 x^2 - 3 x + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coefficients: Array1<f64>,
}

impl Polynomial {
    pub fn new(coefficients: impl Into<Array1<f64>>) -> Self {
        Self {
            coefficients: coefficients.into(),
        }
    }

    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate the polynomial at a single abscissa or at each of a collection of abscissae
    ///
    /// The output has the shape of the input: a scalar for an `f64`, a pair for a `(low, high)`
    /// tuple, a `Vec` for a slice and an [`Array1`] for an array.
    pub fn evaluate<X: Abscissa>(&self, x: X) -> X::Output {
        x.evaluate_with(self)
    }

    fn horner(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0., |acc, &c| acc * x + c)
    }

    /// Every real and complex root of the polynomial, with multiplicity
    ///
    /// Leading zero coefficients are discarded and trailing zero coefficients contribute roots at
    /// the origin. A degree one polynomial is solved in closed form, higher degrees through the
    /// eigenvalues of the companion matrix. A constant polynomial has no roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the eigenvalue decomposition fails to converge.
    pub fn roots(&self) -> Result<Vec<c64>> {
        let coefficients = self
            .coefficients
            .iter()
            .copied()
            .skip_while(|&c| c == 0.)
            .collect::<Vec<_>>();

        let trailing_zeros = coefficients.iter().rev().take_while(|&&c| c == 0.).count();
        let coefficients = &coefficients[..coefficients.len() - trailing_zeros];

        let mut roots = match coefficients {
            [] | [_] => vec![],
            [slope, intercept] => vec![c64::new(-intercept / slope, 0.)],
            _ => companion(coefficients).eigvals()?.to_vec(),
        };
        roots.extend(std::iter::repeat(c64::new(0., 0.)).take(trailing_zeros));

        Ok(roots)
    }
}

impl From<FitResult> for Polynomial {
    fn from(fit: FitResult) -> Self {
        fit.polynomial
    }
}

/// Anything a [`Polynomial`] can be evaluated at
pub trait Abscissa {
    type Output;

    fn evaluate_with(self, polynomial: &Polynomial) -> Self::Output;
}

impl Abscissa for f64 {
    type Output = f64;

    fn evaluate_with(self, polynomial: &Polynomial) -> f64 {
        polynomial.horner(self)
    }
}

impl Abscissa for (f64, f64) {
    type Output = (f64, f64);

    fn evaluate_with(self, polynomial: &Polynomial) -> (f64, f64) {
        (polynomial.horner(self.0), polynomial.horner(self.1))
    }
}

impl Abscissa for &[f64] {
    type Output = Vec<f64>;

    fn evaluate_with(self, polynomial: &Polynomial) -> Vec<f64> {
        self.iter().map(|&x| polynomial.horner(x)).collect()
    }
}

impl<S: Data<Elem = f64>> Abscissa for &ArrayBase<S, Ix1> {
    type Output = Array1<f64>;

    fn evaluate_with(self, polynomial: &Polynomial) -> Array1<f64> {
        self.mapv(|x| polynomial.horner(x))
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let degree = self.degree();
        let mut written = false;
        for (ii, &coefficient) in self.coefficients.iter().enumerate() {
            if coefficient == 0. {
                continue;
            }
            let power = degree - ii;
            if written {
                let sign = if coefficient < 0. { '-' } else { '+' };
                write!(f, " {sign} {}", format_coefficient(coefficient.abs()))?;
            } else {
                write!(f, "{}", format_coefficient(coefficient))?;
            }
            match power {
                0 => {}
                1 => write!(f, " x")?,
                n => write!(f, " x^{n}")?,
            }
            written = true;
        }
        if !written {
            write!(f, "0")?;
        }
        Ok(())
    }
}

fn format_coefficient(value: f64) -> String {
    let magnitude = value.abs();
    if (1e-3..1e6).contains(&magnitude) {
        let fixed = format!("{value:.6}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        format!("{value:.6e}")
    }
}

/// A least-squares polynomial fit, with the diagnostics of the solve
#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    polynomial: Polynomial,
    /// Singular values of the column-normalised design matrix
    singular_values: Array1<f64>,
    rank: usize,
    residual_sum_of_squares: f64,
}

impl FitResult {
    pub const fn polynomial(&self) -> &Polynomial {
        &self.polynomial
    }

    /// Fitted coefficients, highest power first
    pub const fn solution(&self) -> &Array1<f64> {
        self.polynomial.coefficients()
    }

    pub fn degree(&self) -> usize {
        self.polynomial.degree()
    }

    pub fn evaluate<X: Abscissa>(&self, x: X) -> X::Output {
        self.polynomial.evaluate(x)
    }

    /// # Errors
    ///
    /// Returns an error if the eigenvalue decomposition fails to converge.
    pub fn roots(&self) -> Result<Vec<c64>> {
        self.polynomial.roots()
    }

    pub const fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    pub const fn rank(&self) -> usize {
        self.rank
    }

    pub const fn residual_sum_of_squares(&self) -> f64 {
        self.residual_sum_of_squares
    }
}

/// Fit a polynomial of `degree` to the observations `(x, y)` by least squares
///
/// The design matrix columns are normalised to unit length before the SVD solve so the rank test
/// is not skewed by the magnitude of high powers of `x`. Singular values below
/// `len(x) * f64::EPSILON` of the largest are treated as zero.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if `x` and `y` differ in length
/// - [`Error::DegenerateFit`] if there are fewer than `degree + 1` observations or the design
///   matrix is rank deficient, for example when repeated `x` values leave fewer than
///   `degree + 1` distinct abscissae
/// - [`Error::Linalg`] if the SVD fails
#[allow(clippy::cast_precision_loss)]
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<FitResult> {
    if x.len() != y.len() {
        return Err(Error::invalid(
            "y",
            format!("{} ordinates for {} abscissae", y.len(), x.len()),
        ));
    }

    let distinct = x
        .iter()
        .map(|xi| xi.to_bits())
        .sorted_unstable()
        .dedup()
        .count();
    if x.len() < degree + 1 {
        return Err(Error::DegenerateFit {
            points: x.len(),
            distinct,
            degree,
            rank: distinct.min(degree + 1),
        });
    }

    // Columns ordered highest power first to match the coefficient order
    let mut lhs = vandermonde(x, degree)?.slice(s![.., ..;-1]).to_owned();
    let scale = lhs
        .columns()
        .into_iter()
        .map(|column| {
            let norm = column.norm_l2();
            if norm == 0. {
                1.
            } else {
                norm
            }
        })
        .collect::<Array1<f64>>();
    lhs /= &scale;

    let rhs = Array1::from(y.to_vec());
    let solved = lhs.least_squares(&rhs)?;

    let largest = solved.singular_values.iter().copied().fold(0., f64::max);
    let cutoff = x.len() as f64 * f64::EPSILON * largest;
    let rank = solved
        .singular_values
        .iter()
        .filter(|&&value| value > cutoff)
        .count();
    if rank < degree + 1 {
        return Err(Error::DegenerateFit {
            points: x.len(),
            distinct,
            degree,
            rank,
        });
    }

    let polynomial = Polynomial::new(solved.solution / &scale);
    let residual_sum_of_squares = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (polynomial.evaluate(xi) - yi).powi(2))
        .sum();

    log::debug!("fitted degree {degree} polynomial {polynomial} with rank {rank}");

    Ok(FitResult {
        polynomial,
        singular_values: solved.singular_values,
        rank,
        residual_sum_of_squares,
    })
}
