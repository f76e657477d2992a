use ndarray::{Array, Array1, Array2};

use crate::Result;

/// Generate the Vandermonde matrix of `degree` for observations `x`
///
/// The Vandermonde matrix is a (n x degree + 1) matrix. Each row of the matrix is a geometric
/// progression for an individual observation `x` from power `0` to `degree` inclusive.
///
/// # Errors
///
/// Returns an error if `degree` does not fit in an `i32`.
///
/// # Examples
///
/// ```
/// use plc_calibration::math::vandermonde;
/// use ndarray::arr2;
///
/// let observations: Vec<f64> = vec![2., 3.];
/// let vander = vandermonde(&observations, 2).unwrap();
///
/// let expected = arr2(&[[1., 2., 4.], [1., 3., 9.]]);
/// assert_eq!(vander, expected);
/// ```
pub fn vandermonde(x: &[f64], degree: usize) -> Result<Array2<f64>> {
    let max_power = i32::try_from(degree)
        .map_err(|_| crate::Error::invalid("degree", format!("{degree} doesn't fit in `i32`")))?;
    let vals = x
        .iter()
        .flat_map(|xi| (0..=max_power).map(move |i| xi.powi(i)));

    Ok(Array::from_iter(vals).into_shape((x.len(), degree + 1))?)
}

/// Build the companion matrix of a polynomial with coefficients ordered highest power first
///
/// The eigenvalues of the companion matrix are the roots of the polynomial. The leading
/// coefficient must be non-zero and there must be at least two coefficients. The first row holds
/// the negated, normalised lower-order coefficients and the sub-diagonal is unity.
///
/// # Examples
///
/// ```
/// use plc_calibration::math::companion;
/// use ndarray::arr2;
///
/// // x^2 - 5x + 6
/// let matrix = companion(&[1., -5., 6.]);
/// assert_eq!(matrix, arr2(&[[5., -6.], [1., 0.]]));
/// ```
pub fn companion(coefficients: &[f64]) -> Array2<f64> {
    let order = coefficients.len().saturating_sub(1);
    let mut matrix = Array2::zeros((order, order));
    if order == 0 {
        return matrix;
    }
    let leading = coefficients[0];
    for (jj, coefficient) in coefficients[1..].iter().enumerate() {
        matrix[[0, jj]] = -coefficient / leading;
    }
    for ii in 1..order {
        matrix[[ii, ii - 1]] = 1.;
    }
    matrix
}

/// `num` evenly spaced samples over `[start, stop]`, both endpoints included
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, num: usize) -> Array1<f64> {
    match num {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            Array1::from_iter((0..num).map(|ii| {
                if ii == num - 1 {
                    stop
                } else {
                    start + step * ii as f64
                }
            }))
        }
    }
}

/// Piecewise-linear interpolation of `x` against the increasing sample points `xp`
///
/// Values outside the sampled range are clamped to the first or last entry of `fp`.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    let (Some(&first), Some(&last)) = (xp.first(), xp.last()) else {
        return f64::NAN;
    };
    if x <= first {
        return fp[0];
    }
    if x >= last {
        return fp[fp.len() - 1];
    }
    let upper = xp.partition_point(|&xi| xi <= x);
    let (x0, x1) = (xp[upper - 1], xp[upper]);
    let (y0, y1) = (fp[upper - 1], fp[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
