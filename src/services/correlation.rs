//! Pearson correlation over paired observations.
//!
//! Each pair holds two users' scores for the same movie. The coefficient is
//! computed with the single-pass raw-sum form:
//!
//! ```text
//! r = (n·Σxy − Σx·Σy) / sqrt((n·Σx² − (Σx)²) · (n·Σy² − (Σy)²))
//! ```
//!
//! When either variable has zero variance the coefficient is undefined. That
//! case returns [`UNDEFINED_CORRELATION`] (`0.0`, "no linear signal") instead
//! of dividing by zero. Constancy is tested on the values themselves, since
//! the raw sums can leave a tiny non-zero spread for a constant fractional
//! series. Callers that need to tell the two apart can check
//! [`has_variance`] first.

use thiserror::Error;

/// Value returned when the coefficient is undefined because one side of the
/// pairs is constant.
pub const UNDEFINED_CORRELATION: f64 = 0.0;

/// Contract violations in correlation input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("correlation requires at least one paired observation")]
    Empty,
    #[error("correlation inputs differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("correlation input has a non-finite value at pair {index}")]
    NonFinite { index: usize },
}

/// Running sums for the raw-sum Pearson formula
#[derive(Debug, Default, Clone, Copy)]
struct Sums {
    n: f64,
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
}

impl Sums {
    fn collect(pairs: &[(f64, f64)]) -> Self {
        pairs.iter().fold(Self::default(), |acc, &(x, y)| Self {
            n: acc.n + 1.0,
            x: acc.x + x,
            y: acc.y + y,
            xx: acc.xx + x * x,
            yy: acc.yy + y * y,
            xy: acc.xy + x * y,
        })
    }

    fn spread_x(&self) -> f64 {
        self.n * self.xx - self.x * self.x
    }

    fn spread_y(&self) -> f64 {
        self.n * self.yy - self.y * self.y
    }
}

/// True when every pair carries the same value on the selected side
fn is_constant(pairs: &[(f64, f64)], side: impl Fn(&(f64, f64)) -> f64) -> bool {
    match pairs.first() {
        Some(first) => {
            let value = side(first);
            pairs.iter().all(|pair| side(pair) == value)
        }
        None => true,
    }
}

fn check_finite(pairs: &[(f64, f64)]) -> Result<(), CorrelationError> {
    match pairs
        .iter()
        .position(|&(x, y)| !x.is_finite() || !y.is_finite())
    {
        Some(index) => Err(CorrelationError::NonFinite { index }),
        None => Ok(()),
    }
}

/// Pearson correlation coefficient of paired observations.
///
/// Returns a value in `[-1.0, 1.0]`, or [`UNDEFINED_CORRELATION`] when all `x`
/// or all `y` values are equal (a single pair always falls in this case).
///
/// # Errors
/// [`CorrelationError::Empty`] when `pairs` is empty and
/// [`CorrelationError::NonFinite`] when any value is infinite or NaN.
pub fn pearson(pairs: &[(f64, f64)]) -> Result<f64, CorrelationError> {
    if pairs.is_empty() {
        return Err(CorrelationError::Empty);
    }
    check_finite(pairs)?;

    if !has_variance(pairs) {
        return Ok(UNDEFINED_CORRELATION);
    }

    let sums = Sums::collect(pairs);
    let spread_x = sums.spread_x();
    let spread_y = sums.spread_y();

    // Varying values can still underflow to a zero spread.
    if spread_x <= 0.0 || spread_y <= 0.0 {
        return Ok(UNDEFINED_CORRELATION);
    }

    let numerator = sums.n * sums.xy - sums.x * sums.y;
    let denominator = (spread_x * spread_y).sqrt();

    Ok((numerator / denominator).clamp(-1.0, 1.0))
}

/// Pearson correlation of two parallel series.
///
/// # Errors
/// [`CorrelationError::LengthMismatch`] when the series differ in length,
/// otherwise whatever [`pearson`] reports for the zipped pairs.
pub fn pearson_xy(xs: &[f64], ys: &[f64]) -> Result<f64, CorrelationError> {
    if xs.len() != ys.len() {
        return Err(CorrelationError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    let pairs: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
    pearson(&pairs)
}

/// Whether both sides of the pairs vary, i.e. the coefficient is defined
pub fn has_variance(pairs: &[(f64, f64)]) -> bool {
    !is_constant(pairs, |&(x, _)| x) && !is_constant(pairs, |&(_, y)| y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn swapped(pairs: &[(f64, f64)]) -> Vec<(f64, f64)> {
        pairs.iter().map(|&(x, y)| (y, x)).collect()
    }

    #[test]
    fn test_perfect_positive() {
        let pairs = vec![(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!((pearson(&pairs).unwrap() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_perfect_negative() {
        let pairs = vec![(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)];
        assert!((pearson(&pairs).unwrap() + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_known_value() {
        // Hand-computed: 6 / sqrt(6 * 14)
        let pairs = vec![(5.0, 4.0), (3.0, 2.0), (4.0, 5.0)];
        let expected = 6.0 / 84.0_f64.sqrt();
        assert!((pearson(&pairs).unwrap() - expected).abs() < EPSILON);
    }

    #[test]
    fn test_symmetric_in_x_and_y() {
        let pairs = vec![(5.0, 1.0), (3.0, 4.0), (4.0, 4.0), (1.0, 2.0), (2.0, 5.0)];
        assert_eq!(
            pearson(&pairs).unwrap(),
            pearson(&swapped(&pairs)).unwrap()
        );
    }

    #[test]
    fn test_constant_x_is_undefined() {
        let pairs = vec![(3.0, 1.0), (3.0, 4.0), (3.0, 5.0)];
        assert_eq!(pearson(&pairs).unwrap(), UNDEFINED_CORRELATION);
        assert!(!has_variance(&pairs));
    }

    #[test]
    fn test_constant_y_is_undefined() {
        let pairs = vec![(1.0, 2.0), (4.0, 2.0)];
        assert_eq!(pearson(&pairs).unwrap(), UNDEFINED_CORRELATION);
    }

    #[test]
    fn test_constant_fractional_series_is_undefined() {
        let ys = [1.0, 2.0, 3.0, 5.0, 4.0, 7.0, 6.0];
        for value in [1.11, 7.77, 0.3, 3.7, 0.1 * 7.0, 0.37 * 9.0] {
            for n in 2..=ys.len() {
                let pairs: Vec<(f64, f64)> = ys[..n].iter().map(|&y| (value, y)).collect();
                assert_eq!(
                    pearson(&pairs).unwrap(),
                    UNDEFINED_CORRELATION,
                    "x = {value}, n = {n}"
                );
                assert_eq!(
                    pearson(&swapped(&pairs)).unwrap(),
                    UNDEFINED_CORRELATION,
                    "y = {value}, n = {n}"
                );
                assert!(!has_variance(&pairs));
            }
        }
    }

    #[test]
    fn test_has_variance_when_both_sides_vary() {
        assert!(has_variance(&[(1.0, 2.0), (1.5, 2.5)]));
        assert!(!has_variance(&[(4.0, 5.0)]));
        assert!(!has_variance(&[]));
    }

    #[test]
    fn test_single_pair_is_undefined() {
        assert_eq!(pearson(&[(4.0, 5.0)]).unwrap(), UNDEFINED_CORRELATION);
    }

    #[test]
    fn test_empty_is_contract_violation() {
        assert_eq!(pearson(&[]), Err(CorrelationError::Empty));
        assert_eq!(pearson_xy(&[], &[]), Err(CorrelationError::Empty));
    }

    #[test]
    fn test_length_mismatch_is_contract_violation() {
        let err = pearson_xy(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, CorrelationError::LengthMismatch { left: 3, right: 2 });
        assert!(err.to_string().contains("3 vs 2"));
    }

    #[test]
    fn test_infinite_value_is_contract_violation() {
        let pairs = vec![(f64::INFINITY, 1.0), (1.0, 2.0), (2.0, 3.0)];
        assert_eq!(pearson(&pairs), Err(CorrelationError::NonFinite { index: 0 }));

        let err = pearson_xy(&[1.0, 2.0, 3.0], &[1.0, 2.0, f64::NEG_INFINITY]).unwrap_err();
        assert_eq!(err, CorrelationError::NonFinite { index: 2 });
    }

    #[test]
    fn test_nan_value_is_contract_violation() {
        let pairs = vec![(1.0, 1.0), (f64::NAN, 2.0), (2.0, 3.0)];
        let err = pearson(&pairs).unwrap_err();
        assert_eq!(err, CorrelationError::NonFinite { index: 1 });
        assert!(err.to_string().contains("non-finite"));

        // A NaN on a constant side is still rejected rather than hidden
        let constant = vec![(2.0, 1.0), (2.0, f64::NAN)];
        assert!(pearson(&constant).is_err());
    }

    #[test]
    fn test_parallel_series_match_pairs() {
        let xs = [1.0, 2.0, 4.0, 5.0];
        let ys = [2.0, 1.0, 5.0, 4.0];
        let pairs: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        assert_eq!(pearson_xy(&xs, &ys).unwrap(), pearson(&pairs).unwrap());
    }

    #[test]
    fn test_result_is_never_nan() {
        let pairs = vec![(1e-300, 1e-300), (2e-300, 2e-300)];
        assert!(!pearson(&pairs).unwrap().is_nan());
    }
}
