use statrs::statistics::Statistics;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.mean())
}

/// Population variance (divide by n).
pub fn population_variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.population_variance())
}

/// Sample standard deviation (divide by n - 1). Needs at least two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    finite(values.std_dev())
}

/// Population covariance over the common prefix of `x` and `y`.
pub fn population_covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return None;
    }
    finite(x[..n].population_covariance(&y[..n]))
}

/// Pearson correlation, clamped to [-1, 1]. `None` when either side has no
/// dispersion or fewer than two points.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let var_x = population_variance(x)?;
    let var_y = population_variance(y)?;
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let cov = population_covariance(x, y)?;
    finite(cov / (var_x.sqrt() * var_y.sqrt())).map(|r| r.clamp(-1.0, 1.0))
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_moments() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v).unwrap() - 5.0).abs() < 1e-12);
        assert!((population_variance(&v).unwrap() - 4.0).abs() < 1e-12);
        assert!((sample_std_dev(&v).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_and_short_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(population_variance(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
        assert_eq!(population_covariance(&[], &[1.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn pearson_perfect_and_degenerate() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let neg = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &neg).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[3.0, 3.0, 3.0, 3.0]), None);
    }
}
