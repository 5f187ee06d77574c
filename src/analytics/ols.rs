/// Ordinary least squares fit of `y = X b + e`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    pub fn t_value(&self, i: usize) -> Option<f64> {
        let t = self.params.get(i)? / self.std_errors.get(i)?;
        t.is_finite().then_some(t)
    }

    /// Gaussian log-likelihood at the fitted parameters.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }
}

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Fit by solving the normal equations. `rows` holds one regressor vector per
/// observation, all of the same width.
pub fn ols(y: &[f64], rows: &[Vec<f64>]) -> Result<OlsFit, String> {
    let n = y.len();
    if n != rows.len() {
        return Err(format!("{} observations but {} regressor rows", n, rows.len()));
    }
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 {
        return Err("no regressors".to_string());
    }
    if rows.iter().any(|r| r.len() != k) {
        return Err("ragged regressor matrix".to_string());
    }
    if n <= k {
        return Err(format!("{} observations cannot identify {} parameters", n, k));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let inv = invert(xtx).ok_or_else(|| "singular regressor matrix".to_string())?;
    let params: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = rows
        .iter()
        .zip(y)
        .map(|(row, &yi)| {
            let fitted: f64 = row.iter().zip(&params).map(|(x, b)| x * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inv[i][i]).max(0.0).sqrt()).collect();

    Ok(OlsFit {
        params,
        std_errors,
        ssr,
        nobs: n,
    })
}

// Gauss-Jordan with partial pivoting; `None` when a pivot vanishes relative
// to the largest diagonal entry.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let k = a.len();
    let scale = (0..k).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale <= 0.0 || !scale.is_finite() {
        return None;
    }
    let tol = scale * PIVOT_TOLERANCE;
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() <= tol {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..k {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }
        for r in 0..k {
            if r == col {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[r][j] -= factor * a[col][j];
                inv[r][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line_with_noise_free_data() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = xs.iter().map(|x| 2.0 + 3.0 * x).collect();
        let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
        let fit = ols(&y, &rows).unwrap();
        assert!((fit.params[0] - 2.0).abs() < 1e-9);
        assert!((fit.params[1] - 3.0).abs() < 1e-9);
        assert!(fit.ssr < 1e-12);
    }

    #[test]
    fn standard_errors_match_closed_form() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.1, 1.9, 3.2, 3.8, 5.1];
        let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
        let fit = ols(&y, &rows).unwrap();

        // slope se = sqrt(sigma2 / Sxx), Sxx = 10
        let sigma2 = fit.ssr / 3.0;
        assert!((fit.std_errors[1] - (sigma2 / 10.0).sqrt()).abs() < 1e-12);
        assert!((fit.params[1] - 0.99).abs() < 1e-9);
    }

    #[test]
    fn collinear_columns_are_singular() {
        let rows: Vec<Vec<f64>> = (0..5).map(|_| vec![1.0, 7.0]).collect();
        assert!(ols(&[1.0, 2.0, 3.0, 4.0, 5.0], &rows).is_err());
    }

    #[test]
    fn too_few_observations() {
        let rows = vec![vec![1.0, 0.0], vec![1.0, 1.0]];
        assert!(ols(&[0.0, 1.0], &rows).is_err());
    }
}
