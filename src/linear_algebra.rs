//! Dense least-squares routines.
//!
//! Householder QR without forming Q, used for the GM(1,1) parameter solve and
//! for the local polynomial fits behind the Savitzky-Golay smoother.

use crate::errors::{ReliabilityError, ReliabilityResult};

fn ensure_finite_matrix(a: &[Vec<f64>], operation: &str) -> ReliabilityResult<()> {
    for (i, row) in a.iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ReliabilityError::NumericalError {
                    reason: format!("Non-finite value ({}) at position [{},{}]", val, i, j),
                    operation: Some(operation.to_string()),
                });
            }
        }
    }
    Ok(())
}

fn ensure_finite_vector(v: &[f64], operation: &str) -> ReliabilityResult<()> {
    if let Some((i, val)) = v.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(ReliabilityError::NumericalError {
            reason: format!("Non-finite value ({}) at position [{}]", val, i),
            operation: Some(operation.to_string()),
        });
    }
    Ok(())
}

/// Validates that a matrix is rectangular (not ragged) and non-empty
fn ensure_rectangular_matrix(a: &[Vec<f64>]) -> ReliabilityResult<(usize, usize)> {
    let n = a.first().map(Vec::len).unwrap_or(0);
    if a.is_empty() || n == 0 {
        return Err(ReliabilityError::NumericalError {
            reason: "Empty matrix provided".to_string(),
            operation: Some("matrix_validation".to_string()),
        });
    }
    if !a.iter().all(|row| row.len() == n) {
        return Err(ReliabilityError::NumericalError {
            reason: "Ragged matrix (inconsistent row lengths)".to_string(),
            operation: Some("matrix_validation".to_string()),
        });
    }
    Ok((a.len(), n))
}

/// Solve the overdetermined system `A x ≈ b` in the least-squares sense.
///
/// `a` is row-major (`a[row][col]`) with at least as many rows as columns.
/// Columns that are numerically dependent get a zero coefficient instead of
/// producing an error.
pub fn economy_qr_solve(a: &[Vec<f64>], b: &[f64]) -> ReliabilityResult<Vec<f64>> {
    let (m, n) = ensure_rectangular_matrix(a)?;
    ensure_finite_matrix(a, "economy_qr_solve")?;
    ensure_finite_vector(b, "economy_qr_solve")?;

    if m != b.len() {
        return Err(ReliabilityError::ArrayAlignment {
            expected: m,
            actual: b.len(),
        });
    }
    if n > m {
        return Err(ReliabilityError::InsufficientData {
            required: n,
            actual: m,
        });
    }

    let mut r = a.to_vec();
    let mut y = b.to_vec();

    let frobenius = r
        .iter()
        .flat_map(|row| row.iter())
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt();
    // tol = max(m, n) * eps * ||A||_F with a safety factor
    let rank_tol = 100.0 * f64::EPSILON * (m.max(n) as f64) * frobenius.max(1.0);

    let steps = n.min(m.saturating_sub(1));
    for k in 0..steps {
        let mut v: Vec<f64> = (k..m).map(|i| r[i][k]).collect();
        let norm_v = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_v < rank_tol {
            for row in r.iter_mut().skip(k) {
                row[k] = 0.0;
            }
            continue;
        }

        let sign = if v[0] >= 0.0 { 1.0 } else { -1.0 };
        v[0] += sign * norm_v;
        let norm_v2 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm_v2 < rank_tol {
            continue;
        }
        for vi in &mut v {
            *vi /= norm_v2;
        }

        for j in k..n {
            let dot: f64 = (k..m).map(|i| v[i - k] * r[i][j]).sum();
            for i in k..m {
                r[i][j] -= 2.0 * v[i - k] * dot;
            }
        }
        let dot_y: f64 = (k..m).map(|i| v[i - k] * y[i]).sum();
        for i in k..m {
            y[i] -= 2.0 * v[i - k] * dot_y;
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n.min(m)).rev() {
        if r[i][i].abs() < rank_tol {
            x[i] = 0.0;
            continue;
        }
        let mut sum = y[i];
        for j in i + 1..n {
            sum -= r[i][j] * x[j];
        }
        x[i] = sum / r[i][i];
    }

    Ok(x)
}

/// Least-squares polynomial fit; coefficients in increasing power order.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> ReliabilityResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(ReliabilityError::ArrayAlignment {
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.len() <= degree {
        return Err(ReliabilityError::InsufficientData {
            required: degree + 1,
            actual: x.len(),
        });
    }
    let design: Vec<Vec<f64>> = x
        .iter()
        .map(|&xi| {
            let mut row = Vec::with_capacity(degree + 1);
            let mut p = 1.0;
            for _ in 0..=degree {
                row.push(p);
                p *= xi;
            }
            row
        })
        .collect();
    economy_qr_solve(&design, y)
}

/// Evaluate a polynomial with increasing-power coefficients (Horner).
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}
