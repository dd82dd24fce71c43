use crate::retrieval::error::RetrievalError;
use nalgebra::{DMatrix, DVector};

type Result<T> = std::result::Result<T, RetrievalError>;

const SINGULAR_VALUE_EPS: f64 = 1e-12;

/// Least-squares polynomial in a centred and scaled variable.
///
/// Abscissae are mapped to `(x - center) / scale` before fitting so that the Vandermonde
/// matrix stays well conditioned for elevation angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients in ascending powers of the scaled variable
    pub coefficients: Vec<f64>,
    center: f64,
    scale: f64,
}

impl Polynomial {
    /// Fits a polynomial of the given order to `(x, y)`.
    ///
    /// # Errors
    /// Will return `Err` if `x` and `y` differ in length, if there are not more points than
    /// the order, or if the design matrix cannot be solved.
    pub fn fit(x: &[f64], y: &[f64], order: usize) -> Result<Polynomial> {
        if x.len() != y.len() {
            Err(RetrievalError::InvalidInput(format!(
                "polynomial fit needs equal lengths, got {} and {}",
                x.len(),
                y.len()
            )))?
        }
        if x.len() <= order {
            Err(RetrievalError::InvalidInput(format!(
                "polynomial fit of order {order} needs more than {order} points, got {}",
                x.len()
            )))?
        }

        let n = x.len() as f64;
        let center = x.iter().sum::<f64>() / n;
        let half_span = x.iter().map(|v| (v - center).abs()).fold(0.0_f64, f64::max);
        let scale = if half_span > 0.0 { half_span } else { 1.0 };

        let design = DMatrix::from_fn(x.len(), order + 1, |i, j| {
            ((x[i] - center) / scale).powi(j as i32)
        });
        let rhs = DVector::from_column_slice(y);
        let solution = design
            .svd(true, true)
            .solve(&rhs, SINGULAR_VALUE_EPS)
            .map_err(|e| RetrievalError::InvalidInput(format!("polynomial fit failed: {e}")))?;

        Ok(Polynomial {
            coefficients: solution.iter().copied().collect(),
            center,
            scale,
        })
    }

    /// Evaluates the polynomial with Horner's method.
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    /// Residuals `y - p(x)`.
    pub fn residuals(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        x.iter().zip(y).map(|(&xi, &yi)| yi - self.eval(xi)).collect()
    }
}
