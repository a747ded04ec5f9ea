//! Explicit time stepping of continuous states.

use crate::error::{ModelError, ModelResult};

/// Forward Euler (explicit, 1st order).
///
/// `x_new = x + h * dx`. No error control; the caller chooses `h`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardEuler;

impl ForwardEuler {
    pub fn step(&self, x: &[f64], dx: &[f64], h: f64) -> ModelResult<Vec<f64>> {
        if x.len() != dx.len() {
            return Err(ModelError::InvalidArg {
                what: "derivative length must match state length",
            });
        }
        if !(h > 0.0) || !h.is_finite() {
            return Err(ModelError::InvalidArg {
                what: "step size must be positive and finite",
            });
        }
        x.iter()
            .zip(dx)
            .map(|(xi, dxi)| cs_core::ensure_finite(xi + h * dxi, "state").map_err(ModelError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_step_is_linear() {
        let x = ForwardEuler.step(&[1.0, 2.0], &[0.5, -1.0], 0.1).unwrap();
        assert!((x[0] - 1.05).abs() < 1e-15);
        assert!((x[1] - 1.9).abs() < 1e-15);
    }

    #[test]
    fn euler_rejects_zero_step() {
        assert!(ForwardEuler.step(&[1.0], &[1.0], 0.0).is_err());
        assert!(ForwardEuler.step(&[1.0], &[1.0], f64::NAN).is_err());
    }

    #[test]
    fn euler_rejects_length_mismatch() {
        assert!(ForwardEuler.step(&[1.0, 2.0], &[1.0], 0.1).is_err());
    }

    #[test]
    fn euler_rejects_non_finite_result() {
        assert!(ForwardEuler.step(&[1.0], &[f64::INFINITY], 0.1).is_err());
    }
}
