//! Equality-constrained QP subproblem with simple bounds.
//!
//! Solves
//!
//! ```text
//! minimize    ½ dᵀBd + gᵀd
//! subject to  A d = -c
//!             lower ≤ x + d ≤ upper
//! ```
//!
//! by repeatedly solving the KKT system on the free variables and pinning any
//! variable whose step would leave its bounds.

use nalgebra::{DMatrix, DVector};
use tangent_core::Bounds;

/// A search direction and the constraint multipliers that accompany it.
#[derive(Debug, Clone)]
pub(super) struct Step {
    pub(super) direction: DVector<f64>,

    /// Multipliers `ν` satisfying `Bd + g + Aᵀν = 0` on the free variables.
    pub(super) multipliers: DVector<f64>,
}

/// Solves the subproblem, or returns `None` if the KKT system is singular.
///
/// A singular system means the linearized constraints cannot be satisfied by
/// the free variables.
pub(super) fn solve(
    hessian: &DMatrix<f64>,
    gradient: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    constraints: &DVector<f64>,
    x: &[f64],
    bounds: &[Bounds],
) -> Option<Step> {
    let n = gradient.len();
    let mut pinned: Vec<Option<f64>> = vec![None; n];

    // Each pass pins at least one more variable or returns.
    for _ in 0..=n {
        let free: Vec<usize> = (0..n).filter(|&i| pinned[i].is_none()).collect();
        let pinned_step = DVector::from_iterator(n, pinned.iter().map(|p| p.unwrap_or(0.0)));

        let (direction, multipliers) = solve_free(
            hessian,
            gradient,
            jacobian,
            constraints,
            &free,
            pinned_step,
        )?;

        let mut blocked = false;
        for &i in &free {
            let target = x[i] + direction[i];
            if target > bounds[i].upper() {
                pinned[i] = Some(bounds[i].upper() - x[i]);
                blocked = true;
            } else if target < bounds[i].lower() {
                pinned[i] = Some(bounds[i].lower() - x[i]);
                blocked = true;
            }
        }

        if !blocked {
            return Some(Step {
                direction,
                multipliers,
            });
        }
    }

    None
}

/// Solves the KKT system for the free variables with the rest held at
/// `pinned_step`.
fn solve_free(
    hessian: &DMatrix<f64>,
    gradient: &DVector<f64>,
    jacobian: &DMatrix<f64>,
    constraints: &DVector<f64>,
    free: &[usize],
    pinned_step: DVector<f64>,
) -> Option<(DVector<f64>, DVector<f64>)> {
    let m = constraints.len();
    let nf = free.len();
    let size = nf + m;

    let pinned_curvature = hessian * &pinned_step;
    let pinned_constraint = jacobian * &pinned_step;

    let mut kkt = DMatrix::<f64>::zeros(size, size);
    let mut rhs = DVector::<f64>::zeros(size);

    for (r, &i) in free.iter().enumerate() {
        for (col, &j) in free.iter().enumerate() {
            kkt[(r, col)] = hessian[(i, j)];
        }
        for k in 0..m {
            kkt[(r, nf + k)] = jacobian[(k, i)];
            kkt[(nf + k, r)] = jacobian[(k, i)];
        }
        rhs[r] = -gradient[i] - pinned_curvature[i];
    }
    for k in 0..m {
        rhs[nf + k] = -constraints[k] - pinned_constraint[k];
    }

    let solution = if size == 0 {
        DVector::zeros(0)
    } else {
        kkt.lu().solve(&rhs)?
    };
    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut direction = pinned_step;
    for (r, &i) in free.iter().enumerate() {
        direction[i] = solution[r];
    }
    let multipliers = DVector::from_iterator(m, (0..m).map(|k| solution[nf + k]));

    Some((direction, multipliers))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn unconstrained_step_is_newton_step() {
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let gradient = DVector::from_row_slice(&[-2.0, 8.0]);
        let jacobian = DMatrix::zeros(0, 2);
        let constraints = DVector::zeros(0);
        let bounds = [Bounds::unbounded(); 2];

        let step = solve(&hessian, &gradient, &jacobian, &constraints, &[0.0, 0.0], &bounds)
            .unwrap();

        assert_relative_eq!(step.direction[0], 1.0);
        assert_relative_eq!(step.direction[1], -2.0);
        assert_eq!(step.multipliers.len(), 0);
    }

    #[test]
    fn step_satisfies_linearized_constraint() {
        // minimize ½|d|² + gᵀd subject to d0 + d1 = -c.
        let hessian = DMatrix::identity(2, 2);
        let gradient = DVector::from_row_slice(&[1.0, -1.0]);
        let jacobian = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let constraints = DVector::from_row_slice(&[2.0]);
        let bounds = [Bounds::unbounded(); 2];

        let step = solve(&hessian, &gradient, &jacobian, &constraints, &[0.0, 0.0], &bounds)
            .unwrap();

        assert_relative_eq!(step.direction[0] + step.direction[1], -2.0, epsilon = 1e-12);
        assert_relative_eq!(step.direction[0], -2.0, epsilon = 1e-12);
        assert_relative_eq!(step.direction[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(step.multipliers[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn blocked_variables_stop_at_bounds() {
        let hessian = DMatrix::identity(2, 2);
        let gradient = DVector::from_row_slice(&[-5.0, -1.0]);
        let jacobian = DMatrix::zeros(0, 2);
        let constraints = DVector::zeros(0);
        let bounds = [Bounds::new(0.0, 1.0).unwrap(), Bounds::unbounded()];

        let step = solve(&hessian, &gradient, &jacobian, &constraints, &[0.5, 0.0], &bounds)
            .unwrap();

        assert_relative_eq!(step.direction[0], 0.5);
        assert_relative_eq!(step.direction[1], 1.0);
    }

    #[test]
    fn inconsistent_constraints_have_no_step() {
        let hessian = DMatrix::identity(1, 1);
        let gradient = DVector::from_row_slice(&[0.0]);
        let jacobian = DMatrix::from_row_slice(1, 1, &[0.0]);
        let constraints = DVector::from_row_slice(&[1.0]);
        let bounds = [Bounds::unbounded()];

        assert!(solve(&hessian, &gradient, &jacobian, &constraints, &[0.0], &bounds).is_none());
    }
}
