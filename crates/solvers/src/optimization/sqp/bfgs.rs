use nalgebra::{DMatrix, DVector};

/// Curvature threshold for Powell's damping.
const DAMPING_THRESHOLD: f64 = 0.2;

/// Applies a damped BFGS update to the Lagrangian Hessian approximation.
///
/// `step` is the change in `x` and `change` the change in the Lagrangian
/// gradient. When `rescale` is set and the curvature is positive, the
/// approximation is first reset to `(yᵀy / sᵀy)·I`.
///
/// Damping blends `change` toward `B·step` so that `sᵀy ≥ 0.2·sᵀBs`, which
/// keeps the approximation positive definite. Degenerate steps leave it
/// unchanged.
pub(super) fn update(
    hessian: &mut DMatrix<f64>,
    step: &DVector<f64>,
    change: &DVector<f64>,
    rescale: bool,
) {
    let curvature = step.dot(change);
    if rescale && curvature > 0.0 {
        let n = hessian.nrows();
        *hessian = DMatrix::identity(n, n) * (change.dot(change) / curvature);
    }

    let bs = &*hessian * step;
    let sbs = step.dot(&bs);
    if !sbs.is_finite() || sbs <= 0.0 {
        return;
    }

    let y = if curvature < DAMPING_THRESHOLD * sbs {
        let theta = (1.0 - DAMPING_THRESHOLD) * sbs / (sbs - curvature);
        change * theta + &bs * (1.0 - theta)
    } else {
        change.clone()
    };
    let sy = step.dot(&y);
    if !sy.is_finite() || sy <= 0.0 {
        return;
    }

    *hessian += &y * y.transpose() / sy - &bs * bs.transpose() / sbs;
}
