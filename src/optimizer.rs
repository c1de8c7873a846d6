//! The optimizer-provider collaborator (spec section 6): wraps an
//! unconstrained minimizer behind a small trait so the `argmin`-backed
//! implementation here is substitutable, exactly like the linear-algebra
//! backend in `crate::backend`.

use argmin::core::{CostFunction, Error as ArgminError, Executor, Gradient};
use argmin::solver::conjugategradient::beta::PolakRibiere;
use argmin::solver::conjugategradient::NonlinearConjugateGradient;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::DVector;

use crate::density::Density;
use crate::error::{IcaError, Result};
use crate::matrix::IcaScalar;
use crate::objective::IcaObjective;
use crate::options::{IcaOptions, OptimizerDirection};

/// Adapts [`IcaObjective`] to argmin's `CostFunction`/`Gradient` traits.
/// `Self::Param` is a flat `DVector<T>` holding the packed theta, matching
/// the functor's own packing convention. Barrier hits (an infeasible trial
/// `W`) are absorbed into a zero gradient rather than propagated as an
/// `Err`, so a probing line search backs off instead of aborting the run.
struct ObjectiveAdapter<'a, 'b, T: IcaScalar, D: Density<T>> {
    inner: &'b IcaObjective<'a, T, D>,
}

impl<'a, 'b, T, D> CostFunction for ObjectiveAdapter<'a, 'b, T, D>
where
    T: IcaScalar + nalgebra::RealField + argmin_math::ArgminFloat,
    D: Density<T>,
{
    type Param = DVector<T>;
    type Output = T;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        let theta: Vec<T> = p.iter().copied().collect();
        Ok(self.inner.evaluate(&theta, false).value)
    }
}

impl<'a, 'b, T, D> Gradient for ObjectiveAdapter<'a, 'b, T, D>
where
    T: IcaScalar + nalgebra::RealField + argmin_math::ArgminFloat,
    D: Density<T>,
{
    type Param = DVector<T>;
    type Gradient = DVector<T>;

    fn gradient(&self, p: &Self::Param) -> std::result::Result<Self::Gradient, ArgminError> {
        let theta: Vec<T> = p.iter().copied().collect();
        let evaluation = self.inner.evaluate(&theta, true);
        // A barrier point (|det(W)| < eps_det) carries no gradient; absorb
        // it as a flat zero vector rather than raising, so the line search
        // sees "no useful descent direction here" and backs off instead of
        // unwinding the whole run (spec section 7.3 / design notes: "return
        // an objective sentinel with an unchanged gradient buffer").
        let grad = evaluation.gradient.unwrap_or_else(|| vec![T::zero(); p.len()]);
        Ok(DVector::from_vec(grad))
    }
}

/// The minimizer collaborator required by spec section 4.4: minimizes
/// `f(theta)`, honoring a configured search direction, iteration cap and
/// verbosity.
pub trait Optimizer<T: IcaScalar, D: Density<T>> {
    fn minimize(
        &self,
        objective: &IcaObjective<T, D>,
        theta0: Vec<T>,
        options: &IcaOptions,
    ) -> Result<Vec<T>>;
}

/// `argmin`-backed optimizer: quasi-Newton via `LBFGS` (default) or
/// nonlinear conjugate gradient via `NonlinearConjugateGradient`, both with
/// a More-Thuente line search, matching the reference's own choice of
/// `fmincl::minimize` with a configurable direction.
pub struct ArgminOptimizer;

impl<T, D> Optimizer<T, D> for ArgminOptimizer
where
    T: IcaScalar + nalgebra::RealField + argmin_math::ArgminFloat,
    D: Density<T>,
{
    fn minimize(
        &self,
        objective: &IcaObjective<T, D>,
        theta0: Vec<T>,
        options: &IcaOptions,
    ) -> Result<Vec<T>> {
        let adapter = ObjectiveAdapter { inner: objective };
        let init = DVector::from_vec(theta0);

        log::info!(
            "optimizer: starting {:?} search, max_iter={}",
            options.direction,
            options.max_iter
        );

        let best_param = match options.direction {
            OptimizerDirection::QuasiNewton => {
                let line_search = MoreThuenteLineSearch::new();
                let solver = LBFGS::new(line_search, 10);
                let executor = Executor::new(adapter, solver).configure(|state| {
                    state.param(init.clone()).max_iters(options.max_iter)
                });
                let result = executor
                    .run()
                    .map_err(|e| IcaError::OptimizerFailed(e.to_string()))?;
                result
                    .state()
                    .get_best_param()
                    .cloned()
                    .ok_or_else(|| IcaError::OptimizerFailed("no best parameter returned".into()))?
            }
            OptimizerDirection::NonlinearConjugateGradient => {
                let line_search = MoreThuenteLineSearch::new();
                let beta_method = PolakRibiere::new();
                let solver = NonlinearConjugateGradient::new(line_search, beta_method);
                let executor = Executor::new(adapter, solver).configure(|state| {
                    state.param(init.clone()).max_iters(options.max_iter)
                });
                let result = executor
                    .run()
                    .map_err(|e| IcaError::OptimizerFailed(e.to_string()))?;
                result
                    .state()
                    .get_best_param()
                    .cloned()
                    .ok_or_else(|| IcaError::OptimizerFailed("no best parameter returned".into()))?
            }
        };

        log::info!("optimizer: converged, theta length {}", best_param.len());

        Ok(best_param.iter().copied().collect())
    }
}
