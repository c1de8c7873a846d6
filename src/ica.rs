//! Public entry point: `linear_ica(X, options) -> S`.

use uuid::Uuid;

use crate::backend::{weights_from_theta, NalgebraBackend};
use crate::density::{CpuCaps, Density, GeneralizedGaussianDensity, SejnowskiDensity};
use crate::error::{IcaError, Result};
use crate::matrix::{IcaScalar, RowMajor};
use crate::objective::IcaObjective;
use crate::options::{DensityFamily, IcaOptions};
use crate::optimizer::{ArgminOptimizer, Optimizer};
use crate::profile_scope;
use crate::whiten::whiten;

pub use crate::options::make_default_options;

fn validate_shape<T>(x: &RowMajor<T>) -> Result<()> {
    let channels = x.rows();
    let frames = x.cols();
    if channels == 0 {
        return Err(IcaError::InvalidChannelCount(channels));
    }
    if frames < 2 || frames < channels {
        return Err(IcaError::InsufficientFrames {
            min: channels.max(2),
            actual: frames,
        });
    }
    Ok(())
}

fn run_with_density<T, D>(
    x: &RowMajor<T>,
    options: &IcaOptions,
    density: D,
    run_id: Uuid,
) -> Result<RowMajor<T>>
where
    T: IcaScalar + nalgebra::RealField + argmin_math::ArgminFloat,
    D: Density<T>,
{
    let backend = NalgebraBackend;

    let whitened = {
        profile_scope!(format!("whiten[{}]", run_id));
        whiten(x, &backend, options.eps_whiten)?
    };

    let channels = x.rows();
    let eps_det = T::from_f64(options.eps_det).expect("eps_det fits in scalar type");
    let objective = IcaObjective::new(&whitened.x_white, density, &backend, eps_det);

    let mut theta0 = vec![T::zero(); objective.param_len()];
    for i in 0..channels {
        theta0[i * channels + i] = T::one();
    }

    let optimizer = ArgminOptimizer;
    let theta_star = {
        profile_scope!(format!("optimize[{}]", run_id));
        optimizer.minimize(&objective, theta0, options)?
    };

    let w_star = weights_from_theta(&theta_star, channels);
    let b_star = &theta_star[channels * channels..channels * channels + channels];

    let frames = x.cols();
    let mut s = RowMajor::zeros(channels, frames);
    for i in 0..channels {
        let w_row = w_star.row(i);
        let s_row = s.row_mut(i);
        for f in 0..frames {
            let mut acc = T::zero();
            for k in 0..channels {
                acc += w_row[k] * whitened.x_white.get(k, f);
            }
            s_row[f] = acc + b_star[i];
        }
    }

    log::info!("linear_ica[{}]: done, {} channels x {} frames", run_id, channels, frames);
    Ok(s)
}

/// Composes whitening, the objective functor and the optimizer driver:
/// `linear_ica(X, options) -> S` (spec section 4.5).
pub fn linear_ica<T>(x: &RowMajor<T>, options: &IcaOptions) -> Result<RowMajor<T>>
where
    T: IcaScalar + nalgebra::RealField + argmin_math::ArgminFloat,
{
    let run_id = Uuid::new_v4();
    log::info!(
        "linear_ica[{}]: starting, {} channels x {} frames, direction={:?}",
        run_id,
        x.rows(),
        x.cols(),
        options.direction
    );

    validate_shape(x)?;

    let caps = CpuCaps::detect();
    match options.density {
        DensityFamily::GeneralizedGaussian => {
            run_with_density(x, options, GeneralizedGaussianDensity::new(caps), run_id)
        }
        DensityFamily::Sejnowski => {
            run_with_density(x, options, SejnowskiDensity::new(caps), run_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_few_frames() {
        let x = RowMajor::from_rows(4, 3, vec![0.0f64; 12]);
        let options = make_default_options();
        let result = linear_ica(&x, &options);
        assert!(matches!(result, Err(IcaError::InsufficientFrames { .. })));
    }

    #[test]
    fn rejects_zero_channels() {
        let x: RowMajor<f64> = RowMajor::from_rows(0, 10, vec![]);
        let options = make_default_options();
        let result = linear_ica(&x, &options);
        assert!(matches!(result, Err(IcaError::InvalidChannelCount(0))));
    }
}
