//! Euler–Maruyama integration on a manifold.
//!
//! Used by SDEs whose manifold has no closed-form random walk. Each step
//! draws a standard normal tangent vector at the current point, scales it by
//! the diffusion and `sqrt(|dt|)`, adds `drift * dt`, and maps the result
//! back onto the manifold with the exponential map:
//!
//! ```text
//! x_{k+1} = exp_{x_k}( f(x_k, t_k) dt + G(x_k, t_k) z_k sqrt(|dt|) )
//! ```
//!
//! A negative `dt` integrates a reverse-time process.

use crate::sde::{SdeCoefficients, Trajectory};
use num_traits::Float;
use riemannscore_core::{
    error::{TrainingError, TrainingResult},
    random::PrngKey,
    types::{Point, Scalar},
};

/// Configuration for the Euler–Maruyama integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerMaruyamaConfig {
    /// Number of fixed-size steps between the start and end time.
    pub num_steps: usize,
}

impl Default for EulerMaruyamaConfig {
    fn default() -> Self {
        Self { num_steps: 100 }
    }
}

impl EulerMaruyamaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of integration steps.
    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }
}

/// Fixed-step Euler–Maruyama integrator with exponential-map retraction.
#[derive(Debug, Clone)]
pub struct EulerMaruyama {
    config: EulerMaruyamaConfig,
}

impl EulerMaruyama {
    /// Creates an integrator.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `num_steps` is zero.
    pub fn new(config: EulerMaruyamaConfig) -> TrainingResult<Self> {
        if config.num_steps == 0 {
            return Err(TrainingError::invalid_configuration(
                "Euler-Maruyama requires at least one step",
                "num_steps",
                config.num_steps,
            ));
        }
        Ok(Self { config })
    }

    /// Returns the integrator configuration.
    pub fn config(&self) -> &EulerMaruyamaConfig {
        &self.config
    }

    /// Advances `x` from `t` to `t + dt`.
    pub fn step<T, S>(&self, sde: &S, key: PrngKey, x: &Point<T>, t: T, dt: T) -> TrainingResult<Point<T>>
    where
        T: Scalar,
        S: SdeCoefficients<T> + ?Sized,
    {
        let manifold = sde.manifold();
        let (drift, diffusion) = sde.coefficients(x, t)?;
        let z = manifold.random_normal_tangent(key, x)?;
        let noise = manifold.project_tangent(x, &diffusion.apply(&z))?;

        let tangent = drift * dt + noise * <T as Float>::sqrt(<T as Float>::abs(dt));
        Ok(manifold.exp_map(x, &tangent)?)
    }

    /// Integrates `sde` from `(x0, t_start)` to `t_end`, recording every state.
    ///
    /// The returned trajectory holds `num_steps + 1` states, the first being
    /// `x0`, and its last grid time is exactly `t_end`.
    pub fn integrate<T, S>(
        &self,
        sde: &S,
        key: PrngKey,
        x0: &Point<T>,
        t_start: T,
        t_end: T,
    ) -> TrainingResult<Trajectory<T>>
    where
        T: Scalar,
        S: SdeCoefficients<T> + ?Sized,
    {
        let n = self.config.num_steps;
        let dt = (t_end - t_start) / <T as Scalar>::from_usize(n);

        let mut states = Vec::with_capacity(n + 1);
        let mut times = Vec::with_capacity(n + 1);
        states.push(x0.clone());
        times.push(t_start);

        let mut x = x0.clone();
        for (i, step_key) in key.split_n(n).into_iter().enumerate() {
            let t = t_start + dt * <T as Scalar>::from_usize(i);
            x = self.step(sde, step_key, &x, t, dt)?;
            states.push(x.clone());
            times.push(if i + 1 == n { t_end } else { t + dt });
        }

        Ok(Trajectory { states, times })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sde::Diffusion;
    use approx::assert_relative_eq;
    use riemannscore_core::{
        manifold::Manifold,
        test_utils::TestEuclideanManifold,
        types::{DVector, TangentVector},
    };
    use riemannscore_manifolds::Sphere;

    /// dx = -x dt, no noise.
    #[derive(Debug)]
    struct Decay<M> {
        manifold: M,
    }

    impl<M: Manifold<f64>> SdeCoefficients<f64> for Decay<M> {
        fn manifold(&self) -> &dyn Manifold<f64> {
            &self.manifold
        }

        fn t0(&self) -> f64 {
            0.0
        }

        fn tf(&self) -> f64 {
            1.0
        }

        fn coefficients(&self, x: &Point<f64>, _t: f64) -> TrainingResult<(TangentVector<f64>, Diffusion<f64>)> {
            Ok((-x, Diffusion::Scalar(0.0)))
        }
    }

    /// Pure Brownian motion with unit diffusion.
    #[derive(Debug)]
    struct Unit<M> {
        manifold: M,
    }

    impl<M: Manifold<f64>> SdeCoefficients<f64> for Unit<M> {
        fn manifold(&self) -> &dyn Manifold<f64> {
            &self.manifold
        }

        fn t0(&self) -> f64 {
            0.0
        }

        fn tf(&self) -> f64 {
            1.0
        }

        fn coefficients(&self, x: &Point<f64>, _t: f64) -> TrainingResult<(TangentVector<f64>, Diffusion<f64>)> {
            Ok((DVector::zeros(x.len()), Diffusion::Scalar(1.0)))
        }
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = EulerMaruyamaConfig::new().with_num_steps(0);
        assert!(matches!(
            EulerMaruyama::new(config),
            Err(TrainingError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_deterministic_decay_matches_explicit_euler() {
        let sde = Decay { manifold: TestEuclideanManifold::new(1) };
        let solver = EulerMaruyama::new(EulerMaruyamaConfig::new().with_num_steps(1000)).unwrap();
        let x0 = DVector::from_vec(vec![1.0]);

        let trajectory = solver.integrate(&sde, PrngKey::new(0), &x0, 0.0, 1.0).unwrap();
        assert_eq!(trajectory.states.len(), 1001);
        assert_eq!(trajectory.times.len(), 1001);
        assert_eq!(*trajectory.times.last().unwrap(), 1.0);

        let expected = (1.0 - 1e-3_f64).powi(1000);
        assert_relative_eq!(trajectory.last().unwrap()[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_same_key_same_path() {
        let sde = Unit { manifold: TestEuclideanManifold::new(3) };
        let solver = EulerMaruyama::new(EulerMaruyamaConfig::default()).unwrap();
        let x0 = DVector::zeros(3);

        let a = solver.integrate(&sde, PrngKey::new(5), &x0, 0.0, 0.5).unwrap();
        let b = solver.integrate(&sde, PrngKey::new(5), &x0, 0.0, 0.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sphere_paths_stay_on_sphere() {
        let sde = Unit { manifold: Sphere::new(3).unwrap() };
        let solver = EulerMaruyama::new(EulerMaruyamaConfig::new().with_num_steps(50)).unwrap();
        let x0 = DVector::from_vec(vec![0.0, 0.0, 1.0]);

        let trajectory = solver.integrate(&sde, PrngKey::new(11), &x0, 0.0, 1.0).unwrap();
        for state in &trajectory.states {
            assert!(sde.manifold.is_point_on_manifold(state, 1e-10));
        }
    }

    #[test]
    fn test_reverse_time_grid() {
        let sde = Unit { manifold: TestEuclideanManifold::new(1) };
        let solver = EulerMaruyama::new(EulerMaruyamaConfig::new().with_num_steps(4)).unwrap();
        let x0 = DVector::zeros(1);

        let trajectory = solver.integrate(&sde, PrngKey::new(2), &x0, 1.0, 0.0).unwrap();
        assert_eq!(trajectory.times, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    }
}
