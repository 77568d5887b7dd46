//! Sphere manifold S^{n-1} = {x in R^n : ||x|| = 1}
//!
//! The unit sphere is the prototypical compact manifold for score-based
//! generative modelling: it carries a uniform distribution (the limiting
//! distribution of Brownian motion) and a heat kernel expressible as a
//! series of spherical harmonics, but no closed-form random-walk sampler.
//! Marginal sampling therefore goes through numerical SDE integration.

use riemannscore_core::{
    error::{ManifoldError, Result},
    manifold::{Manifold, RandomWalk},
    random::{standard_normal_vector, PrngKey},
    types::{constants, Point, Scalar, TangentVector},
};
use num_traits::Float;

/// Number of harmonic degrees kept in the heat-kernel series.
const DEFAULT_SERIES_TERMS: usize = 256;

/// Below this elapsed time the series is replaced by the Varadhan asymptotic.
const DEFAULT_SHORT_TIME: f64 = 1e-2;

/// Series densities below this fraction of the uniform density are treated
/// as round-off and replaced by the Varadhan asymptotic.
const SERIES_FLOOR: f64 = 1e-8;

/// The unit sphere S^{n-1} in R^n.
///
/// # Mathematical Properties
///
/// - **Dimension**: n-1 (for sphere in R^n)
/// - **Tangent space**: T_x S^{n-1} = {v in R^n : x^T v = 0}
/// - **Riemannian metric**: Inherited from Euclidean space (canonical metric)
/// - **Exponential map**: exp_x(v) = cos(||v||) x + sin(||v||) v/||v||
/// - **Logarithmic map**: log_x(y) = θ (y - cos(θ)x) / sin(θ), θ = arccos(x^T y)
/// - **Volume**: |S^{n-1}| = 2π^{n/2} / Γ(n/2)
///
/// # Heat kernel
///
/// With m = n-1 and α = (m-1)/2 the heat kernel of ½Δ is
///
/// p_s(x₀, x) = |S^{n-1}|⁻¹ Σ_l exp(-l(l+m-1)s/2) (2l+m-1)/(m-1) C_l^α(⟨x₀, x⟩)
///
/// where C_l^α are Gegenbauer polynomials (Chebyshev polynomials on the
/// circle). The series is truncated; for short times, or where the truncated
/// series drops to round-off, the Varadhan asymptotic
/// log p ≈ -d²/(2s) - (m/2) log(2πs) is used instead. Both are
/// approximations of the true kernel in those regimes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// Ambient dimension (n)
    ambient_dim: usize,
    /// Harmonic degrees kept in the series
    series_terms: usize,
    /// Elapsed time below which only the Varadhan asymptotic is used
    short_time: f64,
}

impl Sphere {
    /// Creates a new sphere S^{n-1} embedded in R^n.
    ///
    /// # Errors
    /// Returns an error if `ambient_dim` < 2
    pub fn new(ambient_dim: usize) -> Result<Self> {
        if ambient_dim < 2 {
            return Err(ManifoldError::invalid_point(
                "Sphere requires ambient dimension >= 2",
            ));
        }
        Ok(Self {
            ambient_dim,
            series_terms: DEFAULT_SERIES_TERMS,
            short_time: DEFAULT_SHORT_TIME,
        })
    }

    /// Sets the number of harmonic degrees kept in the heat-kernel series.
    pub fn with_series_terms(mut self, terms: usize) -> Self {
        self.series_terms = terms.max(2);
        self
    }

    /// Sets the elapsed time below which the Varadhan asymptotic is used.
    pub fn with_short_time_threshold(mut self, threshold: f64) -> Self {
        self.short_time = threshold;
        self
    }

    /// Surface area of S^{n-1}, via |S^{n-1}| = 2π/(n-2) |S^{n-3}|.
    fn volume(&self) -> f64 {
        let tau = std::f64::consts::TAU;
        let (mut area, mut n) = if self.ambient_dim % 2 == 0 {
            (tau, 2)
        } else {
            (2.0, 1)
        };
        while n < self.ambient_dim {
            n += 2;
            area *= tau / (n - 2) as f64;
        }
        area
    }

    /// Truncated series for the density and its derivative in cos θ.
    fn heat_kernel_series<T: Scalar>(&self, cos_theta: T, s: T) -> (T, T) {
        let m = self.ambient_dim - 1;
        let c = cos_theta;
        let two = <T as Scalar>::from_f64(2.0);
        let half = <T as Scalar>::from_f64(0.5);
        let inv_volume = <T as Scalar>::from_f64(1.0 / self.volume());

        let mut density = T::one();
        let mut derivative = T::zero();

        if m == 1 {
            // Chebyshev: T_l(c) = cos(lθ), T_l'(c) = l U_{l-1}(c)
            let (mut t_prev, mut t_curr) = (T::one(), c);
            let (mut u_prev, mut u_curr) = (T::zero(), T::one());
            for l in 1..self.series_terms {
                let lf = <T as Scalar>::from_usize(l);
                let weight = <T as Float>::exp(-half * lf * lf * s);
                density += two * weight * t_curr;
                derivative += two * weight * lf * u_curr;

                let t_next = two * c * t_curr - t_prev;
                t_prev = t_curr;
                t_curr = t_next;
                let u_next = two * c * u_curr - u_prev;
                u_prev = u_curr;
                u_curr = u_next;
            }
        } else {
            // Gegenbauer C_l^α with α = (m-1)/2; d/dc C_l^α = 2α C_{l-1}^{α+1}
            let mf = <T as Scalar>::from_usize(m);
            let alpha = half * (mf - T::one());
            let beta = alpha + T::one();
            let (mut c_prev, mut c_curr) = (T::one(), two * alpha * c);
            let (mut d_prev, mut d_curr) = (T::zero(), T::one());
            for l in 1..self.series_terms {
                let lf = <T as Scalar>::from_usize(l);
                let weight = <T as Float>::exp(-half * lf * (lf + mf - T::one()) * s);
                let degree_factor = (two * lf + mf - T::one()) / (mf - T::one());
                density += weight * degree_factor * c_curr;
                derivative += weight * (two * lf + mf - T::one()) * d_curr;

                let next_l = lf + T::one();
                let c_next = (two * c * (next_l + alpha - T::one()) * c_curr
                    - (next_l + two * alpha - two) * c_prev)
                    / next_l;
                c_prev = c_curr;
                c_curr = c_next;
                // d_curr holds C_{l-1}^{β}; advance it to C_l^{β}
                let d_next = if l == 1 {
                    two * beta * c
                } else {
                    (two * c * (lf + beta - T::one()) * d_curr - (lf + two * beta - two) * d_prev) / lf
                };
                d_prev = d_curr;
                d_curr = d_next;
            }
        }

        (density * inv_volume, derivative * inv_volume)
    }

    /// Whether the truncated series is trusted at elapsed time `s`.
    fn use_series<T: Scalar>(&self, s: T) -> bool {
        s >= <T as Scalar>::from_f64(self.short_time)
    }

    fn series_floor<T: Scalar>(&self) -> T {
        <T as Scalar>::from_f64(SERIES_FLOOR / self.volume())
    }

    fn varadhan_log_density<T: Scalar>(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<T> {
        let half = <T as Scalar>::from_f64(0.5);
        let m = <T as Scalar>::from_usize(self.ambient_dim - 1);
        let dist = self.distance(x0, x)?;
        Ok(-half * dist * dist / s - half * m * <T as Float>::ln(constants::tau::<T>() * s))
    }

    fn clamped_cos<T: Scalar>(x0: &Point<T>, x: &Point<T>) -> T {
        <T as Float>::max(<T as Float>::min(x0.dot(x), T::one()), -T::one())
    }

    fn check_dims<T: Scalar>(&self, point: &Point<T>) -> Result<()> {
        if point.len() != self.ambient_dim {
            return Err(ManifoldError::dimension_mismatch(self.ambient_dim, point.len()));
        }
        Ok(())
    }

    fn check_elapsed<T: Scalar>(s: T) -> Result<()> {
        if !<T as Float>::is_finite(s) || s <= T::zero() {
            return Err(ManifoldError::numerical_error(format!(
                "heat kernel needs a positive finite elapsed time, got {s}"
            )));
        }
        Ok(())
    }
}

impl<T: Scalar> Manifold<T> for Sphere {
    fn name(&self) -> &str {
        "Sphere"
    }

    fn dimension(&self) -> usize {
        self.ambient_dim - 1
    }

    fn ambient_dimension(&self) -> usize {
        self.ambient_dim
    }

    fn is_point_on_manifold(&self, point: &Point<T>, tolerance: T) -> bool {
        if point.len() != self.ambient_dim {
            return false;
        }
        <T as Float>::abs(point.norm_squared() - T::one()) < tolerance
    }

    fn project_tangent(&self, point: &Point<T>, vector: &TangentVector<T>) -> Result<TangentVector<T>> {
        self.check_dims(point)?;
        self.check_dims(vector)?;
        // v - <v,x>x
        let inner = point.dot(vector);
        Ok(vector - point * inner)
    }

    fn inner_product(&self, _point: &Point<T>, u: &TangentVector<T>, v: &TangentVector<T>) -> Result<T> {
        Ok(u.dot(v))
    }

    fn exp_map(&self, point: &Point<T>, tangent: &TangentVector<T>) -> Result<Point<T>> {
        if tangent.iter().any(|v| !<T as Float>::is_finite(*v)) {
            return Err(ManifoldError::invalid_tangent("tangent vector has non-finite entries"));
        }
        let tangent_norm = tangent.norm();
        if tangent_norm < T::EPSILON {
            return Ok(point.clone());
        }
        let cos_norm = <T as Float>::cos(tangent_norm);
        let sin_norm = <T as Float>::sin(tangent_norm);
        let moved = point * cos_norm + tangent * (sin_norm / tangent_norm);
        // Renormalize to stop round-off drift off the sphere
        let norm = moved.norm();
        Ok(moved / norm)
    }

    fn log_map(&self, point: &Point<T>, other: &Point<T>) -> Result<TangentVector<T>> {
        let cos_theta = Self::clamped_cos(point, other);
        let theta = <T as Float>::acos(cos_theta);

        if theta < T::EPSILON {
            return Ok(TangentVector::zeros(point.len()));
        }

        let sin_theta = <T as Float>::sin(theta);
        if sin_theta < <T as Scalar>::from_f64(1e3) * T::EPSILON {
            // Antipodal: every direction is a minimizing geodesic; pick the
            // coordinate axis least aligned with `point`.
            let axis = point
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    <T as Float>::abs(*a.1)
                        .partial_cmp(&<T as Float>::abs(*b.1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            let mut direction = TangentVector::zeros(point.len());
            direction[axis] = T::one();
            let direction = &direction - point * point[axis];
            let norm = direction.norm();
            return Ok(direction * (constants::pi::<T>() / norm));
        }

        Ok((other - point * cos_theta) * (theta / sin_theta))
    }

    fn random_walk(&self, _key: PrngKey, _point: &Point<T>, _s: T) -> Result<RandomWalk<T>> {
        Ok(RandomWalk::IntegrationRequired)
    }

    fn log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<T> {
        self.check_dims(x0)?;
        self.check_dims(x)?;
        Self::check_elapsed(s)?;
        if self.use_series(s) {
            let (density, _) = self.heat_kernel_series(Self::clamped_cos(x0, x), s);
            if density > self.series_floor() {
                return Ok(<T as Float>::ln(density));
            }
        }
        self.varadhan_log_density(x0, x, s)
    }

    fn grad_log_heat_kernel(&self, x0: &Point<T>, x: &Point<T>, s: T) -> Result<TangentVector<T>> {
        self.check_dims(x0)?;
        self.check_dims(x)?;
        Self::check_elapsed(s)?;
        if self.use_series(s) {
            let cos_theta = Self::clamped_cos(x0, x);
            let (density, derivative) = self.heat_kernel_series(cos_theta, s);
            if density > self.series_floor() {
                // ∇ₓ⟨x₀, x⟩ = x₀ - ⟨x₀, x⟩x
                let direction = x0 - x * cos_theta;
                return Ok(direction * (derivative / density));
            }
        }
        // ∇ₓ(-d(x₀, x)²/2s) = log_x(x₀)/s
        Ok(self.log_map(x, x0)? / s)
    }

    fn random_uniform(&self, key: PrngKey, n_samples: usize) -> Result<Vec<Point<T>>> {
        let mut rng = key.into_rng();
        Ok((0..n_samples)
            .map(|_| {
                let gaussian: Point<T> = standard_normal_vector(&mut rng, self.ambient_dim);
                let norm = gaussian.norm();
                if norm < T::EPSILON {
                    let mut pole = Point::zeros(self.ambient_dim);
                    pole[0] = T::one();
                    pole
                } else {
                    gaussian / norm
                }
            })
            .collect())
    }

    fn log_volume(&self) -> Result<T> {
        Ok(<T as Scalar>::from_f64(self.volume().ln()))
    }
}
