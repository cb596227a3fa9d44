//! Closed-form damped harmonic oscillator
//!
//! For a fixed time step the exact solution of
//!
//! ```text
//! x'' + 2 * zeta * omega * x' + omega^2 * x = 0
//! ```
//!
//! is a linear map of `(x, v)`. [`SpringCoefficients::compute`] evaluates that
//! map once; [`step`] then advances any number of independent components with
//! four multiply-adds each.

use glam::{Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance for the no-motion and critically damped regimes
pub const SPRING_EPSILON: f32 = 0.0001;

/// Solution family selected by `angular_frequency` and `damping_ratio`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringRegime {
    /// Angular frequency below [`SPRING_EPSILON`]
    NoMotion,
    /// Damping ratio above `1 + SPRING_EPSILON`
    OverDamped,
    /// Damping ratio below `1 - SPRING_EPSILON`
    UnderDamped,
    /// Damping ratio within [`SPRING_EPSILON`] of 1
    CriticallyDamped,
}

impl SpringRegime {
    pub fn classify(angular_frequency: f32, damping_ratio: f32) -> Self {
        if angular_frequency < SPRING_EPSILON {
            Self::NoMotion
        } else if damping_ratio > 1.0 + SPRING_EPSILON {
            Self::OverDamped
        } else if damping_ratio < 1.0 - SPRING_EPSILON {
            Self::UnderDamped
        } else {
            Self::CriticallyDamped
        }
    }
}

/// The 2x2 state transition of a spring for one time step
///
/// ```text
/// [x'] = [pos_pos pos_vel] [x - eq]   [eq]
/// [v'] = [vel_pos vel_vel] [v     ] + [0 ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringCoefficients {
    pub pos_pos: f32,
    pub pos_vel: f32,
    pub vel_pos: f32,
    pub vel_vel: f32,
}

impl SpringCoefficients {
    /// Coefficients that leave position and velocity unchanged
    pub const IDENTITY: Self = Self {
        pos_pos: 1.0,
        pos_vel: 0.0,
        vel_pos: 0.0,
        vel_vel: 1.0,
    };

    /// Evaluate the spring for `time_step` seconds
    ///
    /// `angular_frequency` is in radians per second. A negative damping ratio
    /// is treated as zero.
    pub fn compute(time_step: f32, angular_frequency: f32, damping_ratio: f32) -> Self {
        let damping_ratio = damping_ratio.max(0.0);
        let omega = angular_frequency;
        let dt = time_step;

        match SpringRegime::classify(omega, damping_ratio) {
            SpringRegime::NoMotion => Self::IDENTITY,
            SpringRegime::OverDamped => {
                let za = -omega * damping_ratio;
                let zb = omega * (damping_ratio * damping_ratio - 1.0).sqrt();
                let z1 = za - zb;
                let z2 = za + zb;

                let e1 = (z1 * dt).exp();
                let e2 = (z2 * dt).exp();
                let inv_two_zb = 1.0 / (2.0 * zb);

                let e1_over_two_zb = e1 * inv_two_zb;
                let e2_over_two_zb = e2 * inv_two_zb;
                let z1e1_over_two_zb = z1 * e1_over_two_zb;
                let z2e2_over_two_zb = z2 * e2_over_two_zb;

                Self {
                    pos_pos: e1_over_two_zb * z2 - z2e2_over_two_zb + e2,
                    pos_vel: -e1_over_two_zb + e2_over_two_zb,
                    vel_pos: (z1e1_over_two_zb - z2e2_over_two_zb + e2) * z2,
                    vel_vel: -z1e1_over_two_zb + z2e2_over_two_zb,
                }
            }
            SpringRegime::UnderDamped => {
                let omega_zeta = omega * damping_ratio;
                let alpha = omega * (1.0 - damping_ratio * damping_ratio).sqrt();

                let exp_term = (-omega_zeta * dt).exp();
                let (sin_term, cos_term) = (alpha * dt).sin_cos();
                let inv_alpha = 1.0 / alpha;

                let exp_sin = exp_term * sin_term;
                let exp_cos = exp_term * cos_term;
                let exp_omega_zeta_sin_over_alpha = exp_term * omega_zeta * sin_term * inv_alpha;

                Self {
                    pos_pos: exp_cos + exp_omega_zeta_sin_over_alpha,
                    pos_vel: exp_sin * inv_alpha,
                    vel_pos: -exp_sin * alpha - omega_zeta * exp_omega_zeta_sin_over_alpha,
                    vel_vel: exp_cos - exp_omega_zeta_sin_over_alpha,
                }
            }
            SpringRegime::CriticallyDamped => {
                let exp_term = (-omega * dt).exp();
                let time_exp = dt * exp_term;
                let time_exp_freq = time_exp * omega;

                Self {
                    pos_pos: time_exp_freq + exp_term,
                    pos_vel: time_exp,
                    vel_pos: -omega * time_exp_freq,
                    vel_vel: -time_exp_freq + exp_term,
                }
            }
        }
    }

    /// Advance `(position, velocity)` one step toward `equilibrium`
    pub fn step<T: SpringValue>(&self, position: T, velocity: T, equilibrium: T) -> (T, T) {
        step(position, velocity, equilibrium, self)
    }
}

impl Default for SpringCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Values a spring can move: each component evolves independently
pub trait SpringValue:
    Copy
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<f32, Output = Self>
{
}

impl SpringValue for f32 {}
impl SpringValue for Vec2 {}
impl SpringValue for Vec3 {}

/// Advance `(position, velocity)` one step toward `equilibrium`
pub fn step<T: SpringValue>(
    position: T,
    velocity: T,
    equilibrium: T,
    coefficients: &SpringCoefficients,
) -> (T, T) {
    let displacement = position - equilibrium;
    let new_position = displacement * coefficients.pos_pos
        + velocity * coefficients.pos_vel
        + equilibrium;
    let new_velocity = displacement * coefficients.vel_pos + velocity * coefficients.vel_vel;
    (new_position, new_velocity)
}
