//! Secondary motion
//!
//! Damped springs that make selected bones trail their animated pose, for
//! jiggle on heads, tails, cloth strips and the like. The integrator is the
//! exact solution of a damped harmonic oscillator, so it stays stable for any
//! stiffness at a fixed time step.

mod dynamic_bone;
mod spring;

pub use dynamic_bone::{
    DEFAULT_TIME_STEP, DynamicBoneCorrector, DynamicBoneState, SpringConfig, SpringParams,
};
pub use spring::{SPRING_EPSILON, SpringCoefficients, SpringRegime, SpringValue, step};
