/// Calculus helper traits and numerical differentiation
pub mod calculus;
/// Implementations of the Newton method with different line search strategies
pub mod newton;
