use crate::calculus::{DifferentiableVectorFunction, VectorFunction};
use itertools::iterate;
use log::trace;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OVector, Scalar};
use numeric_literals::replace_float_literals;
use particle_mesh_traits::Real;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NewtonSettings<T> {
    pub max_iterations: Option<usize>,
    pub tolerance: T,
}

/// The state Newton's method terminated in.
///
/// Running out of iterations is not an error: the caller inspects `converged` and decides
/// whether the final iterate is acceptable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonOutcome<T> {
    pub iterations: usize,
    pub converged: bool,
    pub residual_norm: T,
}

#[derive(Debug)]
pub enum NewtonError {
    /// The procedure failed because solving the Jacobian system failed.
    JacobianError(Box<dyn Error>),
    // The line search failed to produce a valid step direction.
    LineSearchError(Box<dyn Error>),
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            NewtonError::JacobianError(err) => {
                write!(f, "Failed to solve Jacobian system. Error: {}", err)
            }
            NewtonError::LineSearchError(err) => {
                write!(f, "Line search failed to produce valid step direction. Error: {}", err)
            }
        }
    }
}

impl Error for NewtonError {}

/// Attempts to solve the non-linear equation F(x) = 0 in place.
///
/// No heap allocation is performed. The solution is said to have converged if
/// ```|F(x)|_2 <= tolerance```. A non-finite residual terminates the iteration
/// without convergence.
pub fn newton<T, D, F>(
    function: F,
    x: &mut OVector<T, D>,
    settings: NewtonSettings<T>,
) -> Result<NewtonOutcome<T>, NewtonError>
where
    T: Real,
    D: DimName,
    F: DifferentiableVectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    newton_line_search(function, x, settings, &mut NoLineSearch {})
}

/// Same as `newton`, but allows specifying a line search.
pub fn newton_line_search<T, D, F>(
    mut function: F,
    x: &mut OVector<T, D>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, D, F>,
) -> Result<NewtonOutcome<T>, NewtonError>
where
    T: Real,
    D: DimName,
    F: DifferentiableVectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    let mut f = function.eval(x);
    let mut iter = 0;

    while f.norm() > settings.tolerance || !f.norm().is_finite() {
        let out_of_iterations = settings
            .max_iterations
            .map(|max_iter| iter == max_iter)
            .unwrap_or(false);
        if out_of_iterations || !f.norm().is_finite() {
            return Ok(NewtonOutcome {
                iterations: iter,
                converged: false,
                residual_norm: f.norm(),
            });
        }

        // Solve the system J dx = -f   <=>   J (-dx) = f
        let minus_dx = function
            .solve_jacobian_system(x, &f)
            .map_err(NewtonError::JacobianError)?;
        let dx = -minus_dx;

        let step_length = line_search
            .step(&mut function, &mut f, x, &dx)
            .map_err(NewtonError::LineSearchError)?;
        trace!("Newton step length at iter {}: {}", iter, step_length);
        iter += 1;
    }

    Ok(NewtonOutcome {
        iterations: iter,
        converged: true,
        residual_norm: f.norm(),
    })
}

pub trait LineSearch<T, D, F>
where
    T: Scalar,
    D: DimName,
    F: VectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    /// Moves `x` along `direction` and updates `f` to the function value at the new `x`.
    ///
    /// Returns the step length taken.
    fn step(
        &mut self,
        function: &mut F,
        f: &mut OVector<T, D>,
        x: &mut OVector<T, D>,
        direction: &OVector<T, D>,
    ) -> Result<T, Box<dyn Error>>;
}

/// Trivial implementation of line search. Equivalent to a single, full Newton step.
#[derive(Clone, Debug)]
pub struct NoLineSearch;

impl<T, D, F> LineSearch<T, D, F> for NoLineSearch
where
    T: Real,
    D: DimName,
    F: VectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    fn step(
        &mut self,
        function: &mut F,
        f: &mut OVector<T, D>,
        x: &mut OVector<T, D>,
        direction: &OVector<T, D>,
    ) -> Result<T, Box<dyn Error>> {
        *x += direction;
        *f = function.eval(x);
        Ok(T::one())
    }
}

/// Standard backtracking line search using the Armijo condition.
///
/// See Jorge & Nocedal (2006), Numerical Optimization, Chapter 3.1.
#[derive(Clone, Debug)]
pub struct BacktrackingLineSearch;

impl<T, D, F> LineSearch<T, D, F> for BacktrackingLineSearch
where
    T: Real,
    D: DimName,
    F: VectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn step(
        &mut self,
        function: &mut F,
        f: &mut OVector<T, D>,
        x: &mut OVector<T, D>,
        direction: &OVector<T, D>,
    ) -> Result<T, Box<dyn Error>> {
        // We seek to solve
        //  F(x) = 0
        // by minimizing
        //  g(x) = (1/2) || F(x) ||^2
        // and the sufficient decrease condition becomes
        //  g(x_k + alpha * p_k) <= (1 - c * alpha) * g(x_k)
        // under the assumption that p_k solves the Newton step equation.
        let c = 1e-4;
        let alpha_min = 1e-6;

        let p = direction;
        let g_initial = 0.5 * f.norm_squared();

        // Start out with some alphas that don't decrease too quickly, then
        // start decreasing them much faster if the first few iterations don't let us
        // take a step.
        let initial_alphas = [0.0, 1.0, 0.75, 0.5];
        let mut alpha_iter = initial_alphas
            .iter()
            .copied()
            .chain(iterate(0.25, |alpha_i| 0.25 * *alpha_i));

        let mut alpha_prev = alpha_iter.next().unwrap();
        let mut alpha = alpha_iter.next().unwrap();

        loop {
            // x^{k + 1} = x^k + (alpha^k - alpha^{k - 1}) * p
            let delta_alpha = alpha - alpha_prev;
            x.axpy(delta_alpha, p, T::one());
            *f = function.eval(x);

            let g = 0.5 * f.norm_squared();
            if g <= (1.0 - c * alpha) * g_initial {
                break;
            } else if alpha < alpha_min {
                return Err(Box::from(format!(
                    "Failed to produce valid step direction.\
                    Alpha {} is smaller than minimum allowed alpha {}.",
                    alpha, alpha_min
                )));
            } else {
                alpha_prev = alpha;
                alpha = alpha_iter.next().unwrap();
            }
        }

        Ok(alpha)
    }
}
