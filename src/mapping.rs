//! Inversion of element maps.
//!
//! Given a physical point `x` and an element map `X`, the reference coordinates `xi` with
//! `X(xi) = x` are found with Newton's method on the residual `X(xi) - x`. Elements with an affine
//! map are inverted in closed form from a precomputed inverse Jacobian.
//!
//! Non-convergence is not an error: it is reported through [`MappingResult::converged`] and the
//! caller decides whether to discard the result or fall back to a more expensive strategy.
use std::error::Error;

use log::trace;
use nalgebra::{DefaultAllocator, OMatrix, OPoint, OVector};

use crate::allocators::DimAllocator;
use crate::config::ParameterStore;
use crate::element::{is_contained, ReferenceMapping, ShapeType};
use crate::optimize::calculus::VectorFunctionBuilder;
use crate::optimize::newton::{newton_line_search, BacktrackingLineSearch, NewtonSettings, NoLineSearch};
use crate::SmallDim;

mod dim;

pub use dim::*;

/// Settings of the Newton iteration used to invert element maps.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MappingSettings {
    /// Exit tolerance on the Euclidean norm of the residual `X(xi) - x`.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 51,
        }
    }
}

impl MappingSettings {
    /// Reads `<section>/newton_tol` and `<section>/newton_max_iteration`, falling back to the
    /// defaults for absent keys.
    pub fn from_parameters(parameters: &ParameterStore, section: &str) -> Self {
        let defaults = Self::default();
        Self {
            tolerance: parameters.get_or(&format!("{}/newton_tol", section), defaults.tolerance),
            max_iterations: parameters.get_or(&format!("{}/newton_max_iteration", section), defaults.max_iterations),
        }
    }

    fn newton_settings(&self) -> NewtonSettings<f64> {
        NewtonSettings {
            max_iterations: Some(self.max_iterations),
            tolerance: self.tolerance,
        }
    }
}

/// Step control of the Newton iteration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NewtonStrategy {
    /// Full Newton steps.
    Plain,
    /// Newton steps damped by a backtracking line search, for strongly curved elements.
    LineSearch,
}

/// Outcome of mapping a physical point into an element.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingResult<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// `converged` and the collapsed coordinates lie in the reference domain.
    pub found: bool,
    /// Local cell the result refers to, if known.
    pub cell: Option<usize>,
    pub xi: OPoint<f64, D>,
    pub eta: OPoint<f64, D>,
    pub converged: bool,
    pub iterations: usize,
}

impl<D> MappingResult<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn from_reference_coords<M>(mapping: &M, xi: OPoint<f64, D>, converged: bool, iterations: usize) -> Self
    where
        M: ReferenceMapping<f64, Dim = D>,
    {
        let eta = mapping.collapse_coordinates(&xi);
        Self {
            found: converged && is_contained(eta.coords.as_slice(), 0.0),
            cell: None,
            xi,
            eta,
            converged,
            iterations,
        }
    }

    pub fn with_cell(mut self, cell: usize) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Whether the result lies in the reference domain up to `tol` in collapsed coordinates.
    ///
    /// Requires convergence.
    pub fn is_contained(&self, tol: f64) -> bool {
        self.converged && is_contained(self.eta.coords.as_slice(), tol)
    }
}

/// Solves `X(xi) = x` with full Newton steps from the mapping's initial iterate.
pub fn x_inverse<M>(mapping: &M, x: &OPoint<f64, M::Dim>, settings: &MappingSettings) -> MappingResult<M::Dim>
where
    M: ReferenceMapping<f64>,
    DefaultAllocator: DimAllocator<f64, M::Dim>,
{
    x_inverse_with_strategy(mapping, x, settings, NewtonStrategy::Plain)
}

/// Same as [`x_inverse`], with the step control selected by `strategy`.
pub fn x_inverse_with_strategy<M>(
    mapping: &M,
    x: &OPoint<f64, M::Dim>,
    settings: &MappingSettings,
    strategy: NewtonStrategy,
) -> MappingResult<M::Dim>
where
    M: ReferenceMapping<f64>,
    DefaultAllocator: DimAllocator<f64, M::Dim>,
{
    let residual = |xi: &OVector<f64, M::Dim>| -> OVector<f64, M::Dim> {
        mapping.map_reference_coords(&OPoint::from(xi.clone())) - x
    };
    let jacobian_solver =
        |xi: &OVector<f64, M::Dim>, rhs: &OVector<f64, M::Dim>| -> Result<OVector<f64, M::Dim>, Box<dyn Error>> {
            mapping
                .reference_jacobian(&OPoint::from(xi.clone()))
                .lu()
                .solve(rhs)
                .ok_or_else(|| Box::<dyn Error>::from("Singular reference Jacobian"))
        };
    let function = VectorFunctionBuilder::with_function(residual).with_jacobian_solver(jacobian_solver);

    let mut xi = mapping.initial_iterate().coords;
    let newton_settings = settings.newton_settings();
    let outcome = match strategy {
        NewtonStrategy::Plain => newton_line_search(function, &mut xi, newton_settings, &mut NoLineSearch),
        NewtonStrategy::LineSearch => {
            newton_line_search(function, &mut xi, newton_settings, &mut BacktrackingLineSearch)
        }
    };
    let (converged, iterations) = match outcome {
        Ok(outcome) => (outcome.converged, outcome.iterations),
        Err(err) => {
            trace!("Newton iteration aborted: {}", err);
            (false, settings.max_iterations)
        }
    };
    MappingResult::from_reference_coords(mapping, OPoint::from(xi), converged, iterations)
}

/// Closed-form inverse of an affine map `X(xi) = origin + J xi`, given `J^{-1}`.
pub fn affine_inverse<D>(
    origin: &OPoint<f64, D>,
    inverse_jacobian: &OMatrix<f64, D, D>,
    x: &OPoint<f64, D>,
) -> OPoint<f64, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    OPoint::from(inverse_jacobian * (x - origin))
}

/// Maps a point through a closed-form affine inverse and tests the result against the
/// reference domain of `shape`.
pub fn affine_mapping_result<D>(
    shape: ShapeType,
    origin: &OPoint<f64, D>,
    inverse_jacobian: &OMatrix<f64, D, D>,
    x: &OPoint<f64, D>,
) -> MappingResult<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let xi = affine_inverse(origin, inverse_jacobian, x);
    let mut eta = xi.clone();
    shape.collapse_coordinates(xi.coords.as_slice(), eta.coords.as_mut_slice());
    MappingResult {
        found: is_contained(eta.coords.as_slice(), 0.0),
        cell: None,
        xi,
        eta,
        converged: true,
        iterations: 1,
    }
}
