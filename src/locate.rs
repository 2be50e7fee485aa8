//! Point location of particles in a mesh.
//!
//! [`MapParticles`] assigns each particle the mesh cell containing its position together with
//! the reference coordinates of the position in that cell. Candidate cells come from the index
//! cell the particle lies in and are tried by a sequence of increasingly general stages:
//!
//! 1. [`LocateStage::Regular`]: cells with an affine map, inverted in closed form.
//! 2. [`LocateStage::Deformed`]: linear cells with a non-affine map, inverted with Newton's method.
//! 3. [`LocateStage::Generic`]: curved cells, inverted with a damped Newton iteration.
//! 4. [`LocateStage::Host`]: an exhaustive scan over all cells, only in the [`LocatePass::Final`]
//!    pass.
//!
//! A particle is only passed on to the next stage if no earlier stage mapped it.
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use log::{debug, error};
use nalgebra::{DefaultAllocator, OPoint};
use rayon::prelude::*;

use crate::allocators::DimAllocator;
use crate::collection::{ElementCollection, DEFAULT_MAX_CACHED_CELLS};
use crate::config::ParameterStore;
use crate::hierarchy::MeshHierarchy;
use crate::mapping::{MappingResult, MappingSettings};
use crate::mesh::Mesh;
use crate::packed::PackedStore;
use crate::particles::{ParticleGroup, Sym, REFERENCE_POSITIONS};
use crate::MeshDim;

mod host;
mod newton;
mod regular;

pub use host::HostSearch;
pub use newton::NewtonStage;
pub use regular::RegularStage;

/// Whether unmapped particles are acceptable after a call to [`MapParticles::map`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LocatePass {
    /// Particles may still be moved between processes, unmapped particles are left as they are.
    Initial,
    /// Every particle must be mapped. Runs the host scan and fails for remaining particles.
    Final,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocateStage {
    Regular,
    Deformed,
    Generic,
    Host,
}

/// A stage that maps points using the packed geometry of their index cell.
pub trait CellStage<D>: Sync
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn stage(&self) -> LocateStage;

    /// Tries the candidates in `store` in order and returns the first containing `x`.
    fn map_point(&self, store: &PackedStore<D>, x: &OPoint<f64, D>) -> Option<MappingResult<D>>;
}

/// Number of particles mapped by each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateReport {
    pub regular: usize,
    pub deformed: usize,
    pub generic: usize,
    pub host: usize,
    /// Particles that remain unmapped. Always empty after a successful final pass.
    pub unmapped: Vec<usize>,
}

impl LocateReport {
    fn record(&mut self, stage: LocateStage, count: usize) {
        match stage {
            LocateStage::Regular => self.regular += count,
            LocateStage::Deformed => self.deformed += count,
            LocateStage::Generic => self.generic += count,
            LocateStage::Host => self.host += count,
        }
    }

    pub fn num_mapped(&self) -> usize {
        self.regular + self.deformed + self.generic + self.host
    }
}

/// Diagnostic record of a particle that could not be mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmappedParticle {
    pub index: usize,
    pub position: Vec<f64>,
    /// Cell assigned to the particle before location, if any.
    pub cell: Option<usize>,
    pub rank: i64,
}

impl Display for UnmappedParticle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "particle {} at {:?} (previous cell {:?}, rank {})",
            self.index, self.position, self.cell, self.rank
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateError {
    /// Particles that no stage could map in the final pass.
    Unmapped(Vec<UnmappedParticle>),
}

impl Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::Unmapped(particles) => {
                write!(f, "{} particles could not be mapped into the mesh", particles.len())
            }
        }
    }
}

impl Error for LocateError {}

/// Settings of the point-location dispatcher.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LocateSettings {
    pub newton: MappingSettings,
    /// Route every cell through the generic stage.
    pub all_generic_newton: bool,
    /// Containment slack of the host scan, in collapsed coordinates.
    pub host_contained_tol: f64,
    pub max_cached_cells: usize,
}

impl Default for LocateSettings {
    fn default() -> Self {
        Self {
            newton: MappingSettings::default(),
            all_generic_newton: false,
            host_contained_tol: 1e-10,
            max_cached_cells: DEFAULT_MAX_CACHED_CELLS,
        }
    }
}

impl LocateSettings {
    pub fn from_parameters(parameters: &ParameterStore) -> Self {
        let defaults = Self::default();
        Self {
            newton: MappingSettings::from_parameters(parameters, "MapParticlesNewton"),
            all_generic_newton: parameters.get_or("MapParticles/all_generic_newton", defaults.all_generic_newton),
            host_contained_tol: parameters.get_or("MapParticlesHost/contained_tol", defaults.host_contained_tol),
            max_cached_cells: parameters.get_or("MapParticles/max_cached_cells", defaults.max_cached_cells),
        }
    }
}

/// The point-location dispatcher.
pub struct MapParticles<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    mesh: Arc<Mesh<D>>,
    collection: ElementCollection<D>,
    settings: LocateSettings,
    reference_positions: Sym<f64>,
}

impl<D> MapParticles<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new(mesh: Arc<Mesh<D>>, hierarchy: MeshHierarchy<D>, parameters: &ParameterStore) -> Self {
        let settings = LocateSettings::from_parameters(parameters);
        Self::with_settings(mesh, hierarchy, settings)
    }

    pub fn with_settings(mesh: Arc<Mesh<D>>, hierarchy: MeshHierarchy<D>, settings: LocateSettings) -> Self {
        let collection = ElementCollection::new(
            &mesh,
            hierarchy,
            settings.all_generic_newton,
            settings.max_cached_cells,
        );
        Self {
            mesh,
            collection,
            settings,
            reference_positions: Sym::new(REFERENCE_POSITIONS),
        }
    }

    pub fn settings(&self) -> &LocateSettings {
        &self.settings
    }

    pub fn hierarchy(&self) -> &MeshHierarchy<D> {
        self.collection.hierarchy()
    }

    pub fn collection(&self) -> &ElementCollection<D> {
        &self.collection
    }

    /// The stages that operate on packed index-cell geometry, in the order they are tried.
    fn cell_stages(&self) -> Vec<Box<dyn CellStage<D>>> {
        let newton = self.settings.newton;
        let mut stages: Vec<Box<dyn CellStage<D>>> = Vec::new();
        if !self.settings.all_generic_newton {
            stages.push(Box::new(RegularStage));
            stages.push(Box::new(NewtonStage::deformed(newton)));
        }
        stages.push(Box::new(NewtonStage::generic(newton, self.settings.all_generic_newton)));
        stages
    }

    /// Maps every particle of the group to the cell containing it.
    ///
    /// Writes the cell, the rank record and the reference positions of every particle. Particles
    /// that are not mapped get no cell and a cleared mapped flag.
    pub fn map(&mut self, group: &mut ParticleGroup<D>, pass: LocatePass) -> Result<LocateReport, LocateError> {
        let previous_cells: Vec<Option<usize>> = (0..group.len()).map(|i| group.cell(i)).collect();
        let index_cells: Vec<Option<usize>> = group
            .positions()
            .par_iter()
            .map(|x| self.hierarchy().try_cell_for_point(x))
            .collect();
        let mut requested: BTreeSet<usize> = index_cells.iter().flatten().copied().collect();
        self.collection.collect_geometry(&self.mesh, &mut requested);

        let mut results: Vec<Option<MappingResult<D>>> = vec![None; group.len()];
        let mut report = LocateReport::default();
        for stage in self.cell_stages() {
            let pending: Vec<usize> = (0..group.len()).filter(|&i| results[i].is_none()).collect();
            let collection = &self.collection;
            let mapped: Vec<(usize, MappingResult<D>)> = pending
                .par_iter()
                .filter_map(|&i| {
                    let store = collection.get(index_cells[i]?)?;
                    stage.map_point(store, group.position(i)).map(|result| (i, result))
                })
                .collect();
            report.record(stage.stage(), mapped.len());
            for (i, result) in mapped {
                results[i] = Some(result);
            }
        }

        if pass == LocatePass::Final {
            let host = HostSearch::new(&self.mesh, self.settings.newton, self.settings.host_contained_tol);
            let pending: Vec<usize> = (0..group.len()).filter(|&i| results[i].is_none()).collect();
            let mapped: Vec<(usize, MappingResult<D>)> = pending
                .par_iter()
                .filter_map(|&i| host.map_point(group.position(i)).map(|result| (i, result)))
                .collect();
            report.record(LocateStage::Host, mapped.len());
            for (i, result) in mapped {
                results[i] = Some(result);
            }
        }

        self.write_results(group, &results);
        report.unmapped = (0..group.len()).filter(|&i| results[i].is_none()).collect();
        debug!(
            "Located {} particles: {} regular, {} deformed, {} generic, {} host, {} unmapped",
            group.len(),
            report.regular,
            report.deformed,
            report.generic,
            report.host,
            report.unmapped.len()
        );

        if pass == LocatePass::Final && !report.unmapped.is_empty() {
            let particles: Vec<UnmappedParticle> = report
                .unmapped
                .iter()
                .map(|&i| UnmappedParticle {
                    index: i,
                    position: group.position(i).coords.iter().copied().collect(),
                    cell: previous_cells[i],
                    rank: group.rank(i),
                })
                .collect();
            for particle in &particles {
                error!("Failed to map {}", particle);
            }
            return Err(LocateError::Unmapped(particles));
        }
        Ok(report)
    }

    fn write_results(&self, group: &mut ParticleGroup<D>, results: &[Option<MappingResult<D>>]) {
        let ndim = D::dim();
        group.add_dat(&self.reference_positions, ndim);
        for (i, result) in results.iter().enumerate() {
            match result.as_ref().and_then(|result| Some((result.cell?, result))) {
                Some((cell, result)) => {
                    group.set_cell(i, Some(cell));
                    group.set_rank(i, self.mesh.cells()[cell].rank as i64, true);
                    let reference = group.require_dat_mut(&self.reference_positions, ndim).get_mut(i);
                    reference[..ndim].copy_from_slice(result.xi.coords.as_slice());
                }
                None => {
                    group.set_cell(i, None);
                    let rank = group.rank(i);
                    group.set_rank(i, rank, false);
                }
            }
        }
    }

    /// Drops all cached geometry.
    pub fn free(&mut self) {
        self.collection.free();
    }
}
