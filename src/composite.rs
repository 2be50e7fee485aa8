//! Detection of particle trajectories crossing mesh composites.
//!
//! Between two steps a particle moves along the straight segment from its previous to its
//! current position. [`CompositeIntersection`] finds, per particle, the crossing of that segment
//! with the facets of a set of composites that lies closest to the previous position.
//!
//! A typical step looks like
//!
//! ```text
//! intersection.pre_integration(&mut group);   // snapshot positions
//! /* move particles */
//! intersection.execute(&mut group, &IntersectionOutputs::default());
//! let hits = intersection.get_intersections(&group, &IntersectionOutputs::default());
//! ```
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use nalgebra::{DefaultAllocator, OPoint, OVector};
use rayon::prelude::*;

use crate::allocators::DimAllocator;
use crate::collection::DEFAULT_MAX_CACHED_CELLS;
use crate::config::ParameterStore;
use crate::hierarchy::MeshHierarchy;
use crate::mapping::MappingSettings;
use crate::mesh::Mesh;
use crate::particles::{ParticleGroup, Sym};
use crate::MeshDim;

mod collections;
mod intersection;

pub use collections::CompositeCollections;
pub use intersection::{closest_intersection, IntersectionCandidate};

/// Previous positions of particles, written by [`CompositeIntersection::pre_integration`].
pub const PREVIOUS_POSITION: &str = "NESO_COMP_INT_PREV_POS";
/// Default integer output: hit flag, composite id and facet id.
pub const OUTPUT_COMPOSITE: &str = "NESO_COMP_INT_OUTPUT_COMP";
/// Default real output: the intersection point.
pub const OUTPUT_POSITION: &str = "NESO_COMP_INT_OUTPUT_POS";

/// Slack on the reference domain when confirming a facet hit, in collapsed coordinates.
///
/// Crossings on an edge shared by two facets land on the boundary of both, where roundoff
/// would otherwise reject them from either side.
pub const DEFAULT_CONTAINED_TOL: f64 = 1e-10;

/// Number of components of the integer output dat.
pub const OUTPUT_COMPOSITE_NCOMP: usize = 3;

/// Names of the dats intersections are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionOutputs {
    /// Hit flag, composite id and facet id.
    pub composite: Sym<i64>,
    /// Intersection point.
    pub position: Sym<f64>,
}

impl Default for IntersectionOutputs {
    fn default() -> Self {
        Self {
            composite: Sym::new(OUTPUT_COMPOSITE),
            position: Sym::new(OUTPUT_POSITION),
        }
    }
}

/// Trajectory-composite intersection engine.
pub struct CompositeIntersection<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    mesh: Arc<Mesh<D>>,
    composite_ids: Vec<i64>,
    collections: CompositeCollections<D>,
    settings: MappingSettings,
    contained_tol: f64,
    previous_position: Sym<f64>,
}

impl<D> CompositeIntersection<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// Prepares intersection tests against the facets of `composite_ids`.
    ///
    /// Reads `CompositeIntersection/newton_tol`, `CompositeIntersection/newton_max_iteration`,
    /// `CompositeIntersection/contained_tol` and `CompositeIntersection/max_cached_cells` from
    /// `parameters`.
    pub fn new(
        mesh: Arc<Mesh<D>>,
        hierarchy: MeshHierarchy<D>,
        composite_ids: &[i64],
        parameters: &ParameterStore,
    ) -> Self {
        let settings = MappingSettings::from_parameters(parameters, "CompositeIntersection");
        let contained_tol = parameters.get_or("CompositeIntersection/contained_tol", DEFAULT_CONTAINED_TOL);
        let capacity = parameters.get_or("CompositeIntersection/max_cached_cells", DEFAULT_MAX_CACHED_CELLS);
        let collections = CompositeCollections::new(&mesh, hierarchy, composite_ids, capacity);
        let mut composite_ids = composite_ids.to_vec();
        composite_ids.sort_unstable();
        composite_ids.dedup();
        Self {
            mesh,
            composite_ids,
            collections,
            settings,
            contained_tol,
            previous_position: Sym::new(PREVIOUS_POSITION),
        }
    }

    pub fn composite_ids(&self) -> &[i64] {
        &self.composite_ids
    }

    pub fn settings(&self) -> &MappingSettings {
        &self.settings
    }

    /// Slack on the reference domain when confirming facet hits.
    pub fn contained_tol(&self) -> f64 {
        self.contained_tol
    }

    pub fn collections(&self) -> &CompositeCollections<D> {
        &self.collections
    }

    /// Copies the current particle positions into the previous-position dat, creating it when
    /// absent. Must be called before the particles are moved.
    pub fn pre_integration(&self, group: &mut ParticleGroup<D>) {
        let ndim = D::dim();
        group.add_dat(&self.previous_position, ndim);
        let positions: Vec<OPoint<f64, D>> = group.positions().to_vec();
        let previous = group.require_dat_mut(&self.previous_position, ndim);
        for (i, x) in positions.iter().enumerate() {
            previous.get_mut(i)[..ndim].copy_from_slice(x.coords.as_slice());
        }
    }

    fn previous_positions(&self, group: &ParticleGroup<D>) -> Vec<OPoint<f64, D>> {
        assert!(
            group.contains_dat(&self.previous_position),
            "pre_integration must be called before intersections are detected."
        );
        let previous = group.require_dat(&self.previous_position, D::dim());
        (0..group.len())
            .map(|i| OPoint::from(OVector::<f64, D>::from_column_slice(&previous.get(i)[..D::dim()])))
            .collect()
    }

    /// Index cells of the axis-aligned cell boxes spanned by the previous and current position of
    /// each particle.
    ///
    /// # Panics
    ///
    /// Panics if [`pre_integration`](Self::pre_integration) has not been called for the group.
    pub fn find_cells(&self, group: &ParticleGroup<D>) -> BTreeSet<usize> {
        let previous = self.previous_positions(group);
        self.find_cells_for(group, &previous).0
    }

    /// Cells per particle and the union of all of them.
    fn find_cells_for(
        &self,
        group: &ParticleGroup<D>,
        previous: &[OPoint<f64, D>],
    ) -> (BTreeSet<usize>, Vec<Vec<usize>>) {
        let hierarchy = self.collections.hierarchy();
        let largest_box = AtomicUsize::new(0);
        let bounds_min: Vec<AtomicI64> = (0..D::dim()).map(|_| AtomicI64::new(i64::MAX)).collect();
        let bounds_max: Vec<AtomicI64> = (0..D::dim()).map(|_| AtomicI64::new(i64::MIN)).collect();

        let per_particle: Vec<Vec<usize>> = (0..group.len())
            .into_par_iter()
            .map(|i| {
                let Some(cart_box) = hierarchy.cart_box_for_points([&previous[i], group.position(i)]) else {
                    return Vec::new();
                };
                largest_box.fetch_max(cart_box.num_cells(), Ordering::Relaxed);
                for d in 0..D::dim() {
                    bounds_min[d].fetch_min(cart_box.start[d] as i64, Ordering::Relaxed);
                    bounds_max[d].fetch_max(cart_box.end[d] as i64 - 1, Ordering::Relaxed);
                }
                hierarchy.cells_in_cart_box(&cart_box)
            })
            .collect();

        let cells: BTreeSet<usize> = per_particle.iter().flatten().copied().collect();
        debug!(
            "Trajectories span {} index cells, at most {} per particle, cartesian bounds {:?} to {:?}",
            cells.len(),
            largest_box.load(Ordering::Relaxed),
            bounds_min.iter().map(|b| b.load(Ordering::Relaxed)).collect::<Vec<_>>(),
            bounds_max.iter().map(|b| b.load(Ordering::Relaxed)).collect::<Vec<_>>()
        );
        (cells, per_particle)
    }

    /// Detects intersections and writes them to `outputs`.
    ///
    /// Particles without an intersection get a cleared hit flag.
    ///
    /// # Panics
    ///
    /// Panics if the previous positions are missing, or if an output dat is missing or has too
    /// few components.
    pub fn find_intersections(&mut self, group: &mut ParticleGroup<D>, outputs: &IntersectionOutputs) {
        let ndim = D::dim();
        group.require_dat(&outputs.composite, OUTPUT_COMPOSITE_NCOMP);
        group.require_dat(&outputs.position, ndim);
        let previous = self.previous_positions(group);

        let (mut cells, per_particle) = self.find_cells_for(group, &previous);
        self.collections.collect_geometry(&self.mesh, &mut cells);

        let collections = &self.collections;
        let settings = &self.settings;
        let contained_tol = self.contained_tol;
        let hits: Vec<Option<IntersectionCandidate<D>>> = (0..group.len())
            .into_par_iter()
            .map(|i| {
                let current = group.position(i);
                closest_intersection(collections, &per_particle[i], &previous[i], current, settings, contained_tol)
            })
            .collect();

        let num_hits = hits.iter().flatten().count();
        debug!("{} of {} trajectories cross a composite", num_hits, group.len());

        let native_facet_ids: Vec<Option<i64>> = hits
            .iter()
            .map(|hit| hit.as_ref().map(|hit| self.mesh.facets()[hit.facet].native_id))
            .collect();
        let composite = group.require_dat_mut(&outputs.composite, OUTPUT_COMPOSITE_NCOMP);
        for (i, (hit, facet_id)) in hits.iter().zip(&native_facet_ids).enumerate() {
            let entry = composite.get_mut(i);
            match (hit, facet_id) {
                (Some(hit), Some(facet_id)) => {
                    entry[0] = 1;
                    entry[1] = hit.composite_id;
                    entry[2] = *facet_id;
                }
                _ => entry[0] = 0,
            }
        }
        let position = group.require_dat_mut(&outputs.position, ndim);
        for (i, hit) in hits.iter().enumerate() {
            if let Some(hit) = hit {
                position.get_mut(i)[..ndim].copy_from_slice(hit.point.coords.as_slice());
            }
        }
    }

    /// Detects intersections, creating the default output dats when they are absent.
    ///
    /// Output dats with other names must already exist.
    pub fn execute(&mut self, group: &mut ParticleGroup<D>, outputs: &IntersectionOutputs) {
        if outputs.composite.name() == OUTPUT_COMPOSITE {
            group.add_dat(&outputs.composite, OUTPUT_COMPOSITE_NCOMP);
        }
        if outputs.position.name() == OUTPUT_POSITION {
            group.add_dat(&outputs.position, D::dim());
        }
        self.find_intersections(group, outputs);
    }

    /// Particles whose last detected trajectory hit each composite, in ascending order.
    ///
    /// Every composite the engine was created for has an entry, possibly empty.
    pub fn get_intersections(
        &self,
        group: &ParticleGroup<D>,
        outputs: &IntersectionOutputs,
    ) -> BTreeMap<i64, Vec<usize>> {
        let mut hits: BTreeMap<i64, Vec<usize>> = self.composite_ids.iter().map(|&id| (id, Vec::new())).collect();
        if let Some(composite) = group.dat(&outputs.composite) {
            for i in 0..group.len() {
                let entry = composite.get(i);
                if entry[0] != 0 {
                    hits.entry(entry[1]).or_default().push(i);
                }
            }
        }
        hits
    }

    /// Drops all cached facet geometry.
    pub fn free(&mut self) {
        self.collections.free();
    }
}
