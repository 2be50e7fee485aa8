use nalgebra::{DefaultAllocator, OPoint};

use crate::allocators::DimAllocator;
use crate::composite::CompositeCollections;
use crate::mapping::MappingSettings;
use crate::packed::DescriptorKind;
use crate::MeshDim;

/// A confirmed crossing of a trajectory with a composite facet.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionCandidate<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// Squared distance from the previous position to the crossing.
    pub distance_squared: f64,
    pub composite_id: i64,
    pub facet: usize,
    pub point: OPoint<f64, D>,
}

impl<D> IntersectionCandidate<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn closer(self, other: Option<Self>) -> Self {
        match other {
            Some(other) if other.distance_squared <= self.distance_squared => other,
            _ => self,
        }
    }
}

/// Finds the crossing of the segment from `previous` to `current` with the facets resident in
/// `cells` that lies closest to `previous`.
///
/// Every facet passing the line-plane and proximity pre-filters is confirmed by inverting its
/// embedded map at the plane crossing and accepting collapsed coordinates within `contained_tol`
/// of the reference domain. All candidates are examined before the closest is chosen. A candidate
/// only replaces the current one if it is strictly closer.
pub fn closest_intersection<D>(
    collections: &CompositeCollections<D>,
    cells: &[usize],
    previous: &OPoint<f64, D>,
    current: &OPoint<f64, D>,
    settings: &MappingSettings,
    contained_tol: f64,
) -> Option<IntersectionCandidate<D>>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let mut closest: Option<IntersectionCandidate<D>> = None;
    let stores = cells.iter().filter_map(|&cell| collections.get(cell));
    for geometry in stores.flat_map(|store| store.iter_kind(DescriptorKind::Facet)) {
        let facet = geometry.id();
        let Some(plane) = collections.plane(facet) else {
            continue;
        };
        let Some(point) = plane.line_intersection(previous, current) else {
            continue;
        };
        if !plane.point_near_to_geom(&point) {
            continue;
        }
        let Some(normal) = geometry.normal() else {
            continue;
        };
        let vertices = geometry.nodes();
        let confirmed = D::facet_mapping_inverse(geometry.shape(), &vertices, &normal, &point, settings)
            .map(|result| result.is_contained(contained_tol))
            .unwrap_or(false);
        if confirmed {
            let candidate = IntersectionCandidate {
                distance_squared: (&point - previous).norm_squared(),
                composite_id: geometry.composite_id(),
                facet,
                point,
            };
            closest = Some(candidate.closer(closest));
        }
    }
    closest
}
