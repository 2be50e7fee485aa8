use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use nalgebra::DefaultAllocator;
use rustc_hash::FxHashMap;

use crate::allocators::DimAllocator;
use crate::collection::{CellCache, CellGeometrySource};
use crate::element::GeometryOrder;
use crate::geometry::LinePlaneIntersection;
use crate::hierarchy::{CellBinning, MeshHierarchy};
use crate::mesh::Mesh;
use crate::packed::{facet_payload, DescriptorHeader, DescriptorKind, PackedStore};
use crate::MeshDim;

/// Packs the composite facets binned into an index cell.
struct FacetSource<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    mesh: &'a Mesh<D>,
    binning: &'a CellBinning,
    membership: &'a BTreeMap<usize, i64>,
    planes: &'a FxHashMap<usize, LinePlaneIntersection<f64, D>>,
}

impl<'a, D> CellGeometrySource<D> for FacetSource<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn pack_cell(&self, cell: usize) -> PackedStore<D> {
        let descriptors = self
            .binning
            .get(cell)
            .iter()
            .filter_map(|&facet| {
                let composite_id = *self.membership.get(&facet)?;
                let plane = self.planes.get(&facet)?;
                let shape = self.mesh.facets()[facet].shape;
                let vertices = self.mesh.facet_vertices(facet);
                let header =
                    DescriptorHeader::new(DescriptorKind::Facet, shape, GeometryOrder::Linear, vertices.len(), facet)
                        .with_composite(composite_id);
                Some((header, facet_payload(&vertices, plane.plane().normal())))
            })
            .collect();
        PackedStore::from_descriptors(descriptors)
    }
}

/// Packed composite facets per index cell, with the line-plane pre-filter of every facet.
#[derive(Debug, Clone)]
pub struct CompositeCollections<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    hierarchy: MeshHierarchy<D>,
    binning: CellBinning,
    membership: BTreeMap<usize, i64>,
    planes: FxHashMap<usize, LinePlaneIntersection<f64, D>>,
    cache: CellCache<D>,
}

impl<D> CompositeCollections<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// Prepares the facets of the given composites. Degenerate facets are skipped.
    pub fn new(mesh: &Mesh<D>, hierarchy: MeshHierarchy<D>, composite_ids: &[i64], capacity: usize) -> Self {
        let mut membership = mesh.facet_composites(composite_ids);
        let mut planes = FxHashMap::default();
        membership.retain(|&facet, &mut composite_id| {
            let vertices = mesh.facet_vertices(facet);
            let plane = D::facet_normal(mesh.facets()[facet].shape, &vertices)
                .and_then(|normal| LinePlaneIntersection::from_vertices_and_normal(&vertices, normal));
            match plane {
                Some(plane) => {
                    planes.insert(facet, plane);
                    true
                }
                None => {
                    warn!("Skipping degenerate facet {} of composite {}", facet, composite_id);
                    false
                }
            }
        });
        for &id in composite_ids {
            if mesh.composite(id).is_none() {
                warn!("Composite {} does not exist in the mesh", id);
            }
        }

        let boxes = membership
            .keys()
            .map(|&facet| (facet, mesh.facet_bounding_box(facet)));
        let binning = CellBinning::from_bounding_boxes(&hierarchy, boxes);
        debug!(
            "Binned {} composite facets into {} index cells",
            membership.len(),
            binning.num_bins()
        );
        Self {
            hierarchy,
            binning,
            membership,
            planes,
            cache: CellCache::with_capacity(capacity),
        }
    }

    pub fn hierarchy(&self) -> &MeshHierarchy<D> {
        &self.hierarchy
    }

    pub fn num_facets(&self) -> usize {
        self.membership.len()
    }

    /// Composite the facet is attributed to, if it belongs to one of the prepared composites.
    pub fn composite_of(&self, facet: usize) -> Option<i64> {
        self.membership.get(&facet).copied()
    }

    pub fn plane(&self, facet: usize) -> Option<&LinePlaneIntersection<f64, D>> {
        self.planes.get(&facet)
    }

    /// See [`CellCache::collect_geometry`].
    pub fn collect_geometry(&mut self, mesh: &Mesh<D>, cells: &mut BTreeSet<usize>) {
        let source = FacetSource {
            mesh,
            binning: &self.binning,
            membership: &self.membership,
            planes: &self.planes,
        };
        self.cache.collect_geometry(&source, cells);
    }

    pub fn get(&self, cell: usize) -> Option<&PackedStore<D>> {
        self.cache.get(cell)
    }

    pub fn num_cached_cells(&self) -> usize {
        self.cache.len()
    }

    pub fn free(&mut self) {
        self.cache.free();
    }
}
