//! Per-index-cell caches of packed geometry.
//!
//! Geometry is collected for a set of index cells at a time. Collecting shrinks the requested set
//! to the cells that were not resident yet, so that callers learn which cells are new.
use std::collections::BTreeSet;

use log::{debug, warn};
use nalgebra::{DefaultAllocator, OMatrix, OPoint};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::allocators::DimAllocator;
use crate::element::{GeometryOrder, ShapeType};
use crate::hierarchy::{CellBinning, MeshHierarchy};
use crate::mapping::reference_point;
use crate::mesh::Mesh;
use crate::packed::{affine_payload, element_payload, DescriptorHeader, DescriptorKind, PackedStore};
use crate::MeshDim;

/// Default number of index cells a cache holds before evicting.
pub const DEFAULT_MAX_CACHED_CELLS: usize = 16384;

/// Relative tolerance used to classify element maps as affine.
pub const AFFINE_TOLERANCE: f64 = 1e-10;

/// Something that packs the geometry overlapping an index cell.
pub trait CellGeometrySource<D>: Sync
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn pack_cell(&self, cell: usize) -> PackedStore<D>;
}

#[derive(Debug, Clone)]
struct CacheEntry<D> {
    store: PackedStore<D>,
    last_used: u64,
}

/// A least-recently-used cache of packed geometry keyed by index cell.
#[derive(Debug, Clone)]
pub struct CellCache<D> {
    capacity: usize,
    entries: FxHashMap<usize, CacheEntry<D>>,
    clock: u64,
}

impl<D> CellCache<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: FxHashMap::default(),
            clock: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, cell: usize) -> bool {
        self.entries.contains_key(&cell)
    }

    pub fn get(&self, cell: usize) -> Option<&PackedStore<D>> {
        self.entries.get(&cell).map(|entry| &entry.store)
    }

    /// Makes the geometry of every cell in `cells` resident.
    ///
    /// On return `cells` only contains the cells that were packed by this call. Cells requested
    /// by this call are never evicted by it, so the cache may temporarily exceed its capacity.
    pub fn collect_geometry<S>(&mut self, source: &S, cells: &mut BTreeSet<usize>)
    where
        S: CellGeometrySource<D>,
    {
        self.clock += 1;
        let clock = self.clock;
        cells.retain(|cell| match self.entries.get_mut(cell) {
            Some(entry) => {
                entry.last_used = clock;
                false
            }
            None => true,
        });

        let packed: Vec<(usize, PackedStore<D>)> = cells
            .par_iter()
            .map(|&cell| (cell, source.pack_cell(cell)))
            .collect();
        let num_descriptors: usize = packed.iter().map(|(_, store)| store.len()).sum();
        for (cell, store) in packed {
            self.entries.insert(cell, CacheEntry { store, last_used: clock });
        }
        debug!(
            "Collected geometry for {} new index cells ({} descriptors), {} cells resident",
            cells.len(),
            num_descriptors,
            self.entries.len()
        );

        self.evict(clock);
    }

    fn evict(&mut self, clock: u64) {
        if self.entries.len() <= self.capacity {
            return;
        }
        let mut stale: Vec<(u64, usize)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.last_used < clock)
            .map(|(&cell, entry)| (entry.last_used, cell))
            .collect();
        stale.sort_unstable();
        let excess = self.entries.len() - self.capacity;
        for &(_, cell) in stale.iter().take(excess) {
            self.entries.remove(&cell);
        }
        if self.entries.len() > self.capacity {
            warn!(
                "A single request touched {} index cells, more than the cache capacity of {}",
                self.entries.len(),
                self.capacity
            );
        }
    }

    /// Drops all resident geometry.
    pub fn free(&mut self) {
        self.entries.clear();
    }
}

/// Packs the mesh cells binned into an index cell.
///
/// Linear cells with an affine map are packed as [`DescriptorKind::Affine`] unless
/// `all_generic` is set, all other cells as [`DescriptorKind::Element`].
pub struct ElementSource<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub mesh: &'a Mesh<D>,
    pub binning: &'a CellBinning,
    pub all_generic: bool,
}

impl<'a, D> ElementSource<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn pack_element(&self, cell_index: usize) -> (DescriptorHeader, Vec<f64>) {
        let cell = &self.mesh.cells()[cell_index];
        let nodes = self.mesh.cell_nodes(cell_index);
        if !self.all_generic && D::is_affine(cell.shape, cell.order, &nodes, AFFINE_TOLERANCE) {
            if let Some((origin, inverse_jacobian)) = affine_data::<D>(cell.shape, cell.order, &nodes) {
                let header = DescriptorHeader::new(DescriptorKind::Affine, cell.shape, cell.order, 0, cell_index);
                return (header, affine_payload(&origin, &inverse_jacobian));
            }
        }
        let header = DescriptorHeader::new(DescriptorKind::Element, cell.shape, cell.order, nodes.len(), cell_index);
        (header, element_payload(&nodes))
    }
}

/// Origin `X(0)` and inverse Jacobian of an affine element map, `None` if the map is singular.
fn affine_data<D>(
    shape: ShapeType,
    order: GeometryOrder,
    nodes: &[OPoint<f64, D>],
) -> Option<(OPoint<f64, D>, OMatrix<f64, D, D>)>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let zero = reference_point::<D>(&[0.0; 3]);
    let origin = D::map_cell(shape, order, nodes, &zero)?;
    let jacobian = D::cell_jacobian(shape, order, nodes, &zero)?;
    Some((origin, jacobian.try_inverse()?))
}

impl<'a, D> CellGeometrySource<D> for ElementSource<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn pack_cell(&self, cell: usize) -> PackedStore<D> {
        let descriptors = self
            .binning
            .get(cell)
            .iter()
            .map(|&element| self.pack_element(element))
            .collect();
        PackedStore::from_descriptors(descriptors)
    }
}

/// Packed mesh cells per index cell, for point location.
#[derive(Debug, Clone)]
pub struct ElementCollection<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    hierarchy: MeshHierarchy<D>,
    binning: CellBinning,
    cache: CellCache<D>,
    all_generic: bool,
}

impl<D> ElementCollection<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new(mesh: &Mesh<D>, hierarchy: MeshHierarchy<D>, all_generic: bool, capacity: usize) -> Self {
        let boxes = (0..mesh.num_cells()).map(|cell| (cell, mesh.cell_bounding_box(cell)));
        let binning = CellBinning::from_bounding_boxes(&hierarchy, boxes);
        debug!(
            "Binned {} mesh cells into {} index cells",
            mesh.num_cells(),
            binning.num_bins()
        );
        Self {
            hierarchy,
            binning,
            cache: CellCache::with_capacity(capacity),
            all_generic,
        }
    }

    pub fn hierarchy(&self) -> &MeshHierarchy<D> {
        &self.hierarchy
    }

    pub fn binning(&self) -> &CellBinning {
        &self.binning
    }

    pub fn cache(&self) -> &CellCache<D> {
        &self.cache
    }

    /// See [`CellCache::collect_geometry`].
    pub fn collect_geometry(&mut self, mesh: &Mesh<D>, cells: &mut BTreeSet<usize>) {
        let source = ElementSource {
            mesh,
            binning: &self.binning,
            all_generic: self.all_generic,
        };
        self.cache.collect_geometry(&source, cells);
    }

    pub fn get(&self, cell: usize) -> Option<&PackedStore<D>> {
        self.cache.get(cell)
    }

    pub fn free(&mut self) {
        self.cache.free();
    }
}
