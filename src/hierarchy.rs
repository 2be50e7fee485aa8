//! A uniform two-level decomposition of a bounding box into index cells.
//!
//! The box is split into a grid of cubic coarse cells, each of which is split into
//! `2^order` fine cells per dimension. A fine cell is addressed in three equivalent ways:
//!
//! - its *cartesian tuple*, the integer coordinates on the global fine grid,
//! - its [`HierarchyTuple`], the pair of coarse and fine-within-coarse coordinates,
//! - its *linear index*, `coarse_linear * ncells_fine + fine_linear`, where both parts are
//!   lexicographic with the x coordinate varying fastest.
//!
//! Linear indices are the keys of index cells throughout the crate.
use std::ops::Range;

use itertools::Itertools;
use log::debug;
use nalgebra::{DefaultAllocator, OPoint, OVector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::allocators::DimAllocator;
use crate::geometry::AxisAlignedBoundingBox;
use crate::mesh::Mesh;
use crate::{MeshDim, SmallDim};

/// Coarse and fine coordinates of an index cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HierarchyTuple<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub coarse: OVector<usize, D>,
    pub fine: OVector<usize, D>,
}

/// A box of cartesian tuples, `start` inclusive and `end` exclusive in each dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartBox<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub start: OVector<usize, D>,
    pub end: OVector<usize, D>,
}

impl<D> CartBox<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.start.iter().zip(self.end.iter()).map(|(&s, &e)| s..e)
    }

    pub fn num_cells(&self) -> usize {
        self.ranges().map(|r| r.len()).product()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "OVector<f64, D>: Serialize, OVector<usize, D>: Serialize",
    deserialize = "OVector<f64, D>: Deserialize<'de>, OVector<usize, D>: Deserialize<'de>"
))]
pub struct MeshHierarchy<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    origin: OVector<f64, D>,
    coarse_dims: OVector<usize, D>,
    coarse_cell_width: f64,
    order: u32,
}

impl<D> MeshHierarchy<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// # Panics
    ///
    /// Panics if a coarse dimension is zero or the cell width is not positive.
    pub fn new(origin: OVector<f64, D>, coarse_dims: OVector<usize, D>, coarse_cell_width: f64, order: u32) -> Self {
        assert!(coarse_dims.iter().all(|&n| n > 0), "Coarse dimensions must be positive.");
        assert!(coarse_cell_width > 0.0, "Cell width must be positive.");
        assert!(order < 16, "Refinement order is unreasonably large.");
        Self {
            origin,
            coarse_dims,
            coarse_cell_width,
            order,
        }
    }

    /// Creates a hierarchy that covers `bounds` with `coarse_cells_max_dim` coarse cells along the
    /// largest extent of the box.
    pub fn fit_to_bounding_box(
        bounds: &AxisAlignedBoundingBox<f64, D>,
        coarse_cells_max_dim: usize,
        order: u32,
    ) -> Self {
        assert!(coarse_cells_max_dim > 0);
        let max_extent = bounds.max_extent();
        let max_extent = if max_extent > 0.0 { max_extent } else { 1.0 };
        // Points on the upper boundary must fall strictly inside the last cell.
        let width = max_extent * (1.0 + 1e-8) / coarse_cells_max_dim as f64;
        let extents = bounds.extents();
        let coarse_dims = extents.map(|e| ((e / width).ceil() as usize).max(1));
        debug!(
            "Fitted mesh hierarchy with coarse dimensions {:?}, width {:e} and order {}",
            coarse_dims.as_slice(),
            width,
            order
        );
        Self::new(bounds.min().clone(), coarse_dims, width, order)
    }

    /// Creates a hierarchy over the bounding box of the mesh with roughly one coarse cell per mesh
    /// cell and two fine cells per dimension and coarse cell.
    ///
    /// Returns `None` for meshes without vertices.
    pub fn for_mesh(mesh: &Mesh<D>) -> Option<Self>
    where
        D: MeshDim,
    {
        let bounds = mesh.bounding_box()?;
        let per_dim = (mesh.num_cells() as f64).powf(1.0 / D::dim() as f64).ceil() as usize;
        Some(Self::fit_to_bounding_box(&bounds, per_dim.max(1), 1))
    }

    pub fn origin(&self) -> &OVector<f64, D> {
        &self.origin
    }

    pub fn coarse_dims(&self) -> &OVector<usize, D> {
        &self.coarse_dims
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Number of fine cells per dimension of a coarse cell.
    pub fn ncells_dim_fine(&self) -> usize {
        1 << self.order
    }

    /// Number of fine cells in a coarse cell.
    pub fn ncells_fine(&self) -> usize {
        self.ncells_dim_fine().pow(D::dim() as u32)
    }

    pub fn num_cells(&self) -> usize {
        self.coarse_dims.iter().product::<usize>() * self.ncells_fine()
    }

    pub fn fine_cell_width(&self) -> f64 {
        self.coarse_cell_width / self.ncells_dim_fine() as f64
    }

    /// Number of fine cells per dimension across the whole hierarchy.
    pub fn max_cart_index(&self) -> OVector<usize, D> {
        let nf = self.ncells_dim_fine();
        self.coarse_dims.map(|n| n * nf)
    }

    /// Cartesian tuple of the fine cell containing `x`, without clamping to the hierarchy.
    pub fn cart_tuple_no_trunc(&self, x: &OPoint<f64, D>) -> OVector<i64, D> {
        let width = self.fine_cell_width();
        (&x.coords - &self.origin).map(|dx| (dx / width).floor() as i64)
    }

    /// Cartesian tuple of the fine cell containing `x`, clamped to the hierarchy.
    pub fn cart_tuple(&self, x: &OPoint<f64, D>) -> OVector<usize, D> {
        let unclamped = self.cart_tuple_no_trunc(x);
        let max = self.max_cart_index();
        OVector::<usize, D>::from_fn(|i, _| unclamped[i].clamp(0, max[i] as i64 - 1) as usize)
    }

    pub fn tuple_from_cart(&self, cart: &OVector<usize, D>) -> HierarchyTuple<D> {
        let nf = self.ncells_dim_fine();
        HierarchyTuple {
            coarse: cart.map(|c| c / nf),
            fine: cart.map(|c| c % nf),
        }
    }

    pub fn cart_from_tuple(&self, tuple: &HierarchyTuple<D>) -> OVector<usize, D> {
        let nf = self.ncells_dim_fine();
        tuple.coarse.zip_map(&tuple.fine, |c, f| c * nf + f)
    }

    pub fn linear_index(&self, tuple: &HierarchyTuple<D>) -> usize {
        let nf = self.ncells_dim_fine();
        let coarse = lexicographic_index(tuple.coarse.iter().copied(), self.coarse_dims.iter().copied());
        let fine = lexicographic_index(tuple.fine.iter().copied(), std::iter::repeat(nf));
        coarse * self.ncells_fine() + fine
    }

    /// # Panics
    ///
    /// Panics if `linear` is not smaller than [`num_cells`](Self::num_cells).
    pub fn tuple_from_linear(&self, linear: usize) -> HierarchyTuple<D> {
        assert!(linear < self.num_cells(), "Linear index {} out of bounds.", linear);
        let nf = self.ncells_dim_fine();
        let ncells_fine = self.ncells_fine();
        let mut coarse_linear = linear / ncells_fine;
        let mut fine_linear = linear % ncells_fine;
        let coarse = OVector::<usize, D>::from_fn(|i, _| {
            let c = coarse_linear % self.coarse_dims[i];
            coarse_linear /= self.coarse_dims[i];
            c
        });
        let fine = OVector::<usize, D>::from_fn(|_, _| {
            let f = fine_linear % nf;
            fine_linear /= nf;
            f
        });
        HierarchyTuple { coarse, fine }
    }

    pub fn linear_index_from_cart(&self, cart: &OVector<usize, D>) -> usize {
        self.linear_index(&self.tuple_from_cart(cart))
    }

    /// Linear index of the cell containing `x`. Points outside the hierarchy are clamped to the
    /// nearest cell.
    pub fn cell_for_point(&self, x: &OPoint<f64, D>) -> usize {
        self.linear_index_from_cart(&self.cart_tuple(x))
    }

    /// Linear index of the cell containing `x`, `None` if `x` lies outside the hierarchy.
    pub fn try_cell_for_point(&self, x: &OPoint<f64, D>) -> Option<usize> {
        let cart = self.cart_tuple_no_trunc(x);
        let max = self.max_cart_index();
        (0..D::dim())
            .all(|i| cart[i] >= 0 && cart[i] < max[i] as i64)
            .then(|| self.linear_index_from_cart(&cart.map(|c| c as usize)))
    }

    /// Restricts the inclusive bounds `[min, max]` of cartesian tuples to the hierarchy.
    ///
    /// Bounds partially outside are clamped to the valid range. Returns `None` if the box lies
    /// entirely outside the hierarchy in any dimension.
    pub fn sanitize_cart_bounds(&self, min: &OVector<i64, D>, max: &OVector<i64, D>) -> Option<CartBox<D>> {
        let limit = self.max_cart_index();
        let mut start = OVector::<usize, D>::zeros();
        let mut end = OVector::<usize, D>::zeros();
        for i in 0..D::dim() {
            let upper = limit[i] as i64 - 1;
            if max[i] < 0 || min[i] > upper || min[i] > max[i] {
                return None;
            }
            start[i] = min[i].max(0) as usize;
            end[i] = max[i].min(upper) as usize + 1;
        }
        Some(CartBox { start, end })
    }

    /// Cartesian bounds covering the cells of all given points.
    pub fn cart_box_for_points<'a>(&self, points: impl IntoIterator<Item = &'a OPoint<f64, D>>) -> Option<CartBox<D>> {
        let mut points = points.into_iter();
        let first = self.cart_tuple_no_trunc(points.next()?);
        let (min, max) = points.fold((first.clone(), first), |(min, max), x| {
            let cart = self.cart_tuple_no_trunc(x);
            (min.inf(&cart), max.sup(&cart))
        });
        self.sanitize_cart_bounds(&min, &max)
    }

    /// Linear indices of all cells in the box.
    pub fn cells_in_cart_box(&self, cart_box: &CartBox<D>) -> Vec<usize> {
        cart_box
            .ranges()
            .multi_cartesian_product()
            .map(|cart| self.linear_index_from_cart(&OVector::<usize, D>::from_iterator(cart)))
            .collect()
    }

    /// Linear indices of all cells overlapping the bounding box.
    pub fn cells_overlapping(&self, aabb: &AxisAlignedBoundingBox<f64, D>) -> Vec<usize> {
        let min = OPoint::from(aabb.min().clone());
        let max = OPoint::from(aabb.max().clone());
        match self.cart_box_for_points([&min, &max]) {
            Some(cart_box) => self.cells_in_cart_box(&cart_box),
            None => Vec::new(),
        }
    }

    pub fn cell_bounding_box(&self, linear: usize) -> AxisAlignedBoundingBox<f64, D> {
        let cart = self.cart_from_tuple(&self.tuple_from_linear(linear));
        let width = self.fine_cell_width();
        let min = &self.origin + cart.map(|c| c as f64 * width);
        let max = min.add_scalar(width);
        AxisAlignedBoundingBox::new(min, max)
    }
}

fn lexicographic_index(index: impl Iterator<Item = usize>, dims: impl Iterator<Item = usize>) -> usize {
    let mut stride = 1;
    let mut linear = 0;
    for (i, n) in index.zip(dims) {
        linear += i * stride;
        stride *= n;
    }
    linear
}

/// Ids of elements or facets binned by the index cells their bounding boxes overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellBinning {
    bins: FxHashMap<usize, Vec<usize>>,
}

impl CellBinning {
    /// Relative growth of bounding boxes before binning.
    pub const GROWTH_FACTOR: f64 = 0.05;

    /// Bins `(id, bounding box)` pairs, growing each box by 5% of its largest extent.
    pub fn from_bounding_boxes<D>(
        hierarchy: &MeshHierarchy<D>,
        boxes: impl IntoIterator<Item = (usize, AxisAlignedBoundingBox<f64, D>)>,
    ) -> Self
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        let mut bins: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (id, aabb) in boxes {
            let grown = aabb.grow_uniformly(Self::GROWTH_FACTOR * aabb.max_extent());
            for cell in hierarchy.cells_overlapping(&grown) {
                bins.entry(cell).or_default().push(id);
            }
        }
        for ids in bins.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        Self { bins }
    }

    /// Ids binned into the cell, empty for cells without any.
    pub fn get(&self, cell: usize) -> &[usize] {
        self.bins.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Cells with at least one id, in ascending order.
    pub fn cells(&self) -> Vec<usize> {
        self.bins.keys().copied().sorted().collect()
    }
}
