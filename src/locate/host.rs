use nalgebra::{DefaultAllocator, OPoint};

use crate::allocators::DimAllocator;
use crate::geometry::AxisAlignedBoundingBox;
use crate::mapping::{MappingResult, MappingSettings, NewtonStrategy};
use crate::mesh::Mesh;
use crate::MeshDim;

/// Exhaustive search over all cells of a mesh.
///
/// Slow, but independent of the index and of the affine classification of cells. Containment is
/// tested with a small slack so that points on cell boundaries are always found.
pub struct HostSearch<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    mesh: &'a Mesh<D>,
    bounding_boxes: Vec<AxisAlignedBoundingBox<f64, D>>,
    settings: MappingSettings,
    contained_tol: f64,
}

impl<'a, D> HostSearch<'a, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new(mesh: &'a Mesh<D>, settings: MappingSettings, contained_tol: f64) -> Self {
        let bounding_boxes = (0..mesh.num_cells())
            .map(|cell| {
                let aabb = mesh.cell_bounding_box(cell);
                aabb.grow_uniformly(0.05 * aabb.max_extent())
            })
            .collect();
        Self {
            mesh,
            bounding_boxes,
            settings,
            contained_tol,
        }
    }

    /// The first cell, in local order, that contains `x`.
    pub fn map_point(&self, x: &OPoint<f64, D>) -> Option<MappingResult<D>> {
        self.mesh
            .cells()
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                let aabb = &self.bounding_boxes[*index];
                (0..D::dim()).all(|i| x[i] >= aabb.min()[i] && x[i] <= aabb.max()[i])
            })
            .find_map(|(index, cell)| {
                let nodes = self.mesh.cell_nodes(index);
                let result = D::cell_mapping_inverse(
                    cell.shape,
                    cell.order,
                    &nodes,
                    x,
                    &self.settings,
                    NewtonStrategy::LineSearch,
                )?;
                result
                    .is_contained(self.contained_tol)
                    .then(|| result.with_cell(index))
            })
    }
}
