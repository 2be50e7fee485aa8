//! Unstructured meshes of mixed shape and order, with boundary facets grouped into composites.
use std::collections::BTreeMap;

use itertools::Itertools;
use log::warn;
use nalgebra::{DefaultAllocator, OPoint, OVector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::allocators::DimAllocator;
use crate::element::{GeometryOrder, ShapeType};
use crate::geometry::AxisAlignedBoundingBox;
use crate::mapping::reference_point;
use crate::MeshDim;

pub mod procedural;

/// A mesh cell.
///
/// `nodes` index into the vertices of the owning mesh, in the node order of the element of the
/// given shape and order. Curved cells carry additional control points besides their vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub shape: ShapeType,
    pub order: GeometryOrder,
    pub nodes: Vec<usize>,
    /// Identifier of the cell in the mesh provider's numbering.
    pub native_id: i64,
    /// Rank of the process owning the cell.
    pub rank: i32,
}

impl Cell {
    pub fn vertex_indices(&self) -> Vec<usize> {
        self.shape
            .vertex_nodes(self.order)
            .iter()
            .map(|&i| self.nodes[i])
            .collect()
    }
}

/// A planar facet between cells or on the domain boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub shape: ShapeType,
    pub vertices: Vec<usize>,
    pub native_id: i64,
}

/// Index-based mesh of mixed cell shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    vertices: Vec<OPoint<f64, D>>,
    cells: Vec<Cell>,
    facets: Vec<Facet>,
    composites: BTreeMap<i64, Vec<usize>>,
    native_to_local: FxHashMap<i64, usize>,
}

impl<D> Mesh<D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// Construct a mesh from vertices and cells.
    ///
    /// # Panics
    ///
    /// Panics if a cell refers to a vertex out of bounds, has a node count that does not match its
    /// shape and order, or has a shape that is not a cell shape of the dimension.
    pub fn from_vertices_and_cells(vertices: Vec<OPoint<f64, D>>, cells: Vec<Cell>) -> Self {
        for (index, cell) in cells.iter().enumerate() {
            assert!(
                D::cell_shapes().contains(&cell.shape),
                "Cell {} has shape {:?}, which is not supported in {} dimensions.",
                index,
                cell.shape,
                D::dim()
            );
            assert_eq!(
                Some(cell.nodes.len()),
                cell.shape.num_nodes(cell.order),
                "Cell {} has an invalid number of nodes.",
                index
            );
            assert!(
                cell.nodes.iter().all(|&node| node < vertices.len()),
                "Cell {} refers to a vertex out of bounds.",
                index
            );
        }
        let native_to_local = cells
            .iter()
            .enumerate()
            .map(|(local, cell)| (cell.native_id, local))
            .collect();
        Self {
            vertices,
            cells,
            facets: Vec::new(),
            composites: BTreeMap::new(),
            native_to_local,
        }
    }

    pub fn vertices(&self) -> &[OPoint<f64, D>] {
        &self.vertices
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn cell_nodes(&self, cell: usize) -> Vec<OPoint<f64, D>> {
        self.cells[cell]
            .nodes
            .iter()
            .map(|&node| self.vertices[node].clone())
            .collect()
    }

    pub fn facet_vertices(&self, facet: usize) -> Vec<OPoint<f64, D>> {
        self.facets[facet]
            .vertices
            .iter()
            .map(|&v| self.vertices[v].clone())
            .collect()
    }

    pub fn native_cell_id(&self, local: usize) -> Option<i64> {
        self.cells.get(local).map(|cell| cell.native_id)
    }

    pub fn local_cell_id(&self, native: i64) -> Option<usize> {
        self.native_to_local.get(&native).copied()
    }

    /// Adds a facet and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not a facet shape of the dimension or the vertex count is wrong.
    pub fn add_facet(&mut self, shape: ShapeType, vertices: Vec<usize>) -> usize {
        assert!(D::facet_shapes().contains(&shape), "Unsupported facet shape {:?}", shape);
        assert_eq!(vertices.len(), shape.num_vertices(), "Invalid number of facet vertices.");
        assert!(vertices.iter().all(|&v| v < self.vertices.len()));
        let index = self.facets.len();
        self.facets.push(Facet {
            shape,
            vertices,
            native_id: index as i64,
        });
        index
    }

    /// Assigns facets to a composite, creating the composite if it does not exist.
    pub fn add_to_composite(&mut self, composite_id: i64, facets: impl IntoIterator<Item = usize>) {
        let entry = self.composites.entry(composite_id).or_default();
        for facet in facets {
            assert!(facet < self.facets.len(), "Facet index out of bounds.");
            entry.push(facet);
        }
        entry.sort_unstable();
        entry.dedup();
    }

    pub fn composite(&self, composite_id: i64) -> Option<&[usize]> {
        self.composites.get(&composite_id).map(Vec::as_slice)
    }

    pub fn composite_ids(&self) -> impl '_ + Iterator<Item = i64> {
        self.composites.keys().copied()
    }

    /// Composite membership of every facet that belongs to one of the given composites.
    ///
    /// A facet in several of the requested composites is attributed to the smallest id.
    pub fn facet_composites(&self, composite_ids: &[i64]) -> BTreeMap<usize, i64> {
        let mut membership = BTreeMap::new();
        for &id in composite_ids.iter().sorted().rev() {
            for &facet in self.composite(id).unwrap_or(&[]) {
                membership.insert(facet, id);
            }
        }
        membership
    }

    /// Finds the facets of cells that are connected to exactly one cell.
    ///
    /// Facets are returned with their vertices ordered as in the owning cell, sorted by their
    /// sorted vertex indices.
    pub fn boundary_facets(&self) -> Vec<(ShapeType, Vec<usize>)> {
        // Use a BTreeMap to avoid non-determinism due to HashMap's internal randomization.
        let mut counts: BTreeMap<Vec<usize>, (Vec<usize>, usize)> = BTreeMap::new();
        for cell in &self.cells {
            let vertices = cell.vertex_indices();
            for &local_facet in cell.shape.facets() {
                let facet: Vec<usize> = local_facet.iter().map(|&i| vertices[i]).collect();
                let mut key = facet.clone();
                key.sort_unstable();
                counts
                    .entry(key)
                    .and_modify(|(_, count)| *count += 1)
                    .or_insert((facet, 1));
            }
        }
        counts
            .into_values()
            .filter(|&(_, count)| count == 1)
            .filter_map(|(facet, _)| ShapeType::facet_shape(facet.len()).map(|shape| (shape, facet)))
            .collect()
    }

    /// Bounding box of all nodes of a cell, including control points of curved cells.
    pub fn cell_bounding_box(&self, cell: usize) -> AxisAlignedBoundingBox<f64, D> {
        let nodes = self.cells[cell].nodes.iter().map(|&node| &self.vertices[node]);
        AxisAlignedBoundingBox::from_points(nodes).expect("Cells always have nodes")
    }

    pub fn facet_bounding_box(&self, facet: usize) -> AxisAlignedBoundingBox<f64, D> {
        let vertices = self.facets[facet].vertices.iter().map(|&v| &self.vertices[v]);
        AxisAlignedBoundingBox::from_points(vertices).expect("Facets always have vertices")
    }

    pub fn bounding_box(&self) -> Option<AxisAlignedBoundingBox<f64, D>> {
        AxisAlignedBoundingBox::from_points(&self.vertices)
    }

    /// Transform all vertices of the mesh by the given transformation function.
    pub fn transform_vertices<F>(&mut self, mut transformation: F)
    where
        F: FnMut(&mut OPoint<f64, D>),
    {
        for p in &mut self.vertices {
            transformation(p);
        }
    }

    pub fn translate(&mut self, translation: &OVector<f64, D>) {
        self.transform_vertices(|p| *p += translation);
    }

    /// Converts linear cells to quadratic cells and moves every node through `deformation`.
    ///
    /// New nodes are placed at the images of the quadratic reference nodes under the linear map
    /// and are shared between neighbouring cells. Cells without a quadratic representation
    /// (pyramids) stay linear. Facets keep referring to the (deformed) vertices.
    pub fn elevate_to_quadratic<F>(&mut self, deformation: F)
    where
        F: Fn(&OPoint<f64, D>) -> OPoint<f64, D>,
    {
        let key = |p: &OPoint<f64, D>| -> Vec<i64> { p.iter().map(|x| (x * 1e9).round() as i64).collect() };
        let mut node_lookup: FxHashMap<Vec<i64>, usize> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, p)| (key(p), i))
            .collect();

        for cell_index in 0..self.cells.len() {
            let (shape, order) = (self.cells[cell_index].shape, self.cells[cell_index].order);
            if order == GeometryOrder::Quadratic {
                continue;
            }
            let Some(reference_nodes) = shape.reference_nodes(GeometryOrder::Quadratic) else {
                warn!("Cell {} of shape {:?} has no quadratic representation, kept linear.", cell_index, shape);
                continue;
            };
            let linear_nodes = self.cell_nodes(cell_index);
            let mut nodes = Vec::with_capacity(reference_nodes.len());
            for xi in &reference_nodes {
                let x = D::map_cell(shape, order, &linear_nodes, &reference_point(xi))
                    .expect("Linear cell nodes are consistent with their shape");
                let index = *node_lookup.entry(key(&x)).or_insert_with(|| {
                    self.vertices.push(x.clone());
                    self.vertices.len() - 1
                });
                nodes.push(index);
            }
            let cell = &mut self.cells[cell_index];
            cell.nodes = nodes;
            cell.order = GeometryOrder::Quadratic;
        }

        for p in &mut self.vertices {
            *p = deformation(p);
        }
    }
}
