//! Packed, fixed-stride geometry descriptors.
//!
//! A descriptor is a [`DescriptorHeader`] followed by a payload of `f64` values whose layout is
//! determined by the [`DescriptorKind`], the shape and the node count:
//!
//! | kind      | payload                                        |
//! |-----------|------------------------------------------------|
//! | `Affine`  | origin `X(0)` (`D`), inverse Jacobian (`D x D`, column-major) |
//! | `Element` | geometry nodes (`num_nodes x D`)               |
//! | `Facet`   | vertices (`num_nodes x D`), unit normal (`D`)  |
//!
//! Descriptors of the same kind, shape and order have the same stride and are stored back to
//! back in a [`PackedArena`]. Headers are kept as integer words next to the payload buffer, so
//! ids never pass through a floating point value.
use std::collections::BTreeMap;
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use nalgebra::{DefaultAllocator, OMatrix, OPoint, OVector};

use crate::allocators::DimAllocator;
use crate::element::{GeometryOrder, ShapeType};
use crate::SmallDim;

/// How the payload of a descriptor is to be interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum DescriptorKind {
    /// Element with an affine map, inverted in closed form.
    Affine = 0,
    /// Element given by its geometry nodes.
    Element = 1,
    /// Planar facet with its unit normal.
    Facet = 2,
}

impl DescriptorKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Affine),
            1 => Some(Self::Element),
            2 => Some(Self::Facet),
            _ => None,
        }
    }
}

/// Leading block of every descriptor.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct DescriptorHeader {
    pub shape: u32,
    pub order: u32,
    pub kind: u32,
    pub num_nodes: u32,
    /// Local cell id, or facet id for facets.
    pub id: i64,
    /// Composite of a facet, `-1` for elements.
    pub composite_id: i64,
}

/// Number of 64-bit words occupied by a header.
pub const HEADER_LEN: usize = std::mem::size_of::<DescriptorHeader>() / std::mem::size_of::<u64>();

impl DescriptorHeader {
    pub fn new(kind: DescriptorKind, shape: ShapeType, order: GeometryOrder, num_nodes: usize, id: usize) -> Self {
        Self {
            shape: shape as u32,
            order: order as u32,
            kind: kind as u32,
            num_nodes: num_nodes as u32,
            id: id as i64,
            composite_id: -1,
        }
    }

    pub fn with_composite(mut self, composite_id: i64) -> Self {
        self.composite_id = composite_id;
        self
    }

    pub fn key(&self) -> Option<ArenaKey> {
        Some(ArenaKey {
            kind: DescriptorKind::from_u32(self.kind)?,
            shape: ShapeType::from_u32(self.shape)?,
            order: match self.order {
                1 => GeometryOrder::Linear,
                2 => GeometryOrder::Quadratic,
                _ => return None,
            },
        })
    }

    fn to_words(self) -> [u64; HEADER_LEN] {
        bytemuck::cast(self)
    }

    fn from_words(words: &[u64]) -> Self {
        bytemuck::pod_read_unaligned(bytemuck::cast_slice(&words[..HEADER_LEN]))
    }
}

/// Identifies the arena a descriptor is stored in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaKey {
    pub kind: DescriptorKind,
    pub shape: ShapeType,
    pub order: GeometryOrder,
}

impl ArenaKey {
    /// Number of nodes stored in each descriptor.
    pub fn num_nodes(&self) -> usize {
        match self.kind {
            DescriptorKind::Affine => 0,
            DescriptorKind::Facet => self.shape.num_vertices(),
            DescriptorKind::Element => self
                .shape
                .num_nodes(self.order)
                .unwrap_or_else(|| self.shape.num_vertices()),
        }
    }

    /// Number of payload values of a descriptor in dimension `dim`.
    pub fn payload_len(&self, dim: usize) -> usize {
        match self.kind {
            DescriptorKind::Affine => dim + dim * dim,
            DescriptorKind::Element => self.num_nodes() * dim,
            DescriptorKind::Facet => self.num_nodes() * dim + dim,
        }
    }

    /// Number of 64-bit words of a descriptor, header included.
    pub fn stride(&self, dim: usize) -> usize {
        HEADER_LEN + self.payload_len(dim)
    }
}

/// Contiguous storage of descriptors sharing an [`ArenaKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct PackedArena<D> {
    key: ArenaKey,
    payload_len: usize,
    headers: Vec<u64>,
    payloads: Vec<f64>,
    len: usize,
    marker: PhantomData<D>,
}

impl<D> PackedArena<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new(key: ArenaKey) -> Self {
        Self {
            key,
            payload_len: key.payload_len(D::dim()),
            headers: Vec::new(),
            payloads: Vec::new(),
            len: 0,
            marker: PhantomData,
        }
    }

    pub fn key(&self) -> ArenaKey {
        self.key
    }

    pub fn stride(&self) -> usize {
        HEADER_LEN + self.payload_len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of descriptors that fit without reallocation.
    pub fn capacity(&self) -> usize {
        self.headers.len() / HEADER_LEN
    }

    /// Discards all descriptors and makes room for `count` descriptors.
    ///
    /// Storage only grows, and old contents are not preserved when it does.
    pub fn realloc_no_copy(&mut self, count: usize) {
        if count > self.capacity() {
            self.headers = vec![0; count * HEADER_LEN];
            self.payloads = vec![0.0; count * self.payload_len];
        }
        self.len = 0;
    }

    /// Appends a descriptor and returns its offset in the arena.
    ///
    /// # Panics
    ///
    /// Panics if the header does not belong to this arena or the payload has the wrong length.
    pub fn push(&mut self, header: DescriptorHeader, payload: &[f64]) -> usize {
        assert_eq!(header.key(), Some(self.key), "Descriptor does not belong to this arena.");
        assert_eq!(payload.len(), self.payload_len, "Payload length does not match stride.");
        if self.len == self.capacity() {
            // Amortized growth, existing descriptors are kept.
            let new_capacity = (2 * self.capacity()).max(1);
            self.headers.resize(new_capacity * HEADER_LEN, 0);
            self.payloads.resize(new_capacity * self.payload_len, 0.0);
        }
        let start = self.len * HEADER_LEN;
        self.headers[start..start + HEADER_LEN].copy_from_slice(&header.to_words());
        let start = self.len * self.payload_len;
        self.payloads[start..start + self.payload_len].copy_from_slice(payload);
        self.len += 1;
        self.len - 1
    }

    pub fn get(&self, offset: usize) -> Option<PackedGeometry<'_, D>> {
        if offset >= self.len {
            return None;
        }
        let header = DescriptorHeader::from_words(&self.headers[offset * HEADER_LEN..]);
        let start = offset * self.payload_len;
        Some(PackedGeometry {
            key: self.key,
            header,
            payload: &self.payloads[start..start + self.payload_len],
            marker: PhantomData,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = PackedGeometry<'_, D>> {
        (0..self.len).filter_map(move |offset| self.get(offset))
    }
}

/// Read-only view of a single descriptor.
#[derive(Debug, Copy, Clone)]
pub struct PackedGeometry<'a, D> {
    key: ArenaKey,
    header: DescriptorHeader,
    payload: &'a [f64],
    marker: PhantomData<D>,
}

impl<'a, D> PackedGeometry<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn header(&self) -> DescriptorHeader {
        self.header
    }

    pub fn key(&self) -> ArenaKey {
        self.key
    }

    pub fn shape(&self) -> ShapeType {
        self.key.shape
    }

    pub fn order(&self) -> GeometryOrder {
        self.key.order
    }

    pub fn id(&self) -> usize {
        self.header.id as usize
    }

    pub fn composite_id(&self) -> i64 {
        self.header.composite_id
    }

    fn payload(&self) -> &'a [f64] {
        self.payload
    }

    fn point_at(&self, index: usize) -> OPoint<f64, D> {
        let d = D::dim();
        OPoint::from(OVector::<f64, D>::from_column_slice(&self.payload()[index * d..(index + 1) * d]))
    }

    /// Geometry nodes of element descriptors and vertices of facet descriptors.
    pub fn nodes(&self) -> Vec<OPoint<f64, D>> {
        (0..self.key.num_nodes()).map(|i| self.point_at(i)).collect()
    }

    /// Origin of an affine descriptor.
    pub fn origin(&self) -> Option<OPoint<f64, D>> {
        (self.key.kind == DescriptorKind::Affine).then(|| self.point_at(0))
    }

    /// Inverse Jacobian of an affine descriptor.
    pub fn inverse_jacobian(&self) -> Option<OMatrix<f64, D, D>> {
        let d = D::dim();
        (self.key.kind == DescriptorKind::Affine)
            .then(|| OMatrix::<f64, D, D>::from_column_slice(&self.payload()[d..d + d * d]))
    }

    /// Unit normal of a facet descriptor.
    pub fn normal(&self) -> Option<OVector<f64, D>> {
        let d = D::dim();
        let offset = self.key.num_nodes() * d;
        (self.key.kind == DescriptorKind::Facet)
            .then(|| OVector::<f64, D>::from_column_slice(&self.payload()[offset..offset + d]))
    }
}

/// Payload of an affine descriptor.
pub fn affine_payload<D>(origin: &OPoint<f64, D>, inverse_jacobian: &OMatrix<f64, D, D>) -> Vec<f64>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    origin
        .coords
        .iter()
        .chain(inverse_jacobian.iter())
        .copied()
        .collect()
}

/// Payload of an element descriptor.
pub fn element_payload<D>(nodes: &[OPoint<f64, D>]) -> Vec<f64>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    nodes.iter().flat_map(|p| p.coords.iter().copied()).collect()
}

/// Payload of a facet descriptor.
pub fn facet_payload<D>(vertices: &[OPoint<f64, D>], normal: &OVector<f64, D>) -> Vec<f64>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let mut payload = element_payload(vertices);
    payload.extend(normal.iter().copied());
    payload
}

/// A set of arenas, one per [`ArenaKey`] in use.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedStore<D> {
    arenas: BTreeMap<ArenaKey, PackedArena<D>>,
}

impl<D> Default for PackedStore<D> {
    fn default() -> Self {
        Self {
            arenas: BTreeMap::new(),
        }
    }
}

impl<D> PackedStore<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    /// Builds a store from `(header, payload)` pairs, allocating every arena once up front.
    pub fn from_descriptors(descriptors: Vec<(DescriptorHeader, Vec<f64>)>) -> Self {
        let mut counts: BTreeMap<ArenaKey, usize> = BTreeMap::new();
        for (header, _) in &descriptors {
            if let Some(key) = header.key() {
                *counts.entry(key).or_default() += 1;
            }
        }
        let mut arenas: BTreeMap<ArenaKey, PackedArena<D>> = counts
            .into_iter()
            .map(|(key, count)| {
                let mut arena = PackedArena::new(key);
                arena.realloc_no_copy(count);
                (key, arena)
            })
            .collect();
        for (header, payload) in descriptors {
            if let Some(arena) = header.key().and_then(|key| arenas.get_mut(&key)) {
                arena.push(header, &payload);
            }
        }
        Self { arenas }
    }

    pub fn arena(&self, key: &ArenaKey) -> Option<&PackedArena<D>> {
        self.arenas.get(key)
    }

    pub fn arenas(&self) -> impl Iterator<Item = &PackedArena<D>> {
        self.arenas.values()
    }

    /// All descriptors of the given kind.
    pub fn iter_kind(&self, kind: DescriptorKind) -> impl Iterator<Item = PackedGeometry<'_, D>> {
        self.arenas
            .values()
            .filter(move |arena| arena.key().kind == kind)
            .flat_map(|arena| arena.iter())
    }

    /// Total number of descriptors.
    pub fn len(&self) -> usize {
        self.arenas.values().map(PackedArena::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
