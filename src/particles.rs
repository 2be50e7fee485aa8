//! A minimal particle container.
//!
//! Particles carry a position, an owning cell, a rank record and any number of named per-particle
//! fields ("dats") with a fixed number of real or integer components.
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use nalgebra::{DefaultAllocator, OPoint};

use crate::allocators::DimAllocator;
use crate::SmallDim;

/// Name of the dat holding reference coordinates written by point location.
pub const REFERENCE_POSITIONS: &str = "NESO_REFERENCE_POSITIONS";

/// A typed dat name.
pub struct Sym<T> {
    name: String,
    marker: PhantomData<T>,
}

impl<T> Sym<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Sym<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> PartialEq for Sym<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Sym<T> {}

impl<T> fmt::Debug for Sym<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({:?})", self.name)
    }
}

/// Per-particle values with a fixed number of components, stored particle by particle.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleDat<T> {
    ncomp: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> ParticleDat<T> {
    pub fn new(ncomp: usize, num_particles: usize) -> Self {
        Self {
            ncomp,
            data: vec![T::default(); ncomp * num_particles],
        }
    }

    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    pub fn len(&self) -> usize {
        if self.ncomp == 0 {
            0
        } else {
            self.data.len() / self.ncomp
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, particle: usize) -> &[T] {
        &self.data[particle * self.ncomp..(particle + 1) * self.ncomp]
    }

    pub fn get_mut(&mut self, particle: usize) -> &mut [T] {
        &mut self.data[particle * self.ncomp..(particle + 1) * self.ncomp]
    }

    fn push_default(&mut self) {
        self.data.extend(std::iter::repeat(T::default()).take(self.ncomp));
    }
}

/// Scalar types that dats can hold.
pub trait DatType: Copy + Default + Send + Sync + 'static {
    fn dats<D>(group: &ParticleGroup<D>) -> &BTreeMap<String, ParticleDat<Self>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>;

    fn dats_mut<D>(group: &mut ParticleGroup<D>) -> &mut BTreeMap<String, ParticleDat<Self>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>;
}

impl DatType for f64 {
    fn dats<D>(group: &ParticleGroup<D>) -> &BTreeMap<String, ParticleDat<f64>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        &group.real_dats
    }

    fn dats_mut<D>(group: &mut ParticleGroup<D>) -> &mut BTreeMap<String, ParticleDat<f64>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        &mut group.real_dats
    }
}

impl DatType for i64 {
    fn dats<D>(group: &ParticleGroup<D>) -> &BTreeMap<String, ParticleDat<i64>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        &group.int_dats
    }

    fn dats_mut<D>(group: &mut ParticleGroup<D>) -> &mut BTreeMap<String, ParticleDat<i64>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        &mut group.int_dats
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleGroup<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    positions: Vec<OPoint<f64, D>>,
    cells: Vec<Option<usize>>,
    /// Owning rank of the particle's cell and a mapped flag.
    ranks: ParticleDat<i64>,
    real_dats: BTreeMap<String, ParticleDat<f64>>,
    int_dats: BTreeMap<String, ParticleDat<i64>>,
}

impl<D> Default for ParticleGroup<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            cells: Vec::new(),
            ranks: ParticleDat::new(2, 0),
            real_dats: BTreeMap::new(),
            int_dats: BTreeMap::new(),
        }
    }
}

impl<D> ParticleGroup<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = OPoint<f64, D>>) -> Self {
        let mut group = Self::new();
        for x in positions {
            group.add_particle(x);
        }
        group
    }

    /// Adds an unmapped particle and returns its index. Existing dats are extended with zeros.
    pub fn add_particle(&mut self, position: OPoint<f64, D>) -> usize {
        self.positions.push(position);
        self.cells.push(None);
        self.ranks.push_default();
        self.ranks.get_mut(self.positions.len() - 1)[0] = -1;
        self.real_dats.values_mut().for_each(ParticleDat::push_default);
        self.int_dats.values_mut().for_each(ParticleDat::push_default);
        self.positions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[OPoint<f64, D>] {
        &self.positions
    }

    pub fn position(&self, particle: usize) -> &OPoint<f64, D> {
        &self.positions[particle]
    }

    pub fn set_position(&mut self, particle: usize, position: OPoint<f64, D>) {
        self.positions[particle] = position;
    }

    /// Local id of the cell owning the particle, if it has been located.
    pub fn cell(&self, particle: usize) -> Option<usize> {
        self.cells[particle]
    }

    pub fn set_cell(&mut self, particle: usize, cell: Option<usize>) {
        self.cells[particle] = cell;
    }

    /// Rank owning the particle's cell, `-1` if unknown.
    pub fn rank(&self, particle: usize) -> i64 {
        self.ranks.get(particle)[0]
    }

    pub fn is_mapped(&self, particle: usize) -> bool {
        self.ranks.get(particle)[1] != 0
    }

    pub fn set_rank(&mut self, particle: usize, rank: i64, mapped: bool) {
        let entry = self.ranks.get_mut(particle);
        entry[0] = rank;
        entry[1] = mapped as i64;
    }

    pub fn contains_dat<T: DatType>(&self, sym: &Sym<T>) -> bool {
        T::dats(self).contains_key(sym.name())
    }

    /// Creates a zero-initialized dat with `ncomp` components if it does not exist yet.
    ///
    /// # Panics
    ///
    /// Panics if the dat exists with fewer than `ncomp` components.
    pub fn add_dat<T: DatType>(&mut self, sym: &Sym<T>, ncomp: usize) {
        let num_particles = self.len();
        let dat = T::dats_mut(self)
            .entry(sym.name().to_string())
            .or_insert_with(|| ParticleDat::new(ncomp, num_particles));
        assert!(
            dat.ncomp() >= ncomp,
            "Dat {} has {} components, {} required.",
            sym.name(),
            dat.ncomp(),
            ncomp
        );
    }

    pub fn dat<T: DatType>(&self, sym: &Sym<T>) -> Option<&ParticleDat<T>> {
        T::dats(self).get(sym.name())
    }

    pub fn dat_mut<T: DatType>(&mut self, sym: &Sym<T>) -> Option<&mut ParticleDat<T>> {
        T::dats_mut(self).get_mut(sym.name())
    }

    /// Returns the dat, asserting that it exists and has at least `ncomp` components.
    pub fn require_dat<T: DatType>(&self, sym: &Sym<T>, ncomp: usize) -> &ParticleDat<T> {
        let dat = self
            .dat(sym)
            .unwrap_or_else(|| panic!("Particle group has no dat {}.", sym.name()));
        assert!(
            dat.ncomp() >= ncomp,
            "Dat {} has {} components, {} required.",
            sym.name(),
            dat.ncomp(),
            ncomp
        );
        dat
    }

    /// Mutable variant of [`require_dat`](Self::require_dat).
    pub fn require_dat_mut<T: DatType>(&mut self, sym: &Sym<T>, ncomp: usize) -> &mut ParticleDat<T> {
        let name = sym.name().to_string();
        let dat = T::dats_mut(self)
            .get_mut(&name)
            .unwrap_or_else(|| panic!("Particle group has no dat {}.", name));
        assert!(
            dat.ncomp() >= ncomp,
            "Dat {} has {} components, {} required.",
            name,
            dat.ncomp(),
            ncomp
        );
        dat
    }
}
