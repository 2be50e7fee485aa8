use nalgebra::{DefaultAllocator, OPoint};

use crate::allocators::DimAllocator;
use crate::element::GeometryOrder;
use crate::locate::{CellStage, LocateStage};
use crate::mapping::{MappingResult, MappingSettings, NewtonStrategy};
use crate::packed::{DescriptorKind, PackedGeometry, PackedStore};
use crate::MeshDim;

/// Maps points into packed element descriptors by Newton iteration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonStage {
    stage: LocateStage,
    settings: MappingSettings,
    strategy: NewtonStrategy,
    /// Accept linear elements besides curved ones.
    include_linear: bool,
}

impl NewtonStage {
    /// Linear elements with a non-affine map, with full Newton steps.
    pub fn deformed(settings: MappingSettings) -> Self {
        Self {
            stage: LocateStage::Deformed,
            settings,
            strategy: NewtonStrategy::Plain,
            include_linear: true,
        }
    }

    /// Curved elements, or all elements if `include_linear`, with line-search Newton.
    pub fn generic(settings: MappingSettings, include_linear: bool) -> Self {
        Self {
            stage: LocateStage::Generic,
            settings,
            strategy: NewtonStrategy::LineSearch,
            include_linear,
        }
    }

    fn accepts<D>(&self, geometry: &PackedGeometry<'_, D>) -> bool
    where
        D: MeshDim,
        DefaultAllocator: DimAllocator<f64, D>,
    {
        match self.stage {
            LocateStage::Deformed => geometry.order() == GeometryOrder::Linear,
            _ => self.include_linear || geometry.order() != GeometryOrder::Linear,
        }
    }
}

impl<D> CellStage<D> for NewtonStage
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn stage(&self) -> LocateStage {
        self.stage
    }

    fn map_point(&self, store: &PackedStore<D>, x: &OPoint<f64, D>) -> Option<MappingResult<D>> {
        store
            .iter_kind(DescriptorKind::Element)
            .filter(|geometry| self.accepts(geometry))
            .find_map(|geometry| {
                let nodes = geometry.nodes();
                let result = D::cell_mapping_inverse(
                    geometry.shape(),
                    geometry.order(),
                    &nodes,
                    x,
                    &self.settings,
                    self.strategy,
                )?;
                result.found.then(|| result.with_cell(geometry.id()))
            })
    }
}
