use nalgebra::{DefaultAllocator, OPoint};

use crate::allocators::DimAllocator;
use crate::locate::{CellStage, LocateStage};
use crate::mapping::{affine_mapping_result, MappingResult};
use crate::packed::{DescriptorKind, PackedStore};
use crate::MeshDim;

/// Maps points into cells with an affine map using the packed origin and inverse Jacobian.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RegularStage;

impl<D> CellStage<D> for RegularStage
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    fn stage(&self) -> LocateStage {
        LocateStage::Regular
    }

    fn map_point(&self, store: &PackedStore<D>, x: &OPoint<f64, D>) -> Option<MappingResult<D>> {
        store.iter_kind(DescriptorKind::Affine).find_map(|geometry| {
            let origin = geometry.origin()?;
            let inverse_jacobian = geometry.inverse_jacobian()?;
            let result = affine_mapping_result(geometry.shape(), &origin, &inverse_jacobian, x);
            result.found.then(|| result.with_cell(geometry.id()))
        })
    }
}
