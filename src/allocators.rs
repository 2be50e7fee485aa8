//! Helper traits for allocator trait bounds.
pub use particle_mesh_traits::allocators::*;
