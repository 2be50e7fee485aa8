//! Helper traits for allocator trait bounds.
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, Scalar, U1};

/// An allocator for a single dimension.
///
/// Besides `T`, it provides allocators for the integer and float types used by cartesian
/// cell tuples and packed descriptors, so that generic code only needs a single bound.
/// Owned vectors and matrices of these types can be shared between threads, which the
/// parallel particle loops rely on.
pub trait DimAllocator<T: Scalar, D: DimName>:
Allocator<T, D, Buffer: Send + Sync>
+ Allocator<T, D, D, Buffer: Send + Sync>
+ Allocator<T, U1, D>
// Used for decompositions
+ Allocator<usize, D, Buffer: Send + Sync>
+ Allocator<(usize, usize), D>
+ Allocator<f64, D, Buffer: Send + Sync>
+ Allocator<f64, D, D, Buffer: Send + Sync>
+ Allocator<i64, D, Buffer: Send + Sync>
+ Allocator<usize, D, D>
+ Allocator<bool, D>
{}

impl<T, D> DimAllocator<T, D> for DefaultAllocator
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D, Buffer: Send + Sync>
        + Allocator<T, D, D, Buffer: Send + Sync>
        + Allocator<T, U1, D>
        + Allocator<usize, D, Buffer: Send + Sync>
        + Allocator<(usize, usize), D>
        + Allocator<f64, D, Buffer: Send + Sync>
        + Allocator<f64, D, D, Buffer: Send + Sync>
        + Allocator<i64, D, Buffer: Send + Sync>
        + Allocator<usize, D, D>
        + Allocator<bool, D>,
{
}

/// An allocator for two dimensions.
pub trait BiDimAllocator<T: Scalar, D1: DimName, D2: DimName>:
    DimAllocator<T, D1> + DimAllocator<T, D2> + Allocator<T, D1, D2> + Allocator<T, D2, D1>
{
}

impl<T: Scalar, D1: DimName, D2: DimName> BiDimAllocator<T, D1, D2> for DefaultAllocator where
    DefaultAllocator: DimAllocator<T, D1> + DimAllocator<T, D2> + Allocator<T, D1, D2> + Allocator<T, D2, D1>
{
}
