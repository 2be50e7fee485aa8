use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OMatrix, OVector, Scalar};
use numeric_literals::replace_float_literals;
use particle_mesh_traits::Real;
use std::error::Error;

/// A function `R^D -> R^D` of fixed, compile-time dimension.
pub trait VectorFunction<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    fn eval(&mut self, x: &OVector<T, D>) -> OVector<T, D>;
}

impl<T, D, X> VectorFunction<T, D> for &mut X
where
    T: Scalar,
    D: DimName,
    X: VectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    fn eval(&mut self, x: &OVector<T, D>) -> OVector<T, D> {
        X::eval(self, x)
    }
}

pub trait DifferentiableVectorFunction<T, D>: VectorFunction<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// Solves `J(x) sol = rhs` for `sol`, where `J` is the Jacobian of the function.
    fn solve_jacobian_system(&mut self, x: &OVector<T, D>, rhs: &OVector<T, D>)
        -> Result<OVector<T, D>, Box<dyn Error>>;
}

impl<T, D, X> DifferentiableVectorFunction<T, D> for &mut X
where
    T: Scalar,
    D: DimName,
    X: DifferentiableVectorFunction<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    fn solve_jacobian_system(
        &mut self,
        x: &OVector<T, D>,
        rhs: &OVector<T, D>,
    ) -> Result<OVector<T, D>, Box<dyn Error>> {
        X::solve_jacobian_system(self, x, rhs)
    }
}

#[derive(Debug, Clone)]
pub struct VectorFunctionBuilder;

#[derive(Debug, Clone)]
pub struct ConcreteVectorFunction<F, J> {
    function: F,
    jacobian_solver: J,
}

impl VectorFunctionBuilder {
    pub fn with_function<F>(function: F) -> ConcreteVectorFunction<F, ()> {
        ConcreteVectorFunction {
            function,
            jacobian_solver: (),
        }
    }
}

impl<F> ConcreteVectorFunction<F, ()> {
    pub fn with_jacobian_solver<J>(self, jacobian_solver: J) -> ConcreteVectorFunction<F, J> {
        ConcreteVectorFunction {
            function: self.function,
            jacobian_solver,
        }
    }
}

impl<F, J, T, D> VectorFunction<T, D> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    D: DimName,
    F: FnMut(&OVector<T, D>) -> OVector<T, D>,
    DefaultAllocator: Allocator<T, D>,
{
    fn eval(&mut self, x: &OVector<T, D>) -> OVector<T, D> {
        (self.function)(x)
    }
}

impl<F, J, T, D> DifferentiableVectorFunction<T, D> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    D: DimName,
    F: FnMut(&OVector<T, D>) -> OVector<T, D>,
    J: FnMut(&OVector<T, D>, &OVector<T, D>) -> Result<OVector<T, D>, Box<dyn Error>>,
    DefaultAllocator: Allocator<T, D>,
{
    fn solve_jacobian_system(
        &mut self,
        x: &OVector<T, D>,
        rhs: &OVector<T, D>,
    ) -> Result<OVector<T, D>, Box<dyn Error>> {
        (self.jacobian_solver)(x, rhs)
    }
}

/// Approximates the Jacobian of a vector function evaluated at `x`, using
/// central finite differences with resolution `h`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn approximate_jacobian<T, D>(mut f: impl VectorFunction<T, D>, x: &OVector<T, D>, h: T) -> OMatrix<T, D, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D> + Allocator<T, D, D>,
{
    let mut result = OMatrix::<T, D, D>::zeros();

    // x+ := x + h e_j, x- := x - h e_j
    let mut x_plus = x.clone();
    let mut x_minus = x.clone();

    for j in 0..D::dim() {
        x_plus[j] += h;
        x_minus[j] -= h;

        let f_plus = f.eval(&x_plus);
        let f_minus = f.eval(&x_minus);
        result.set_column(j, &((f_plus - f_minus) / (2.0 * h)));

        x_plus[j] = x[j];
        x_minus[j] = x[j];
    }

    result
}
