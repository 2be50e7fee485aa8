use matrixcompare::assert_matrix_eq;
use nalgebra::{Matrix2, Vector2};
use particle_mesh_optimize::calculus::*;

#[test]
fn approximate_jacobian_simple_function() {
    let f = VectorFunctionBuilder::with_function(|x: &Vector2<f64>| {
        let (x1, x2) = (x[0], x[1]);
        Vector2::new(x1 * x2 + 3.0, x1 * x1 + x2 * x2 + x1 + 5.0)
    });

    let h = 1e-6;
    let x = Vector2::new(3.0, 4.0);
    let j = approximate_jacobian(f, &x, h);

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]
    #[rustfmt::skip]
    let expected = Matrix2::new(4.0, 3.0,
                                7.0, 8.0);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
}
