use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use numeric_literals::replace_numeric_literals;
use particle_mesh_optimize::calculus::{DifferentiableVectorFunction, VectorFunction, VectorFunctionBuilder};
use particle_mesh_optimize::newton::*;
use std::error::Error;

struct MockLinearVectorFunction;

impl VectorFunction<f64, nalgebra::U3> for MockLinearVectorFunction {
    #[replace_numeric_literals(f64::from(literal))]
    fn eval(&mut self, x: &Vector3<f64>) -> Vector3<f64> {
        let a = Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4);
        let b = Vector3::new(1, 2, 3);
        a * x - b
    }
}

impl DifferentiableVectorFunction<f64, nalgebra::U3> for MockLinearVectorFunction {
    #[replace_numeric_literals(f64::from(literal))]
    fn solve_jacobian_system(&mut self, _x: &Vector3<f64>, rhs: &Vector3<f64>) -> Result<Vector3<f64>, Box<dyn Error>> {
        let a = Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4);
        let a_inv = a.try_inverse().unwrap();
        Ok(a_inv * rhs)
    }
}

#[test]
fn newton_converges_in_single_iteration_for_linear_system() {
    let expected_solution = Vector3::new(-0.125, 0.16666667, 0.72916667);

    let settings = NewtonSettings {
        max_iterations: Some(2),
        tolerance: Vector3::new(1.0, 2.0, 3.0).norm() * 1e-6,
    };

    let mut x = Vector3::zeros();
    let outcome = newton(MockLinearVectorFunction, &mut x, settings).expect("Newton iterations must succeed");
    let diff = x - expected_solution;
    assert!(diff.norm() < 1e-6);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.converged);
}

fn quadratic_system() -> impl DifferentiableVectorFunction<f64, nalgebra::U2> {
    // F(x) = [x0^2 - 2, x1 - x0], root at (sqrt 2, sqrt 2)
    VectorFunctionBuilder::with_function(|x: &Vector2<f64>| Vector2::new(x[0] * x[0] - 2.0, x[1] - x[0]))
        .with_jacobian_solver(|x: &Vector2<f64>, rhs: &Vector2<f64>| {
            let j = Matrix2::new(2.0 * x[0], 0.0, -1.0, 1.0);
            j.lu()
                .solve(rhs)
                .ok_or_else(|| Box::<dyn Error>::from("singular Jacobian"))
        })
}

#[test]
fn newton_reports_non_convergence_without_error() {
    let settings = NewtonSettings {
        max_iterations: Some(1),
        tolerance: 1e-14,
    };
    let mut x = Vector2::new(10.0, 0.0);
    let outcome = newton(quadratic_system(), &mut x, settings).unwrap();
    assert!(!outcome.converged);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.residual_norm > 1e-14);
}

#[test]
fn newton_with_backtracking_converges_for_quadratic_system() {
    let settings = NewtonSettings {
        max_iterations: Some(50),
        tolerance: 1e-12,
    };
    let mut x = Vector2::new(10.0, 0.0);
    let outcome = newton_line_search(quadratic_system(), &mut x, settings, &mut BacktrackingLineSearch).unwrap();
    assert!(outcome.converged);
    assert!((x[0] - 2.0f64.sqrt()).abs() < 1e-10);
    assert!((x[1] - 2.0f64.sqrt()).abs() < 1e-10);
}

#[test]
fn newton_propagates_jacobian_failure() {
    let f = VectorFunctionBuilder::with_function(|x: &Vector2<f64>| Vector2::new(x[0] * x[0] + 1.0, 0.0))
        .with_jacobian_solver(|_: &Vector2<f64>, _: &Vector2<f64>| Err(Box::<dyn Error>::from("singular")));
    let settings = NewtonSettings {
        max_iterations: Some(10),
        tolerance: 1e-12,
    };
    let mut x = Vector2::new(0.0, 0.0);
    let result = newton(f, &mut x, settings);
    assert!(matches!(result, Err(NewtonError::JacobianError(_))));
}
