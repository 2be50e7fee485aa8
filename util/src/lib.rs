//! Test helpers shared by the crates in the workspace.

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Asserts that two points are within the given Euclidean distance of each other.
#[macro_export]
macro_rules! assert_points_close {
    ($x:expr, $y:expr, tol = $tol:expr) => {{
        let dist = (&$x - &$y).norm();
        if !(dist <= $tol) {
            panic!(
                "points not within tolerance {:e}: left = {}, right = {}, distance = {:e}",
                $tol, $x, $y, dist
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Offsets of consecutive blocks with the given sizes, starting at `x0`.
pub fn prefix_sum(counts: impl IntoIterator<Item = usize>, x0: usize) -> impl Iterator<Item = usize> {
    counts.into_iter().scan(x0, |sum, x| {
        let current = *sum;
        *sum += x;
        Some(current)
    })
}

/// Uniformly spaced sample points on `[a, b]`, including both end points.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|i| a + (b - a) * (i as f64) / ((n - 1) as f64))
            .collect(),
    }
}
