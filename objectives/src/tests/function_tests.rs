//! Raw function tests.

use crate::config::BenchmarkFunction;
use crate::functions::{ellipsoid, evaluate, rastrigin, rosenbrock, sphere};

#[test]
fn should_vanish_at_origin_for_every_function() {
    let z = [0.0; 4];
    for function in BenchmarkFunction::ALL {
        let v = evaluate(function, &z);
        assert!(v.abs() < 1e-12, "{} should be 0 at the origin, got {}", function, v);
    }
}

#[test]
fn should_be_positive_away_from_origin() {
    let z = [0.3, -0.7, 1.1];
    for function in BenchmarkFunction::ALL {
        if function == BenchmarkFunction::Constant {
            continue;
        }
        assert!(evaluate(function, &z) > 0.0, "{} should be positive off the optimum", function);
    }
}

#[test]
fn should_sum_squares_for_sphere() {
    assert!((sphere(&[1.0, 2.0, -2.0]) - 9.0).abs() < 1e-12);
}

#[test]
fn should_weight_last_ellipsoid_axis_by_condition() {
    assert!((ellipsoid(&[1.0, 0.0]) - 1.0).abs() < 1e-9);
    assert!((ellipsoid(&[0.0, 1.0]) - 1e6).abs() < 1e-3);
    assert!((ellipsoid(&[2.0]) - 4.0).abs() < 1e-12, "1-d ellipsoid is a parabola");
}

#[test]
fn should_match_textbook_rosenbrock_after_shift() {
    // z = x - 1, so z = (-1, -1) is the textbook origin: f(0, 0) = 1
    assert!((rosenbrock(&[-1.0, -1.0]) - 1.0).abs() < 1e-12);
    // textbook f(-1, 1) = 4
    assert!((rosenbrock(&[-2.0, 0.0]) - 4.0).abs() < 1e-12);
}

#[test]
fn should_have_local_minima_for_rastrigin() {
    // integer points are local minima with value sum(z^2)
    assert!((rastrigin(&[1.0, 0.0]) - 1.0).abs() < 1e-9);
    assert!(rastrigin(&[0.5, 0.0]) > rastrigin(&[1.0, 0.0]));
}
