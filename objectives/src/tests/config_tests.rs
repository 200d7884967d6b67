//! Configuration tests.

use crate::config::{BenchmarkConfig, BenchmarkError, BenchmarkFunction};

#[test]
fn should_parse_every_function_name() {
    for function in BenchmarkFunction::ALL {
        let parsed: BenchmarkFunction = function.as_str().parse().unwrap();
        assert_eq!(parsed, function);
    }
}

#[test]
fn should_reject_unknown_function_name() {
    let err = "himmelblau".parse::<BenchmarkFunction>().unwrap_err();
    assert_eq!(err, BenchmarkError::UnknownFunction("himmelblau".to_string()));
}

#[test]
fn should_default_to_shifted_five_box() {
    let config = BenchmarkConfig::new(BenchmarkFunction::Sphere, 3);
    assert_eq!(config.lower, -5.0);
    assert_eq!(config.upper, 5.0);
    assert!(config.shift);
    assert_eq!(config.tolerance, 1e-8);
    assert!(config.validate().is_ok());
}

#[test]
fn should_reject_one_dimensional_rosenbrock() {
    let config = BenchmarkConfig::new(BenchmarkFunction::Rosenbrock, 1);
    assert!(matches!(
        config.validate(),
        Err(BenchmarkError::InvalidDimension { dim: 1, .. })
    ));
}

#[test]
fn should_reject_zero_dimensions() {
    let config = BenchmarkConfig::new(BenchmarkFunction::Sphere, 0);
    assert!(config.validate().is_err(), "Should reject an empty search space");
}

#[test]
fn should_reject_inverted_bounds() {
    let config = BenchmarkConfig::new(BenchmarkFunction::Sphere, 2).with_bounds(1.0, -1.0);
    assert!(matches!(config.validate(), Err(BenchmarkError::InvalidBounds { .. })));
}
