use pairs_quant::analytics::{adf_test, AdfOutcome, ADF_MIN_OBSERVATIONS};

/// Deterministic xorshift noise in [-1, 1).
struct Noise(u64);

impl Noise {
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }
}

fn ar1(phi: f64, n: usize, seed: u64) -> Vec<f64> {
    let mut noise = Noise(seed);
    let mut x = 0.0;
    (0..n)
        .map(|_| {
            x = phi * x + noise.next();
            x
        })
        .collect()
}

#[test]
fn five_points_is_insufficient() {
    let outcome = adf_test(&[1.0, 2.0, 1.5, 1.7, 1.2]);
    assert_eq!(
        outcome,
        AdfOutcome::InsufficientData {
            required: ADF_MIN_OBSERVATIONS,
            available: 5
        }
    );
    assert_eq!(outcome.statistic(), None);
    assert!(outcome.error().unwrap().contains("at least 10"));
}

#[test]
/// Verifies that missing values are dropped before counting observations.
fn missing_values_are_dropped_first() {
    let mut values = ar1(0.2, 9, 7);
    values.extend([f64::NAN, f64::NAN, f64::INFINITY]);
    match adf_test(&values) {
        AdfOutcome::InsufficientData { available, .. } => assert_eq!(available, 9),
        other => panic!("expected insufficient data, got {:?}", other),
    }
}

#[test]
/// Verifies a strongly mean-reverting AR(1) series is reported stationary.
fn stationary_series_rejects_unit_root() {
    for seed in [1u64, 42, 2024] {
        let values = ar1(0.3, 400, seed);
        match adf_test(&values) {
            AdfOutcome::Computed(result) => {
                assert!(result.p_value < 0.05, "seed {} p = {}", seed, result.p_value);
                assert!(result.statistic < result.critical_values.five_pct);
                assert!(result.is_stationary_at(0.05));
                assert!(result.n_obs < values.len());
            }
            other => panic!("seed {}: expected a statistic, got {:?}", seed, other),
        }
    }
}

#[test]
fn ten_points_is_enough_to_attempt() {
    let values = ar1(0.1, ADF_MIN_OBSERVATIONS, 99);
    let outcome = adf_test(&values);
    assert!(
        !matches!(outcome, AdfOutcome::InsufficientData { .. }),
        "got {:?}",
        outcome
    );
}

#[test]
/// Verifies a degenerate (constant) series fails explicitly instead of panicking.
fn constant_series_reports_failure() {
    let outcome = adf_test(&[3.0; 30]);
    match &outcome {
        AdfOutcome::Failed(reason) => assert!(!reason.is_empty()),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(outcome.p_value(), None);
    assert!(outcome.error().unwrap().starts_with("ADF test failed"));
}

#[test]
/// Verifies a random walk is computed and does not reject the unit root.
fn random_walk_keeps_unit_root() {
    let walk: Vec<f64> = {
        let mut noise = Noise(5);
        let mut x = 100.0;
        (0..200)
            .map(|_| {
                x += noise.next();
                x
            })
            .collect()
    };
    match adf_test(&walk) {
        AdfOutcome::Computed(result) => {
            assert!((0.0..=1.0).contains(&result.p_value));
            assert!(result.p_value > 0.05, "p = {}", result.p_value);
            assert!(!result.is_stationary_at(0.05));
        }
        other => panic!("expected a statistic, got {:?}", other),
    }
}
