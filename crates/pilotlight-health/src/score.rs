//! Health score computation.

/// Fold a probe result into a scalar health score in `0.0..=1.0`.
///
/// - unreachable stores score 0.0 regardless of lag;
/// - lag at or below `lag_threshold` scores 1.0;
/// - between the threshold and `lag_ceiling` the score decays
///   linearly to 0.0;
/// - unknown lag (standby unreadable) scores 0.5 — reachable but
///   unverified replication withholds full confidence without, on its
///   own, counting as an unhealthy evaluation.
///
/// The lag estimate is a write-then-cross-region-read heuristic, so
/// treat scores near a threshold as approximate.
pub fn health_score(
    reachable: bool,
    lag_seconds: Option<f64>,
    lag_threshold: f64,
    lag_ceiling: f64,
) -> f64 {
    if !reachable {
        return 0.0;
    }
    let Some(lag) = lag_seconds else {
        return 0.5;
    };
    if lag <= lag_threshold {
        return 1.0;
    }
    if lag >= lag_ceiling || lag_ceiling <= lag_threshold {
        return 0.0;
    }
    1.0 - (lag - lag_threshold) / (lag_ceiling - lag_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 60.0;
    const CEILING: f64 = 300.0;

    #[test]
    fn unreachable_is_zero() {
        assert_eq!(health_score(false, Some(0.0), THRESHOLD, CEILING), 0.0);
        assert_eq!(health_score(false, None, THRESHOLD, CEILING), 0.0);
    }

    #[test]
    fn lag_below_threshold_is_full_score() {
        assert_eq!(health_score(true, Some(0.0), THRESHOLD, CEILING), 1.0);
        assert_eq!(health_score(true, Some(59.9), THRESHOLD, CEILING), 1.0);
        assert_eq!(health_score(true, Some(60.0), THRESHOLD, CEILING), 1.0);
    }

    #[test]
    fn lag_decays_linearly_to_ceiling() {
        // Midpoint between threshold and ceiling.
        let mid = health_score(true, Some(180.0), THRESHOLD, CEILING);
        assert!((mid - 0.5).abs() < 1e-9, "midpoint was {mid}");

        let near_ceiling = health_score(true, Some(290.0), THRESHOLD, CEILING);
        assert!(near_ceiling > 0.0 && near_ceiling < 0.1);

        assert_eq!(health_score(true, Some(300.0), THRESHOLD, CEILING), 0.0);
        assert_eq!(health_score(true, Some(1000.0), THRESHOLD, CEILING), 0.0);
    }

    #[test]
    fn unknown_lag_scores_half() {
        assert_eq!(health_score(true, None, THRESHOLD, CEILING), 0.5);
    }

    #[test]
    fn deterministic_for_equal_inputs() {
        for lag in [0.0, 30.0, 90.0, 250.0, 400.0] {
            let a = health_score(true, Some(lag), THRESHOLD, CEILING);
            let b = health_score(true, Some(lag), THRESHOLD, CEILING);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn degenerate_ceiling_never_panics() {
        // Misconfigured ceiling at or below the threshold: anything
        // past the threshold is simply unhealthy.
        assert_eq!(health_score(true, Some(61.0), 60.0, 60.0), 0.0);
        assert_eq!(health_score(true, Some(59.0), 60.0, 30.0), 1.0);
    }
}
