use super::distribution::FrequencyDistribution;

/// Value that marks a generalized-away or suppressed cell.
pub const SUPPRESSED_VALUE: &str = "*";

/// Whether `value` is the suppression marker.
pub fn is_suppressed(value: &str) -> bool {
    value == SUPPRESSED_VALUE
}

/// Drop suppressed entries from `distribution` when `hide` is set.
///
/// Retained values keep the frequency stored at their original position and
/// their relative order. `count` still reports every underlying record.
pub fn hide_suppressed(distribution: FrequencyDistribution, hide: bool) -> FrequencyDistribution {
    if !hide {
        return distribution;
    }
    let retained: Vec<usize> = distribution
        .values()
        .iter()
        .enumerate()
        .filter(|(_, value)| !is_suppressed(value))
        .map(|(index, _)| index)
        .collect();
    if retained.len() == distribution.len() {
        return distribution;
    }

    tracing::trace!(
        kept = retained.len(),
        dropped = distribution.len() - retained.len(),
        "Hiding suppressed values"
    );
    distribution.select(&retained)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(values: &[&str], frequency: &[f64]) -> FrequencyDistribution {
        FrequencyDistribution::new(
            values.iter().map(|v| v.to_string()).collect(),
            frequency.to_vec(),
            10,
        )
        .unwrap()
    }

    #[test]
    fn passthrough_when_not_hiding() {
        let original = dist(&["a", "*", "b"], &[0.5, 0.3, 0.2]);
        assert_eq!(hide_suppressed(original.clone(), false), original);
    }

    #[test]
    fn keeps_original_pairing_after_dropped_entry() {
        let filtered = hide_suppressed(dist(&["a", "*", "b"], &[0.5, 0.3, 0.2]), true);
        assert_eq!(filtered.values(), &["a".to_string(), "b".to_string()]);
        assert_eq!(filtered.frequency(), &[0.5, 0.2]);
        assert_eq!(filtered.count(), 10);
    }

    #[test]
    fn leading_marker_does_not_shift_frequencies() {
        let filtered = hide_suppressed(dist(&["*", "x", "y"], &[0.6, 0.1, 0.3]), true);
        assert_eq!(filtered.frequency_of("x"), Some(0.1));
        assert_eq!(filtered.frequency_of("y"), Some(0.3));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn constructed_marker_strings_are_matched_by_value() {
        let built = String::from_utf8(vec![b'*']).unwrap();
        let original = FrequencyDistribution::new(
            vec!["a".to_string(), built, "b".to_string()],
            vec![0.2, 0.5, 0.3],
            4,
        )
        .unwrap();
        let filtered = hide_suppressed(original, true);
        assert!(filtered.values().iter().all(|value| !is_suppressed(value)));
        assert_eq!(filtered.frequency(), &[0.2, 0.3]);
    }

    #[test]
    fn only_exact_marker_is_hidden() {
        let filtered = hide_suppressed(dist(&["8166*", "*", "**"], &[0.2, 0.5, 0.3]), true);
        assert_eq!(
            filtered.values(),
            &["8166*".to_string(), "**".to_string()]
        );
        assert_eq!(filtered.frequency(), &[0.2, 0.3]);
    }

    #[test]
    fn all_suppressed_yields_empty() {
        let filtered = hide_suppressed(dist(&["*"], &[1.0]), true);
        assert!(filtered.is_empty());
        assert_eq!(filtered.frequency().len(), 0);
    }
}
