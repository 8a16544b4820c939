//! Fold-change normalization of mutant versus wild-type measurements.
//!
//! Results are signed: a value `>= 1` means the mutant reads N-fold higher,
//! a value `<= -1` means N-fold lower. Zero means the row carries no
//! comparable measurement.

pub const ACTIVITY_AFFINITY: &str = "Activity/affinity";
pub const FOLD_EFFECT: &str = "Fold effect (mut/wt)";

/// Measurement types reported as negative logarithms.
pub const LOG_SCALE_PREFIXES: [&str; 3] = ["pEC50", "pIC50", "pK"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Log,
    Linear,
}

impl Scale {
    pub fn of(measurement_type: &str) -> Self {
        if LOG_SCALE_PREFIXES
            .iter()
            .any(|prefix| measurement_type.starts_with(prefix))
        {
            Scale::Log
        } else {
            Scale::Linear
        }
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Turns a ratio in (0, 1) into its negated reciprocal. The ratio is rounded
/// first, so anything below 0.0005 collapses to zero and stays there.
fn signed_fold(ratio: f64) -> f64 {
    let ratio = round3(ratio);
    if ratio > 0.0 && ratio < 1.0 {
        -round3(1.0 / ratio)
    } else {
        ratio
    }
}

pub fn fold_change(effect_type: &str, measurement_type: &str, wt_value: i64, mu_value: i64) -> f64 {
    match effect_type {
        ACTIVITY_AFFINITY if wt_value != 0 => {
            let (wt, mu) = (wt_value as f64, mu_value as f64);
            let ratio = match Scale::of(measurement_type) {
                Scale::Log => 10f64.powf(-mu) / 10f64.powf(-wt),
                Scale::Linear => mu / wt,
            };
            if ratio.is_finite() {
                signed_fold(ratio)
            } else {
                0.0
            }
        }
        FOLD_EFFECT => signed_fold(mu_value as f64),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_scale_gain() {
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "pIC50", 7, 5), 100.0);
    }

    #[test]
    fn log_scale_loss_is_negated() {
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "pIC50", 5, 7), -100.0);
    }

    #[test]
    fn pk_prefix_counts_as_log() {
        assert_eq!(Scale::of("pKi"), Scale::Log);
        assert_eq!(Scale::of("pKb"), Scale::Log);
        assert_eq!(Scale::of("EC50"), Scale::Linear);
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "pKd", 8, 7), 10.0);
    }

    #[test]
    fn linear_ratio() {
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "EC50", 10, 30), 3.0);
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "Ki", 40, 10), -4.0);
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "Ki", 3, 1), -3.003);
    }

    #[test]
    fn zero_wild_type_short_circuits() {
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "pIC50", 0, 9), 0.0);
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "EC50", 0, 9), 0.0);
    }

    #[test]
    fn zero_mutant_is_not_inverted() {
        assert_eq!(fold_change(ACTIVITY_AFFINITY, "EC50", 12, 0), 0.0);
    }

    #[test]
    fn fold_effect_reads_mutant_directly() {
        assert_eq!(fold_change(FOLD_EFFECT, "", 0, 12), 12.0);
        assert_eq!(fold_change(FOLD_EFFECT, "pEC50", 4, 1), 1.0);
        assert_eq!(fold_change(FOLD_EFFECT, "", 0, 0), 0.0);
    }

    #[test]
    fn other_effect_types_are_zero() {
        assert_eq!(fold_change("Expression", "pEC50", 7, 5), 0.0);
        assert_eq!(fold_change("", "", 1, 2), 0.0);
    }
}
