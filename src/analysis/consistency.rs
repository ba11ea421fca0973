//! Reconciles the classifier's verdict with the measured heart rate
//!
//! A heuristic sanity check, not a medical rule: when the model reports a
//! slow or fast rhythm but the counted beats sit in the normal range, the
//! verdict is overridden to Normal and flagged as inconsistent.

use crate::types::{Resolution, RhythmLabel};

/// Lowest BPM that overrides a bradycardia verdict
pub const NORMAL_BPM_MIN: f64 = 60.0;

/// Highest BPM that still counts as normal
pub const NORMAL_BPM_MAX: f64 = 100.0;

/// Resolve the final label from the predicted label and measured BPM
pub fn resolve(predicted: RhythmLabel, bpm: Option<f64>) -> Resolution {
    let overridden = Resolution {
        final_label: RhythmLabel::Normal,
        inconsistent: true,
    };

    match (predicted, bpm) {
        (RhythmLabel::Bradycardia, Some(bpm)) if (NORMAL_BPM_MIN..=NORMAL_BPM_MAX).contains(&bpm) => {
            overridden
        }
        (RhythmLabel::Tachycardia, Some(bpm)) if bpm <= NORMAL_BPM_MAX => overridden,
        _ => Resolution {
            final_label: predicted,
            inconsistent: false,
        },
    }
}
