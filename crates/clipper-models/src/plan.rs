//! Clip split planning.
//!
//! Pure, deterministic splitting of a source duration into clip segments.
//! No I/O happens here; the planner is exercised heavily by tests and the
//! pipeline trusts its output ordering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target length of a regular segment, in seconds.
pub const DEFAULT_TARGET_SECS: f64 = 120.0;
/// Lower bound for the final segment, in seconds.
pub const DEFAULT_FINAL_MIN_SECS: f64 = 120.0;
/// Upper bound (exclusive) for the final segment, in seconds.
pub const DEFAULT_FINAL_MAX_SECS: f64 = 240.0;
/// Default prefix for the human label of each clip.
pub const DEFAULT_PART_PREFIX: &str = "Parte";

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    /// The caller violated the planner's input contract.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

/// A planned segment of a source video.
///
/// Segments are contiguous and non-overlapping; `index` is the 0-based
/// position in both render and publish order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub index: u32,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Human label, e.g. `"Parte 3"` (1-based).
    pub label: String,
}

impl ClipPlan {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// 1-based clip number as shown to the operator.
    pub fn number(&self) -> u32 {
        self.index + 1
    }
}

/// Split `duration_secs` into segments of roughly `target_secs` each.
///
/// Every segment except the last has length exactly `target_secs`; a tail
/// shorter than `final_min_secs` is merged into the preceding segment so
/// the final segment's length falls within `[final_min_secs,
/// final_max_secs)`. A source no longer than `final_max_secs` yields a
/// single segment covering the whole duration.
///
/// Non-positive durations are an input-contract violation, never silently
/// handled.
pub fn plan_clips(
    duration_secs: f64,
    target_secs: f64,
    final_min_secs: f64,
    final_max_secs: f64,
    label_prefix: &str,
) -> Result<Vec<ClipPlan>, PlanError> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(PlanError::ContractViolation(format!(
            "duration must be positive, got {duration_secs}"
        )));
    }
    if target_secs <= 0.0 || final_min_secs <= 0.0 || final_max_secs <= final_min_secs {
        return Err(PlanError::ContractViolation(format!(
            "invalid segment bounds: target={target_secs} min={final_min_secs} max={final_max_secs}"
        )));
    }

    let mut segments: Vec<(f64, f64)> = Vec::new();
    if duration_secs <= final_max_secs {
        segments.push((0.0, duration_secs));
    } else {
        let mut start = 0.0;
        // Emit full target-sized segments while the remainder still exceeds
        // what a single final segment may hold.
        while duration_secs - start >= final_max_secs {
            segments.push((start, start + target_secs));
            start += target_secs;
        }
        segments.push((start, duration_secs));
    }

    Ok(segments
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| ClipPlan {
            index: i as u32,
            start_secs: start,
            end_secs: end,
            label: format!("{} {}", label_prefix, i + 1),
        })
        .collect())
}

/// [`plan_clips`] with the 2-minute target and the [2, 4) minute tail rule.
pub fn plan_default(duration_secs: f64) -> Result<Vec<ClipPlan>, PlanError> {
    plan_clips(
        duration_secs,
        DEFAULT_TARGET_SECS,
        DEFAULT_FINAL_MIN_SECS,
        DEFAULT_FINAL_MAX_SECS,
        DEFAULT_PART_PREFIX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(plan: &[ClipPlan], duration: f64) {
        assert_eq!(plan[0].start_secs, 0.0);
        for pair in plan.windows(2) {
            assert_eq!(pair[0].end_secs, pair[1].start_secs);
        }
        assert_eq!(plan.last().unwrap().end_secs, duration);
    }

    #[test]
    fn test_short_source_is_a_single_segment() {
        for d in [1.0, 90.0, 120.0, 239.9, 240.0] {
            let plan = plan_default(d).unwrap();
            assert_eq!(plan.len(), 1, "duration {d}");
            assert_eq!(plan[0].start_secs, 0.0);
            assert_eq!(plan[0].end_secs, d);
        }
    }

    #[test]
    fn test_long_source_segments_are_target_sized_with_bounded_tail() {
        for d in [241.0, 300.0, 360.0, 480.0, 605.0, 3600.0, 7201.5] {
            let plan = plan_default(d).unwrap();
            assert!(plan.len() > 1, "duration {d}");
            assert_contiguous(&plan, d);
            for clip in &plan[..plan.len() - 1] {
                assert_eq!(clip.duration_secs(), 120.0, "duration {d}");
            }
            let tail = plan.last().unwrap().duration_secs();
            assert!((120.0..240.0).contains(&tail), "duration {d}, tail {tail}");
        }
    }

    #[test]
    fn test_605_seconds_yields_five_segments_with_merged_tail() {
        let plan = plan_default(605.0).unwrap();
        assert_eq!(plan.len(), 5);
        let bounds: Vec<(f64, f64)> = plan.iter().map(|c| (c.start_secs, c.end_secs)).collect();
        assert_eq!(
            bounds,
            vec![
                (0.0, 120.0),
                (120.0, 240.0),
                (240.0, 360.0),
                (360.0, 480.0),
                (480.0, 605.0),
            ]
        );
        assert_eq!(plan[4].duration_secs(), 125.0);
    }

    #[test]
    fn test_labels_are_one_based() {
        let plan = plan_default(605.0).unwrap();
        assert_eq!(plan[0].label, "Parte 1");
        assert_eq!(plan[4].label, "Parte 5");
        assert_eq!(plan[4].number(), 5);

        let plan = plan_clips(605.0, 120.0, 120.0, 240.0, "Part").unwrap();
        assert_eq!(plan[0].label, "Part 1");
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        assert!(matches!(
            plan_default(0.0),
            Err(PlanError::ContractViolation(_))
        ));
        assert!(matches!(
            plan_default(-10.0),
            Err(PlanError::ContractViolation(_))
        ));
        assert!(matches!(
            plan_default(f64::NAN),
            Err(PlanError::ContractViolation(_))
        ));
    }
}
