//! Completion percentage for a roadmap.
//!
//! Rule: `round_half_up(100 * completed / total)`, clamped to `[0, 100]`,
//! and `0` for a roadmap with no steps. Integer arithmetic only, so 1/8
//! rounds to 13 and 1/3 to 33 with no float drift.

use crate::models::roadmap::RoadmapStep;

pub fn progress_pct(steps: &[RoadmapStep]) -> u8 {
    let completed = steps.iter().filter(|s| s.completed).count();
    percentage(completed, steps.len())
}

pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    // floor(100c/t + 1/2) == floor((200c + t) / 2t)
    ((200 * completed + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(flags: &[bool]) -> Vec<RoadmapStep> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &completed)| RoadmapStep {
                order: i as u32 + 1,
                label: format!("Step {}", i + 1),
                est_time: "1 week".to_string(),
                completed,
            })
            .collect()
    }

    #[test]
    fn test_empty_roadmap_is_zero() {
        assert_eq!(progress_pct(&[]), 0);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_thirds_round_to_nearest() {
        assert_eq!(progress_pct(&steps(&[false, true, false])), 33);
        assert_eq!(progress_pct(&steps(&[true, true, false])), 67);
        assert_eq!(progress_pct(&steps(&[true, true, true])), 100);
    }

    #[test]
    fn test_exact_half_rounds_up() {
        // 12.5 -> 13, 62.5 -> 63
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 8), 63);
        // 0.5 -> 1
        assert_eq!(percentage(1, 200), 1);
    }

    #[test]
    fn test_clamped_when_completed_exceeds_total() {
        assert_eq!(percentage(7, 5), 100);
    }

    #[test]
    fn test_matches_float_rule_for_small_roadmaps() {
        for total in 1..=40usize {
            for completed in 0..=total {
                let expected = (100.0 * completed as f64 / total as f64 + 0.5).floor() as u8;
                assert_eq!(
                    percentage(completed, total),
                    expected,
                    "{completed}/{total} should round to {expected}"
                );
            }
        }
    }
}
