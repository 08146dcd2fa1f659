//! Personalization pass: prompt construction, defensive decoding of the
//! model's free-text answer, and renumbering of accepted suggestions.
//!
//! The model is asked for a bare JSON array but routinely wraps it in prose or
//! code fences, so decoding first locates the first parseable JSON array in the
//! text and only then validates it against the step shape.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::prompts::{JSON_ARRAY_ONLY_SYSTEM, PROFILE_GROUNDING_INSTRUCTION};
use crate::models::profile::UserProfile;
use crate::models::roadmap::{RoadmapStep, UserRoadmap};
use crate::roadmap::error::RoadmapError;
use crate::roadmap::prompts::{PERSONALIZE_PROMPT_TEMPLATE, PERSONALIZE_SYSTEM};

/// Upper bound on steps added by one personalization pass.
pub const MAX_SUGGESTED_STEPS: usize = 3;

/// A step as proposed by the model, before renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedStep {
    pub order: u32,
    pub label: String,
    #[serde(rename = "estTime")]
    pub est_time: String,
}

pub fn system_prompt() -> String {
    format!("{PERSONALIZE_SYSTEM} {JSON_ARRAY_ONLY_SYSTEM}")
}

pub fn build_prompt(roadmap: &UserRoadmap, profile: &UserProfile) -> String {
    let steps = serde_json::to_string_pretty(&roadmap.steps).unwrap_or_default();
    let profile = serde_json::to_string_pretty(profile).unwrap_or_default();

    PERSONALIZE_PROMPT_TEMPLATE
        .replace("{roadmap_id}", &roadmap.roadmap_id)
        .replace("{max_steps}", &MAX_SUGGESTED_STEPS.to_string())
        .replace("{grounding}", PROFILE_GROUNDING_INSTRUCTION)
        .replace("{steps}", &steps)
        .replace("{profile}", &profile)
}

/// Returns the first substring of `text` that is a balanced, parseable JSON array.
pub fn extract_first_json_array(text: &str) -> Option<&str> {
    text.match_indices('[').find_map(|(start, _)| {
        let len = balanced_array_len(&text[start..])?;
        let candidate = &text[start..start + len];
        serde_json::from_str::<Value>(candidate)
            .ok()
            .filter(Value::is_array)
            .map(|_| candidate)
    })
}

/// Byte length of the bracketed span at the start of `s`, skipping brackets
/// that appear inside JSON strings.
fn balanced_array_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Decodes and validates the model's answer.
///
/// On success the suggestions are sorted by their proposed `order`, trimmed,
/// and capped at `MAX_SUGGESTED_STEPS`.
pub fn decode_suggestions(text: &str) -> Result<Vec<SuggestedStep>, RoadmapError> {
    let raw = extract_first_json_array(text).ok_or_else(|| {
        RoadmapError::MalformedResponse("no JSON array found in the response".to_string())
    })?;

    let mut suggestions: Vec<SuggestedStep> = serde_json::from_str(raw).map_err(|e| {
        RoadmapError::MalformedResponse(format!("steps do not match the expected shape: {e}"))
    })?;

    if suggestions.is_empty() {
        return Err(RoadmapError::MalformedResponse(
            "the response contained no steps".to_string(),
        ));
    }

    for s in &mut suggestions {
        s.label = s.label.trim().to_string();
        s.est_time = s.est_time.trim().to_string();
        if s.order == 0 {
            return Err(RoadmapError::MalformedResponse(
                "step order must start at 1".to_string(),
            ));
        }
        if s.label.is_empty() || s.est_time.is_empty() {
            return Err(RoadmapError::MalformedResponse(
                "every step needs a label and an estimated time".to_string(),
            ));
        }
    }

    suggestions.sort_by_key(|s| s.order);
    suggestions.truncate(MAX_SUGGESTED_STEPS);
    Ok(suggestions)
}

/// Turns suggestions into roadmap steps numbered after `existing`.
///
/// Suggestions whose label already appears on the roadmap (case-insensitive)
/// are dropped. Assumes `existing` orders are `1..=N`, so the result keeps the
/// combined list contiguous.
pub fn number_new_steps(
    existing: &[RoadmapStep],
    suggestions: Vec<SuggestedStep>,
) -> Vec<RoadmapStep> {
    let mut seen: HashSet<String> = existing.iter().map(|s| normalize(&s.label)).collect();
    let base = existing.len() as u32;

    suggestions
        .into_iter()
        .filter(|s| seen.insert(normalize(&s.label)))
        .enumerate()
        .map(|(i, s)| RoadmapStep {
            order: base + i as u32 + 1,
            label: s.label,
            est_time: s.est_time,
            completed: false,
        })
        .collect()
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::templates::find_template;
    use uuid::Uuid;

    fn suggestion(order: u32, label: &str) -> SuggestedStep {
        SuggestedStep {
            order,
            label: label.to_string(),
            est_time: "1 week".to_string(),
        }
    }

    #[test]
    fn test_extract_bare_array() {
        let text = r#"[{"order":1,"label":"Learn TypeScript","estTime":"2 weeks"}]"#;
        assert_eq!(extract_first_json_array(text), Some(text));
    }

    #[test]
    fn test_extract_array_wrapped_in_prose_and_fences() {
        let text = "Sure! Here are some steps:\n```json\n[{\"order\":1,\"label\":\"A\",\"estTime\":\"1 day\"}]\n```\nGood luck.";
        assert_eq!(
            extract_first_json_array(text),
            Some(r#"[{"order":1,"label":"A","estTime":"1 day"}]"#)
        );
    }

    #[test]
    fn test_extract_ignores_brackets_inside_strings() {
        let text = r#"[{"order":1,"label":"Read \"[RFC] 9110\" ]","estTime":"3 days"}] trailing ]"#;
        assert_eq!(
            extract_first_json_array(text),
            Some(r#"[{"order":1,"label":"Read \"[RFC] 9110\" ]","estTime":"3 days"}]"#)
        );
    }

    #[test]
    fn test_extract_skips_non_json_bracket_prose() {
        let text = r#"[Note] the steps: [{"order":1,"label":"A","estTime":"1 day"}]"#;
        assert_eq!(
            extract_first_json_array(text),
            Some(r#"[{"order":1,"label":"A","estTime":"1 day"}]"#)
        );
    }

    #[test]
    fn test_extract_none_without_array() {
        assert!(extract_first_json_array("I cannot help with that.").is_none());
        assert!(extract_first_json_array(r#"{"order":1}"#).is_none());
        assert!(extract_first_json_array(r#"[{"order":1"#).is_none());
    }

    #[test]
    fn test_decode_valid_response_sorted_and_trimmed() {
        let text = r#"[
            {"order": 2, "label": "  Contribute to open source ", "estTime": "4 weeks"},
            {"order": 1, "label": "Learn TypeScript", "estTime": " 2 weeks "}
        ]"#;
        let steps = decode_suggestions(text).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].label, "Learn TypeScript");
        assert_eq!(steps[0].est_time, "2 weeks");
        assert_eq!(steps[1].label, "Contribute to open source");
    }

    #[test]
    fn test_decode_caps_at_max_after_sorting() {
        let text = r#"[
            {"order": 4, "label": "D", "estTime": "1 week"},
            {"order": 1, "label": "A", "estTime": "1 week"},
            {"order": 3, "label": "C", "estTime": "1 week"},
            {"order": 2, "label": "B", "estTime": "1 week"}
        ]"#;
        let labels: Vec<_> = decode_suggestions(text)
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_decode_rejects_empty_array() {
        assert!(matches!(
            decode_suggestions("[]"),
            Err(RoadmapError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        for text in [
            r#"[1, 2, 3]"#,
            r#"[{"order": "one", "label": "A", "estTime": "1 week"}]"#,
            r#"[{"order": -1, "label": "A", "estTime": "1 week"}]"#,
            r#"[{"order": 1, "label": "A"}]"#,
        ] {
            assert!(
                matches!(decode_suggestions(text), Err(RoadmapError::MalformedResponse(_))),
                "should reject {text}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_zero_order_and_blank_fields() {
        for text in [
            r#"[{"order": 0, "label": "A", "estTime": "1 week"}]"#,
            r#"[{"order": 1, "label": "   ", "estTime": "1 week"}]"#,
            r#"[{"order": 1, "label": "A", "estTime": ""}]"#,
        ] {
            assert!(
                matches!(decode_suggestions(text), Err(RoadmapError::MalformedResponse(_))),
                "should reject {text}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_prose_only() {
        let err = decode_suggestions("Here is your roadmap, good luck!").unwrap_err();
        assert!(err.is_personalization_failure());
    }

    #[test]
    fn test_number_new_steps_appends_after_existing() {
        let existing = find_template("frontend")
            .unwrap()
            .instantiate(Uuid::new_v4())
            .steps;
        let added = number_new_steps(
            &existing,
            vec![suggestion(1, "Learn TypeScript"), suggestion(2, "Write tests")],
        );
        let orders: Vec<_> = added.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![4, 5]);
        assert!(added.iter().all(|s| !s.completed));
    }

    #[test]
    fn test_number_new_steps_drops_duplicate_labels() {
        let existing = find_template("frontend")
            .unwrap()
            .instantiate(Uuid::new_v4())
            .steps;
        let duplicate = existing[0].label.to_uppercase();
        let added = number_new_steps(
            &existing,
            vec![
                suggestion(1, &duplicate),
                suggestion(2, "Learn TypeScript"),
                suggestion(3, "learn typescript"),
            ],
        );
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].label, "Learn TypeScript");
        assert_eq!(added[0].order, 4);
    }

    #[test]
    fn test_build_prompt_embeds_roadmap_and_profile() {
        let roadmap = find_template("backend")
            .unwrap()
            .instantiate(Uuid::new_v4());
        let profile = UserProfile {
            current_role: Some("QA analyst".to_string()),
            skills: vec!["Python".to_string()],
            ..Default::default()
        };
        let prompt = build_prompt(&roadmap, &profile);

        assert!(prompt.contains("\"backend\""));
        assert!(prompt.contains("QA analyst"));
        assert!(prompt.contains("Master one server-side language"));
        assert!(prompt.contains("estTime"));
        assert!(prompt.contains("up to 3 ADDITIONAL steps"));
        for placeholder in ["{roadmap_id}", "{steps}", "{profile}", "{max_steps}", "{grounding}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
    }

    #[test]
    fn test_system_prompt_demands_json_array() {
        assert!(system_prompt().contains("JSON array"));
    }
}
