//! Structural checks and heuristic confidence scoring.
//!
//! This stage is pure and deterministic: the same request always produces
//! the same check booleans and score. Scoring is integer arithmetic
//! throughout.
//!
//! Points: a known goal id is worth 30, a sufficient reflection up to 30
//! (scaled by length), a well-formed image 20, and keyword overlap
//! between the goal name and the reflection adds 20 or costs 10. The
//! keyword signal is soft: it moves the score but never fails a check.

use super::goals;
use super::VerificationChecks;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashSet;

/// Minimum reflection length in characters (after trimming).
pub const MIN_REFLECTION_LENGTH: usize = 20;

/// Points awarded for a known goal id.
const GOAL_POINTS: i32 = 30;

/// Maximum points awarded for reflection length.
const MAX_REFLECTION_POINTS: i32 = 30;

/// Points awarded for a well-formed image payload.
const IMAGE_POINTS: i32 = 20;

/// Bonus when the reflection mentions a goal keyword.
const KEYWORD_BONUS: i32 = 20;

/// Penalty when the reflection shares no words with the goal name.
const KEYWORD_PENALTY: i32 = 10;

/// Image subtypes accepted in a proof data URL.
const ACCEPTED_IMAGE_TYPES: &[&str] = &["png", "jpeg", "jpg", "gif", "webp"];

/// Outcome of the heuristic stage.
#[derive(Debug, Clone)]
pub struct HeuristicOutcome {
    /// Whether all three structural checks passed.
    pub verified: bool,
    /// Accumulated confidence points, in [0, 100].
    pub confidence: i32,
    /// Aggregated failure reasons, or a pass note.
    pub reason: String,
    /// The individual check booleans.
    pub checks: VerificationChecks,
}

/// Validate that a string is a well-formed image data URL.
///
/// Accepts `data:image/<subtype>;base64,<body>` where the subtype is one
/// of the accepted image types and the body decodes as base64.
#[must_use]
pub fn is_valid_image_data_url(data_url: &str) -> bool {
    let Some(rest) = data_url.strip_prefix("data:image/") else {
        return false;
    };
    let Some((subtype, body)) = rest.split_once(";base64,") else {
        return false;
    };
    if !ACCEPTED_IMAGE_TYPES.contains(&subtype) {
        return false;
    }
    !body.is_empty() && BASE64.decode(body).is_ok()
}

/// Run the structural checks and score the submission.
pub fn evaluate(goal_id: &str, reflection: &str, image_data_url: &str) -> HeuristicOutcome {
    let mut checks = VerificationChecks {
        valid_goal: false,
        sufficient_reflection: false,
        valid_image: false,
        classifier_corroborated: None,
    };
    let mut confidence = 0i32;
    let mut reasons = Vec::new();

    // Check 1: the goal id must belong to the known set.
    if goals::is_known(goal_id) {
        checks.valid_goal = true;
        confidence += GOAL_POINTS;
    } else {
        reasons.push(format!("Invalid goal ID: '{goal_id}'"));
    }

    // Check 2: the reflection must carry a minimum of substance. Longer
    // reflections earn more points, capped at 30.
    let reflection_length = reflection.trim().chars().count();
    if reflection_length < MIN_REFLECTION_LENGTH {
        reasons.push(format!(
            "Reflection too short ({reflection_length} chars, minimum {MIN_REFLECTION_LENGTH})"
        ));
    } else {
        checks.sufficient_reflection = true;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let length_points = MAX_REFLECTION_POINTS.min((reflection_length / 10) as i32);
        confidence += length_points;
    }

    // Check 3: the image payload must be a well-formed data URL.
    if is_valid_image_data_url(image_data_url) {
        checks.valid_image = true;
        confidence += IMAGE_POINTS;
    } else {
        reasons.push("Invalid image data URL format".to_string());
    }

    // Soft signal: does the reflection mention the goal? An unknown goal
    // id has no display name, so its keyword set is empty and this always
    // lands on the penalty side.
    let goal_name = goals::display_name(goal_id).unwrap_or_default().to_lowercase();
    let reflection_lower = reflection.to_lowercase();
    let goal_keywords: HashSet<&str> = goal_name.split_whitespace().collect();
    let reflection_words: HashSet<&str> = reflection_lower.split_whitespace().collect();

    if goal_keywords.intersection(&reflection_words).next().is_some() {
        confidence += KEYWORD_BONUS;
    } else {
        confidence = (confidence - KEYWORD_PENALTY).max(0);
    }

    let verified = checks.valid_goal && checks.sufficient_reflection && checks.valid_image;
    let reason = if reasons.is_empty() {
        "All heuristic checks passed".to_string()
    } else {
        reasons.join("; ")
    };

    HeuristicOutcome {
        verified,
        confidence,
        reason,
        checks,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // A 1x1 transparent PNG.
    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_data_url_validation() {
        assert!(is_valid_image_data_url(PNG_DATA_URL));
        assert!(is_valid_image_data_url("data:image/jpeg;base64,aGVsbG8="));
        assert!(is_valid_image_data_url("data:image/webp;base64,aGVsbG8="));

        assert!(!is_valid_image_data_url(""));
        assert!(!is_valid_image_data_url("data:image/png;base64,"));
        assert!(!is_valid_image_data_url("data:image/svg+xml;base64,aGVsbG8="));
        assert!(!is_valid_image_data_url("data:text/plain;base64,aGVsbG8="));
        assert!(!is_valid_image_data_url("data:image/png;base64,not!!valid@@"));
        assert!(!is_valid_image_data_url("http://example.com/photo.png"));
    }

    #[test]
    fn test_all_checks_pass_scores_high() {
        let outcome = evaluate(
            "run_5km",
            "I completed my 5km run today. It was challenging but rewarding.",
            PNG_DATA_URL,
        );

        assert!(outcome.verified);
        assert!(outcome.checks.valid_goal);
        assert!(outcome.checks.sufficient_reflection);
        assert!(outcome.checks.valid_image);
        // 30 (goal) + 6 (63 chars) + 20 (image) + 20 (keyword "run") = 76.
        assert_eq!(outcome.confidence, 76);
        assert_eq!(outcome.reason, "All heuristic checks passed");
    }

    #[test]
    fn test_unknown_goal_fails_check() {
        let outcome = evaluate(
            "bogus",
            "A long enough reflection about something unrelated.",
            PNG_DATA_URL,
        );

        assert!(!outcome.verified);
        assert!(!outcome.checks.valid_goal);
        assert!(outcome.reason.contains("Invalid goal ID: 'bogus'"));
    }

    #[test]
    fn test_short_reflection_fails_check() {
        let outcome = evaluate("run_5km", "Too short", PNG_DATA_URL);

        assert!(!outcome.verified);
        assert!(!outcome.checks.sufficient_reflection);
        assert!(outcome.reason.contains("Reflection too short (9 chars"));
    }

    #[test]
    fn test_invalid_image_fails_check() {
        let outcome = evaluate(
            "run_5km",
            "I completed my 5km run today, feeling great.",
            "not-a-data-url",
        );

        assert!(!outcome.verified);
        assert!(!outcome.checks.valid_image);
        assert!(outcome.reason.contains("Invalid image data URL format"));
    }

    #[test]
    fn test_keyword_miss_is_penalized_not_failed() {
        let with_keyword = evaluate(
            "run_5km",
            "Finished the run this morning before work today.",
            PNG_DATA_URL,
        );
        let without_keyword = evaluate(
            "run_5km",
            "Finished the jog this morning before my workday.",
            PNG_DATA_URL,
        );

        assert!(with_keyword.verified);
        assert!(without_keyword.verified);
        // Same length reflections: 48 chars -> 4 length points each.
        // 30 + 4 + 20 + 20 = 74 versus 30 + 4 + 20 - 10 = 44.
        assert_eq!(with_keyword.confidence, 74);
        assert_eq!(without_keyword.confidence, 44);
    }

    #[test]
    fn test_penalty_floors_at_zero() {
        let outcome = evaluate("bogus", "short", "junk");
        assert_eq!(outcome.confidence, 0);
    }

    #[test]
    fn test_length_points_cap_at_30() {
        let long_reflection = format!("run {}", "a".repeat(400));
        let outcome = evaluate("run_5km", &long_reflection, PNG_DATA_URL);
        // 30 + 30 (capped) + 20 + 20 = 100.
        assert_eq!(outcome.confidence, 100);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let first = evaluate("read_20_pages", "Read twenty pages of my book tonight.", PNG_DATA_URL);
        let second = evaluate("read_20_pages", "Read twenty pages of my book tonight.", PNG_DATA_URL);

        assert_eq!(first.verified, second.verified);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.checks, second.checks);
        assert_eq!(first.reason, second.reason);
    }

    proptest! {
        #[test]
        fn prop_confidence_always_in_range(
            goal_id in "[a-z_]{0,16}",
            reflection in ".{0,400}",
            image in ".{0,64}",
        ) {
            let outcome = evaluate(&goal_id, &reflection, &image);
            prop_assert!((0..=100).contains(&outcome.confidence));
        }
    }
}
