//! Proof verification pipeline.
//!
//! A submission moves through up to five stages:
//!
//! 1. Structural validation (goal id, reflection length, image payload)
//! 2. Keyword correspondence between goal name and reflection
//! 3. Hard-gate decision on the three structural checks
//! 4. Optional external vision classification (only when stage 3 passed)
//! 5. Final verdict, confidence clamping, and feedback selection
//!
//! Soft failures (low confidence, an unreachable classifier) are never
//! errors: the pipeline always returns a [`VerificationResult`] with a
//! score and an explanation, even under total external-dependency
//! failure.

mod classifier;
mod goals;
mod heuristics;

pub use classifier::{ClassifierConfig, ClassifierOutcome, VisionClassifier};
pub use goals::{display_name, is_known, GOALS};
pub use heuristics::{is_valid_image_data_url, MIN_REFLECTION_LENGTH};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum confidence for a submission to pass.
pub const CONFIDENCE_THRESHOLD_PASS: i32 = 70;

/// Below the pass threshold but at or above this, ask for a second photo.
pub const CONFIDENCE_THRESHOLD_SECOND_PHOTO: i32 = 60;

/// Score adjustment when the classifier finds the submission implausible.
const IMPLAUSIBLE_PENALTY: i32 = 20;

/// A proof submission to verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    /// Goal identifier from the fixed goal set.
    pub goal_id: String,
    /// The user's reflection text.
    pub reflection: String,
    /// Proof image as a base64 data URL.
    pub image_data_url: String,
    /// Optional second image for low-confidence cases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_image_data_url: Option<String>,
}

/// The individual checks performed on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationChecks {
    /// The goal id belongs to the known set.
    pub valid_goal: bool,
    /// The reflection meets the minimum length.
    pub sufficient_reflection: bool,
    /// The image payload is a well-formed data URL.
    pub valid_image: bool,
    /// Whether the external classifier corroborated the result, when it ran.
    #[serde(rename = "aiVerified", skip_serializing_if = "Option::is_none")]
    pub classifier_corroborated: Option<bool>,
}

/// Final verdict for a proof submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the submission passed.
    pub verified: bool,
    /// Confidence score, always an integer in [0, 100].
    pub confidence: u8,
    /// Explanation, aggregated from failed checks when not verified.
    pub reason: String,
    /// User-facing guidance.
    pub feedback: String,
    /// Whether a second photo would let the submission pass.
    pub needs_second_photo: bool,
    /// The individual check outcomes.
    pub checks: VerificationChecks,
}

/// Verifies proof submissions against the fixed goal set.
pub struct ProofVerifier {
    classifier: VisionClassifier,
}

impl ProofVerifier {
    /// Create a verifier with the given classifier configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the classifier client fails to initialize.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        Ok(Self {
            classifier: VisionClassifier::new(config)?,
        })
    }

    /// Create a verifier with an explicit classifier (used by tests).
    #[must_use]
    pub fn with_classifier(classifier: VisionClassifier) -> Self {
        Self { classifier }
    }

    /// Whether the external classifier stage is configured.
    #[must_use]
    pub fn classifier_enabled(&self) -> bool {
        self.classifier.is_enabled()
    }

    /// Verify one proof submission.
    ///
    /// Deterministic apart from the classifier stage; identical input
    /// always yields identical structural checks and pre-classifier
    /// score. Never fails: external-dependency trouble degrades to a
    /// zero-adjustment classifier stage.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationResult {
        // Stages 1-3: structural checks, keyword signal, hard gate.
        let outcome = heuristics::evaluate(
            &request.goal_id,
            &request.reflection,
            &request.image_data_url,
        );
        let mut confidence = outcome.confidence;
        let mut checks = outcome.checks;
        let structurally_verified = outcome.verified;

        debug!(
            "heuristics: verified={structurally_verified} confidence={confidence} goal={}",
            request.goal_id
        );

        // Stage 4: classifier adjustment, only for structurally valid proofs.
        let mut feedback = if structurally_verified {
            let goal_name = goals::display_name(&request.goal_id).unwrap_or(&request.goal_id);
            let adjustment;
            let classifier_feedback;
            match self
                .classifier
                .assess(
                    goal_name,
                    &request.reflection,
                    &request.image_data_url,
                    request.second_image_data_url.as_deref(),
                )
                .await
            {
                ClassifierOutcome::Verdict {
                    plausible,
                    confidence: model_confidence,
                    feedback,
                } => {
                    adjustment = if plausible {
                        // Up to +30: 30% of the model's confidence.
                        (i32::from(model_confidence) * 3) / 10
                    } else {
                        -IMPLAUSIBLE_PENALTY
                    };
                    classifier_feedback = feedback;
                }
                ClassifierOutcome::Unavailable { note } => {
                    adjustment = 0;
                    classifier_feedback = note;
                }
            }

            confidence = (confidence + adjustment).clamp(0, 100);
            checks.classifier_corroborated = Some(adjustment > 0);
            classifier_feedback
        } else {
            outcome.reason.clone()
        };

        // Stage 5: final decision and feedback selection.
        let final_verified = structurally_verified && confidence >= CONFIDENCE_THRESHOLD_PASS;
        let needs_second_photo = structurally_verified
            && request.second_image_data_url.is_none()
            && (CONFIDENCE_THRESHOLD_SECOND_PHOTO..CONFIDENCE_THRESHOLD_PASS)
                .contains(&confidence);

        feedback = if final_verified {
            if feedback.is_empty() {
                let goal_name =
                    goals::display_name(&request.goal_id).unwrap_or(&request.goal_id);
                format!("Proof verified! Your {goal_name} goal is confirmed.")
            } else {
                feedback
            }
        } else if needs_second_photo {
            format!(
                "Verification uncertain (confidence: {confidence}%). \
                 Please submit a second photo for additional verification."
            )
        } else if !structurally_verified {
            format!("Verification failed: {}", outcome.reason)
        } else if feedback.is_empty() {
            format!("Confidence too low ({confidence}%). Please provide clearer evidence.")
        } else {
            feedback
        };

        let reason = if final_verified {
            "Verified".to_string()
        } else {
            outcome.reason
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let confidence = confidence.clamp(0, 100) as u8;

        VerificationResult {
            verified: final_verified,
            confidence,
            reason,
            feedback,
            needs_second_photo,
            checks,
        }
    }
}
