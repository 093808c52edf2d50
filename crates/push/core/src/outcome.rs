//! Per-recipient dispatch outcomes.

use crate::DispatchError;

/// Normalized classification of a provider's answer for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The provider accepted the notification.
    Success,
    /// The provider rejected the recipient permanently; the device should
    /// be deactivated.
    PermanentFailure(String),
    /// Delivery failed for a reason that says nothing about the device
    /// (throttling, network hiccup, provider-side error). Never a
    /// deactivation signal.
    TransientFailure(String),
    /// The provider issued a replacement registration token.
    Rotate { new_token: String },
    /// The provider call failed wholesale or the recipient was never
    /// attempted; carries whatever raw detail is available.
    Unknown(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Outcome::PermanentFailure(_))
    }
}

/// One recipient's outcome within a [`DispatchResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub registration_token: String,
    pub outcome: Outcome,
}

impl RecipientOutcome {
    pub fn new(registration_token: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            registration_token: registration_token.into(),
            outcome,
        }
    }
}

/// Aggregate result of one `send` call.
///
/// Every active device handed to the engine appears exactly once in
/// `outcomes`, including devices whose chunk was never attempted
/// (inactive devices are skipped outright). `errors` holds the
/// non-device-specific failures (configuration, transport, provider-wide)
/// that occurred alongside; device mutations already applied are never
/// rolled back.
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub outcomes: Vec<RecipientOutcome>,
    pub errors: Vec<DispatchError>,
}

impl DispatchResult {
    /// Whether the call completed without any group-level error. Note that
    /// per-device failures (APNs rejections in particular) do not raise
    /// errors, so callers interested in delivery must inspect `outcomes`.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// Look up the outcome recorded for a registration token.
    pub fn outcome_for(&self, registration_token: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|r| r.registration_token == registration_token)
            .map(|r| &r.outcome)
    }

    pub fn merge(&mut self, other: DispatchResult) {
        self.outcomes.extend(other.outcomes);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_counting() {
        let mut result = DispatchResult::default();
        result.outcomes.push(RecipientOutcome::new("a", Outcome::Success));
        result
            .outcomes
            .push(RecipientOutcome::new("b", Outcome::PermanentFailure("Unregistered".into())));
        assert_eq!(result.successes(), 1);
        assert_eq!(result.failures(), 1);
        assert!(result.is_ok());
        assert!(result.outcome_for("b").unwrap().is_permanent_failure());
    }
}
