//! Response classification.
//!
//! Pure transformations from raw provider responses into per-recipient
//! [`Outcome`]s plus any provider-wide errors. No I/O here: the three
//! lifecycle behaviors (ignore / deactivate / rotate) stay exhaustively
//! testable without touching a network or a database.

use push_core::{DispatchError, Outcome, Provider, RecipientOutcome};
use push_transport::{ApnsDelivery, ApnsStatus, FcmResponse, HttpDelivery};

/// APNs rejection reasons that mean the token is dead.
pub const APNS_PERMANENT_REASONS: &[&str] =
    &["Unregistered", "BadDeviceToken", "DeviceTokenNotForTopic"];

/// FCM error strings that mean the registration id is dead.
pub const FCM_PERMANENT_ERRORS: &[&str] = &["NotRegistered", "InvalidRegistration"];

/// Classified outcomes for one provider call (or one group of calls).
#[derive(Debug, Default)]
pub struct Classification {
    pub outcomes: Vec<RecipientOutcome>,
    pub errors: Vec<DispatchError>,
}

impl Classification {
    fn push(&mut self, token: impl Into<String>, outcome: Outcome) {
        self.outcomes.push(RecipientOutcome::new(token, outcome));
    }
}

/// Classify per-request APNs deliveries.
///
/// Rejections outside the permanent taxonomy surface both per-device (as
/// transient, so nothing gets deactivated) and as one aggregated
/// provider error. Local failures (timeouts, connection errors) never
/// raise a provider error.
pub fn classify_apns(deliveries: Vec<ApnsDelivery>) -> Classification {
    let mut classification = Classification::default();
    let mut provider_reasons: Vec<String> = Vec::new();

    for delivery in deliveries {
        match delivery.status {
            ApnsStatus::Delivered { .. } => classification.push(delivery.token, Outcome::Success),
            ApnsStatus::Rejected { reason } => {
                if APNS_PERMANENT_REASONS.contains(&reason.as_str()) {
                    classification.push(delivery.token, Outcome::PermanentFailure(reason));
                } else {
                    if !provider_reasons.contains(&reason) {
                        provider_reasons.push(reason.clone());
                    }
                    classification.push(delivery.token, Outcome::TransientFailure(reason));
                }
            }
            ApnsStatus::Failed { reason } => {
                classification.push(delivery.token, Outcome::TransientFailure(reason));
            }
        }
    }

    if !provider_reasons.is_empty() {
        classification.errors.push(DispatchError::provider(
            Provider::Apns,
            format!("one or more notifications failed: {}", provider_reasons.join(", ")),
        ));
    }

    classification
}

/// Classify an FCM batch response against the submitted chunk.
///
/// Alignment is positional. A response that does not carry one result
/// per recipient is treated as wholly failed: every recipient maps to
/// `Unknown` and a provider error is raised.
pub fn classify_fcm(response: &FcmResponse, chunk: &[String]) -> Classification {
    let mut classification = Classification::default();

    if response.results.len() != chunk.len() {
        let detail = format!(
            "FCM returned {} results for {} recipients",
            response.results.len(),
            chunk.len()
        );
        for token in chunk {
            classification.push(token.clone(), Outcome::Unknown(detail.clone()));
        }
        classification
            .errors
            .push(DispatchError::provider(Provider::Fcm, detail));
        return classification;
    }

    let mut provider_reasons: Vec<String> = Vec::new();
    for (token, result) in chunk.iter().zip(&response.results) {
        if let Some(new_token) = &result.registration_id {
            classification.push(
                token.clone(),
                Outcome::Rotate {
                    new_token: new_token.clone(),
                },
            );
        } else if let Some(error) = &result.error {
            if FCM_PERMANENT_ERRORS.contains(&error.as_str()) {
                classification.push(token.clone(), Outcome::PermanentFailure(error.clone()));
            } else {
                // Policy: any non-permanent error string raises a
                // provider error, even when other recipients in the
                // same batch failed permanently.
                if !provider_reasons.contains(error) {
                    provider_reasons.push(error.clone());
                }
                classification.push(token.clone(), Outcome::TransientFailure(error.clone()));
            }
        } else {
            classification.push(token.clone(), Outcome::Success);
        }
    }

    if !provider_reasons.is_empty() {
        classification.errors.push(DispatchError::provider(
            Provider::Fcm,
            format!("batch contained errors: {}", provider_reasons.join(", ")),
        ));
    }

    classification
}

/// Classify one WNS delivery by HTTP status. The second element is the
/// detail to roll into a group-level provider error, when the status
/// calls for one.
pub fn classify_wns(delivery: &HttpDelivery) -> (Outcome, Option<String>) {
    match delivery.status {
        200..=299 => (Outcome::Success, None),
        410 => (
            Outcome::PermanentFailure("the channel expired (HTTP 410)".into()),
            None,
        ),
        status @ (400 | 401 | 403 | 404 | 405 | 413) => {
            let reason = format!("HTTP {status}: {}", wns_status_detail(status));
            (Outcome::TransientFailure(reason.clone()), Some(reason))
        }
        status => (
            Outcome::TransientFailure(format!("HTTP {status}: {}", delivery.body)),
            None,
        ),
    }
}

fn wns_status_detail(status: u16) -> &'static str {
    match status {
        400 => "one or more headers were specified incorrectly",
        401 => "the cloud service did not present a valid authentication ticket",
        403 => "the cloud service is not authorized to send to this URI",
        404 => "the channel URI is not valid or is not recognized by WNS",
        405 => "invalid method",
        413 => "the notification payload exceeds the size limit",
        _ => "unexpected status",
    }
}

/// Classify one WebPush delivery by HTTP status.
pub fn classify_webpush(delivery: &HttpDelivery) -> Outcome {
    match delivery.status {
        200..=299 => Outcome::Success,
        404 | 410 => Outcome::PermanentFailure(format!(
            "the subscription is gone (HTTP {})",
            delivery.status
        )),
        status => Outcome::TransientFailure(format!("HTTP {status}: {}", delivery.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_transport::FcmResult;

    fn fcm_response(results: Vec<FcmResult>) -> FcmResponse {
        FcmResponse {
            success: 0,
            failure: 0,
            canonical_ids: 0,
            results,
        }
    }

    #[test]
    fn test_apns_permanent_reasons_deactivate() {
        let deliveries = vec![
            ApnsDelivery {
                token: "abc".into(),
                status: ApnsStatus::Delivered { apns_id: None },
            },
            ApnsDelivery {
                token: "ghi".into(),
                status: ApnsStatus::Rejected {
                    reason: "Unregistered".into(),
                },
            },
        ];
        let classification = classify_apns(deliveries);
        assert_eq!(classification.outcomes[0].outcome, Outcome::Success);
        assert_eq!(
            classification.outcomes[1].outcome,
            Outcome::PermanentFailure("Unregistered".into())
        );
        assert!(classification.errors.is_empty());
    }

    #[test]
    fn test_apns_unexpected_rejection_raises_provider_error() {
        let deliveries = vec![ApnsDelivery {
            token: "abc".into(),
            status: ApnsStatus::Rejected {
                reason: "TooManyRequests".into(),
            },
        }];
        let classification = classify_apns(deliveries);
        assert_eq!(
            classification.outcomes[0].outcome,
            Outcome::TransientFailure("TooManyRequests".into())
        );
        assert_eq!(classification.errors.len(), 1);
    }

    #[test]
    fn test_apns_local_failure_is_transient_and_quiet() {
        let deliveries = vec![ApnsDelivery::failed("abc", "TimeoutError")];
        let classification = classify_apns(deliveries);
        assert_eq!(
            classification.outcomes[0].outcome,
            Outcome::TransientFailure("TimeoutError".into())
        );
        assert!(classification.errors.is_empty());
    }

    #[test]
    fn test_fcm_positional_alignment() {
        let chunk: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let response = fcm_response(vec![
            FcmResult {
                error: Some("NotRegistered".into()),
                ..Default::default()
            },
            FcmResult {
                message_id: Some("0:1".into()),
                ..Default::default()
            },
            FcmResult {
                registration_id: Some("NEW".into()),
                ..Default::default()
            },
        ]);
        let classification = classify_fcm(&response, &chunk);
        assert_eq!(
            classification.outcomes[0].outcome,
            Outcome::PermanentFailure("NotRegistered".into())
        );
        assert_eq!(classification.outcomes[1].outcome, Outcome::Success);
        assert_eq!(
            classification.outcomes[2].outcome,
            Outcome::Rotate {
                new_token: "NEW".into()
            }
        );
        assert!(classification.errors.is_empty());
    }

    #[test]
    fn test_fcm_unexpected_error_raises_provider_error() {
        let chunk: Vec<String> = vec!["a".into()];
        let response = fcm_response(vec![FcmResult {
            error: Some("MismatchSenderId".into()),
            ..Default::default()
        }]);
        let classification = classify_fcm(&response, &chunk);
        assert_eq!(
            classification.outcomes[0].outcome,
            Outcome::TransientFailure("MismatchSenderId".into())
        );
        assert_eq!(classification.errors.len(), 1);
        assert!(classification.errors[0].to_string().contains("MismatchSenderId"));
    }

    #[test]
    fn test_fcm_misaligned_response_is_wholly_unknown() {
        let chunk: Vec<String> = vec!["a".into(), "b".into()];
        let response = fcm_response(vec![FcmResult::default()]);
        let classification = classify_fcm(&response, &chunk);
        assert_eq!(classification.outcomes.len(), 2);
        assert!(classification
            .outcomes
            .iter()
            .all(|r| matches!(r.outcome, Outcome::Unknown(_))));
        assert_eq!(classification.errors.len(), 1);
    }

    #[test]
    fn test_wns_status_mapping() {
        let gone = HttpDelivery {
            status: 410,
            body: String::new(),
        };
        assert!(matches!(classify_wns(&gone).0, Outcome::PermanentFailure(_)));

        let forbidden = HttpDelivery {
            status: 403,
            body: String::new(),
        };
        let (outcome, provider_reason) = classify_wns(&forbidden);
        assert!(matches!(outcome, Outcome::TransientFailure(_)));
        assert!(provider_reason.is_some());

        let ok = HttpDelivery {
            status: 200,
            body: String::new(),
        };
        assert_eq!(classify_wns(&ok).0, Outcome::Success);

        let unavailable = HttpDelivery {
            status: 503,
            body: "busy".into(),
        };
        let (outcome, provider_reason) = classify_wns(&unavailable);
        assert!(matches!(outcome, Outcome::TransientFailure(_)));
        assert!(provider_reason.is_none());
    }

    #[test]
    fn test_webpush_status_mapping() {
        for status in [404, 410] {
            let delivery = HttpDelivery {
                status,
                body: String::new(),
            };
            assert!(classify_webpush(&delivery).is_permanent_failure());
        }

        let throttled = HttpDelivery {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(
            classify_webpush(&throttled),
            Outcome::TransientFailure("HTTP 429: slow down".into())
        );
        assert_eq!(
            classify_webpush(&HttpDelivery {
                status: 201,
                body: String::new()
            }),
            Outcome::Success
        );
    }
}
