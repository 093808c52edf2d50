//! The dispatch engine.
//!
//! One `send` call fans a message out to a mixed batch of devices:
//! recipients are grouped per (provider, application), credentials are
//! resolved, payloads built and validated, provider calls issued with
//! chunking and timeouts, responses classified, and the device lifecycle
//! applied. Group-level failures land in `DispatchResult::errors` without
//! touching other groups.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use push_core::{
    CredentialProvider, Device, DispatchError, DispatchResult, Message, Outcome, Provider,
    ProviderConfig, RecipientOutcome,
};
use push_storage::DeviceStore;
use push_transport::{
    A2ApnsTransport, ApnsTransport, FcmTransport, HttpFcmTransport, HttpWebPushTransport,
    HttpWnsTransport, WebPushTransport, WnsTransport,
};

use crate::chunk::chunk;
use crate::classify::{self, Classification};
use crate::concurrent::send_concurrent;
use crate::lifecycle::DeviceLifecycle;

/// Per-call knobs.
#[derive(Debug, Default, Clone)]
pub struct DispatchOptions {
    /// Hard stop for the whole call. Checked between provider calls, never
    /// mid-flight; recipients past the deadline are reported as `Unknown`
    /// rather than silently dropped.
    pub deadline: Option<Instant>,
}

/// Dispatch engine over a credential source, a device store and one
/// transport per provider.
pub struct DispatchEngine<C, S, A, F, W, P> {
    credentials: C,
    lifecycle: DeviceLifecycle<S>,
    apns: Arc<A>,
    fcm: F,
    wns: W,
    webpush: P,
}

impl<C, S> DispatchEngine<C, S, A2ApnsTransport, HttpFcmTransport, HttpWnsTransport, HttpWebPushTransport>
where
    C: CredentialProvider,
    S: DeviceStore,
{
    /// Engine wired to the real HTTP transports.
    pub fn new(credentials: C, store: S) -> Self {
        Self::with_transports(
            credentials,
            store,
            A2ApnsTransport::new(),
            HttpFcmTransport::new(),
            HttpWnsTransport::new(),
            HttpWebPushTransport::new(),
        )
    }
}

impl<C, S, A, F, W, P> DispatchEngine<C, S, A, F, W, P>
where
    C: CredentialProvider,
    S: DeviceStore,
    A: ApnsTransport + 'static,
    F: FcmTransport,
    W: WnsTransport,
    P: WebPushTransport,
{
    pub fn with_transports(credentials: C, store: S, apns: A, fcm: F, wns: W, webpush: P) -> Self {
        Self {
            credentials,
            lifecycle: DeviceLifecycle::new(store),
            apns: Arc::new(apns),
            fcm,
            wns,
            webpush,
        }
    }

    pub fn store(&self) -> &S {
        self.lifecycle.store()
    }

    /// Send `message` to every active device in `devices`.
    pub async fn send(&self, devices: &[Device], message: &Message) -> DispatchResult {
        self.send_with(devices, message, &DispatchOptions::default())
            .await
    }

    /// Send to every active device currently registered for an
    /// application, across all providers.
    pub async fn send_to_application(
        &self,
        application_id: &str,
        message: &Message,
    ) -> DispatchResult {
        let mut devices = Vec::new();
        let mut result = DispatchResult::default();

        for provider in [Provider::Apns, Provider::Fcm, Provider::Wns, Provider::WebPush] {
            match self.store().active_devices(provider, application_id) {
                Ok(found) => devices.extend(found),
                Err(e) => result.errors.push(DispatchError::Store(e.to_string())),
            }
        }

        result.merge(self.send(&devices, message).await);
        result
    }

    /// [`send`](Self::send) with explicit options.
    pub async fn send_with(
        &self,
        devices: &[Device],
        message: &Message,
        options: &DispatchOptions,
    ) -> DispatchResult {
        let mut result = DispatchResult::default();

        for ((provider, application_id), group) in group_devices(devices) {
            let tokens: Vec<String> = group
                .iter()
                .map(|d| d.registration_token.clone())
                .collect();

            if deadline_exceeded(options) {
                result
                    .outcomes
                    .extend(not_attempted(&tokens, "cancelled: deadline exceeded"));
                continue;
            }

            if provider.is_deprecated() {
                tracing::warn!(%provider, application_id = %application_id, "refusing send to deprecated provider");
                for token in &tokens {
                    result.outcomes.push(RecipientOutcome::new(
                        token.clone(),
                        Outcome::TransientFailure(format!(
                            "{provider} is deprecated; re-register the device with FCM"
                        )),
                    ));
                }
                continue;
            }

            let cfg = match self.credentials.resolve(&application_id, provider) {
                Ok(cfg) => cfg,
                Err(e) => {
                    result
                        .outcomes
                        .extend(not_attempted(&tokens, format!("not attempted: {e}")));
                    result.errors.push(e);
                    continue;
                }
            };

            tracing::info!(
                %provider,
                application_id = %application_id,
                recipients = tokens.len(),
                "dispatching group"
            );

            let classification = match provider {
                Provider::Apns => self.send_apns(&cfg, &tokens, message).await,
                Provider::Fcm => self.send_fcm(&cfg, &tokens, message, options).await,
                Provider::Wns => self.send_wns(&cfg, &tokens, message, options).await,
                Provider::WebPush => self.send_webpush(&cfg, &tokens, message, options).await,
                Provider::Gcm => unreachable!("deprecated providers are refused above"),
            };

            for recipient in &classification.outcomes {
                if let Err(e) = self.lifecycle.apply(provider, recipient) {
                    result.errors.push(DispatchError::Store(e.to_string()));
                }
            }
            result.outcomes.extend(classification.outcomes);
            result.errors.extend(classification.errors);
        }

        result
    }

    async fn send_apns(
        &self,
        cfg: &ProviderConfig,
        tokens: &[String],
        message: &Message,
    ) -> Classification {
        // Validate once up front so a bad payload is one error, not one
        // rejection per device.
        if let Err(e) = push_payload::apns::build(message) {
            return aborted(tokens, DispatchError::Payload(e));
        }

        if let Err(e) = self.apns.prepare(cfg).await {
            return aborted(tokens, DispatchError::transport(Provider::Apns, e));
        }

        let deliveries = send_concurrent(
            Arc::clone(&self.apns),
            Arc::new(cfg.clone()),
            Arc::new(message.clone()),
            tokens.to_vec(),
        )
        .await;
        classify::classify_apns(deliveries)
    }

    async fn send_fcm(
        &self,
        cfg: &ProviderConfig,
        tokens: &[String],
        message: &Message,
        options: &DispatchOptions,
    ) -> Classification {
        let payload = match push_payload::fcm::build(message) {
            Ok(payload) => payload,
            Err(e) => return aborted(tokens, DispatchError::Payload(e)),
        };

        let mut classification = Classification::default();
        let chunks = chunk(tokens, cfg.max_recipients);

        for (index, batch) in chunks.iter().enumerate() {
            if deadline_exceeded(options) {
                for remaining in &chunks[index..] {
                    classification
                        .outcomes
                        .extend(not_attempted(remaining, "cancelled: deadline exceeded"));
                }
                break;
            }

            let sent = tokio::time::timeout(cfg.timeout(), self.fcm.send_batch(cfg, batch, &payload))
                .await
                .unwrap_or_else(|_| Err(push_core::TransportError::new("request timed out")));

            match sent {
                Ok(response) => {
                    let mut batch_result = classify::classify_fcm(&response, batch);
                    classification.outcomes.append(&mut batch_result.outcomes);
                    classification.errors.append(&mut batch_result.errors);
                }
                Err(e) => {
                    classification
                        .outcomes
                        .extend(not_attempted(batch, e.reason.clone()));
                    for remaining in &chunks[index + 1..] {
                        classification.outcomes.extend(not_attempted(
                            remaining,
                            "not attempted: an earlier call failed",
                        ));
                    }
                    classification
                        .errors
                        .push(DispatchError::transport(Provider::Fcm, e));
                    break;
                }
            }
        }

        classification
    }

    async fn send_wns(
        &self,
        cfg: &ProviderConfig,
        tokens: &[String],
        message: &Message,
        options: &DispatchOptions,
    ) -> Classification {
        let payload = match push_payload::wns::build(message) {
            Ok(payload) => payload,
            Err(e) => return aborted(tokens, DispatchError::Payload(e)),
        };

        let mut classification = Classification::default();
        let mut provider_reasons: Vec<String> = Vec::new();

        for (index, channel_uri) in tokens.iter().enumerate() {
            if deadline_exceeded(options) {
                classification
                    .outcomes
                    .extend(not_attempted(&tokens[index..], "cancelled: deadline exceeded"));
                break;
            }

            let sent = tokio::time::timeout(
                cfg.timeout(),
                self.wns.send_single(cfg, channel_uri, &payload),
            )
            .await
            .unwrap_or_else(|_| Err(push_core::TransportError::new("request timed out")));

            match sent {
                Ok(delivery) => {
                    let (outcome, provider_reason) = classify::classify_wns(&delivery);
                    if let Some(reason) = provider_reason {
                        if !provider_reasons.contains(&reason) {
                            provider_reasons.push(reason);
                        }
                    }
                    classification
                        .outcomes
                        .push(RecipientOutcome::new(channel_uri.clone(), outcome));
                }
                Err(e) => {
                    classification
                        .outcomes
                        .push(RecipientOutcome::new(channel_uri.clone(), Outcome::Unknown(e.reason.clone())));
                    classification.outcomes.extend(not_attempted(
                        &tokens[index + 1..],
                        "not attempted: an earlier call failed",
                    ));
                    classification
                        .errors
                        .push(DispatchError::transport(Provider::Wns, e));
                    break;
                }
            }
        }

        if !provider_reasons.is_empty() {
            classification.errors.push(DispatchError::provider(
                Provider::Wns,
                format!("one or more notifications failed: {}", provider_reasons.join(", ")),
            ));
        }

        classification
    }

    async fn send_webpush(
        &self,
        cfg: &ProviderConfig,
        tokens: &[String],
        message: &Message,
        options: &DispatchOptions,
    ) -> Classification {
        let body = match push_payload::webpush::build(message) {
            Ok(body) => body,
            Err(e) => return aborted(tokens, DispatchError::Payload(e)),
        };
        let ttl = message.expiration.map(|exp| exp.saturating_sub(unix_now()));

        let mut classification = Classification::default();

        for (index, token) in tokens.iter().enumerate() {
            if deadline_exceeded(options) {
                classification
                    .outcomes
                    .extend(not_attempted(&tokens[index..], "cancelled: deadline exceeded"));
                break;
            }

            let endpoint = match push_payload::webpush::endpoint(token, cfg.endpoint.as_deref()) {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    classification.outcomes.push(RecipientOutcome::new(
                        token.clone(),
                        Outcome::Unknown(format!("not attempted: {e}")),
                    ));
                    classification.errors.push(DispatchError::Payload(e));
                    continue;
                }
            };

            let sent = tokio::time::timeout(
                cfg.timeout(),
                self.webpush.send_single(cfg, &endpoint, &body, ttl),
            )
            .await
            .unwrap_or_else(|_| Err(push_core::TransportError::new("request timed out")));

            match sent {
                Ok(delivery) => {
                    classification.outcomes.push(RecipientOutcome::new(
                        token.clone(),
                        classify::classify_webpush(&delivery),
                    ));
                }
                Err(e) => {
                    classification
                        .outcomes
                        .push(RecipientOutcome::new(token.clone(), Outcome::Unknown(e.reason.clone())));
                    classification.outcomes.extend(not_attempted(
                        &tokens[index + 1..],
                        "not attempted: an earlier call failed",
                    ));
                    classification
                        .errors
                        .push(DispatchError::transport(Provider::WebPush, e));
                    break;
                }
            }
        }

        classification
    }
}

/// Group active devices per (provider, application), preserving first
/// appearance order of both groups and members. Inactive devices are
/// skipped and get no outcome.
fn group_devices(devices: &[Device]) -> Vec<((Provider, String), Vec<&Device>)> {
    let mut groups: Vec<((Provider, String), Vec<&Device>)> = Vec::new();

    for device in devices {
        if !device.active {
            tracing::debug!(token = %device.registration_token, "skipping inactive device");
            continue;
        }
        let key = (device.provider, device.application_id.clone());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(device),
            None => groups.push((key, vec![device])),
        }
    }

    groups
}

fn not_attempted(tokens: &[String], reason: impl Into<String>) -> Vec<RecipientOutcome> {
    let reason = reason.into();
    tokens
        .iter()
        .map(|token| RecipientOutcome::new(token.clone(), Outcome::Unknown(reason.clone())))
        .collect()
}

// A group-level failure before any call went out: one error, every
// recipient unknown.
fn aborted(tokens: &[String], error: DispatchError) -> Classification {
    Classification {
        outcomes: not_attempted(tokens, format!("not attempted: {error}")),
        errors: vec![error],
    }
}

fn deadline_exceeded(options: &DispatchOptions) -> bool {
    options
        .deadline
        .is_some_and(|deadline| Instant::now() >= deadline)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
