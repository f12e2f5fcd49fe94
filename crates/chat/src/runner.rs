use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use suggestbox_core::config::GatewayConfig;
use thiserror::Error;
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher, HandlerResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("gateway connection failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl From<&GatewayConfig> for ReconnectPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_reconnect_retries,
            base_delay_ms: config.reconnect_base_delay_ms,
            max_delay_ms: config.reconnect_max_delay_ms,
        }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Inbound event source. `next_envelope` yields `Ok(None)` once the stream has closed.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Live counters read by the health endpoint.
#[derive(Debug, Default)]
pub struct RunnerStatus {
    connected: AtomicBool,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl RunnerStatus {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
    status: Arc<RunnerStatus>,
    stop: watch::Sender<bool>,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
            reconnect_policy,
            status: Arc::new(RunnerStatus::default()),
            stop: watch::channel(false).0,
        }
    }

    pub fn status(&self) -> Arc<RunnerStatus> {
        Arc::clone(&self.status)
    }

    /// Asks a running [`start`](Self::start) to finish: in-flight handlers are drained and the
    /// transport is disconnected before it returns.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Pumps envelopes until the transport closes cleanly or [`stop`](Self::stop) is called.
    /// Connection failures are retried with backoff; running out of retries is returned to the
    /// caller.
    pub async fn start(&self) -> Result<(), RunnerError> {
        let mut stop = self.stop.subscribe();
        let mut attempt = 0;
        loop {
            if *stop.borrow_and_update() {
                return Ok(());
            }
            match self.connect_and_pump(attempt, &mut stop).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    self.status.set_connected(false);
                    warn!(
                        event_name = "ingress.gateway.transport_failed",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        error!(
                            event_name = "ingress.gateway.retries_exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway reconnect retries exhausted"
                        );
                        return Err(RunnerError::RetriesExhausted {
                            attempts: attempt + 1,
                            last_error: transport_error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = stopped(&mut stop) => return Ok(()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        info!(event_name = "ingress.gateway.connecting", attempt, "opening gateway connection");
        self.transport.connect().await?;
        self.status.set_connected(true);
        info!(event_name = "ingress.gateway.connected", attempt, "gateway connected");

        let mut in_flight = JoinSet::new();
        let outcome = loop {
            while in_flight.try_join_next().is_some() {}

            let next = tokio::select! {
                biased;
                _ = stopped(stop) => None,
                next = self.transport.next_envelope() => Some(next),
            };
            let Some(next) = next else {
                info!(
                    event_name = "ingress.gateway.stopping",
                    attempt,
                    "stop requested; closing gateway stream"
                );
                break Ok(());
            };

            let envelope = match next {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            };

            let (post_id, channel_id) = correlation_fields(&envelope);
            info!(
                event_name = "ingress.gateway.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                post_id = post_id.unwrap_or("unknown"),
                channel_id = channel_id.unwrap_or("unknown"),
                "received chat envelope"
            );

            let dispatcher = Arc::clone(&self.dispatcher);
            let status = Arc::clone(&self.status);
            in_flight.spawn(async move { dispatch_one(&dispatcher, &status, envelope).await });
        };

        let draining = in_flight.len();
        if draining > 0 {
            debug!(
                event_name = "ingress.gateway.draining",
                in_flight = draining,
                "waiting for in-flight handlers"
            );
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(join_error) = joined {
                warn!(
                    event_name = "ingress.gateway.handler_panicked",
                    error = %join_error,
                    "event handler task did not complete"
                );
            }
        }

        self.status.set_connected(false);
        outcome?;
        info!(event_name = "ingress.gateway.closed", attempt, "gateway stream closed");
        self.transport.disconnect().await
    }
}

/// Resolves once the stop flag is set.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn dispatch_one(dispatcher: &EventDispatcher, status: &RunnerStatus, envelope: ChatEnvelope) {
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    status.dispatched.fetch_add(1, Ordering::Relaxed);
    match dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Notified(notice)) => {
            debug!(
                event_name = "ingress.gateway.user_notified",
                correlation_id = %context.correlation_id,
                notice = %notice,
                "handler reported a failure to the user"
            );
        }
        Ok(_) => {}
        Err(error) => {
            status.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                event_name = "ingress.gateway.dispatch_failed",
                envelope_id = %envelope.envelope_id,
                correlation_id = %context.correlation_id,
                error = %error,
                "event dispatch failed; continuing gateway loop"
            );
        }
    }
}

fn correlation_fields(envelope: &ChatEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        ChatEvent::ButtonPressed(event) => {
            (Some(event.message.message_id.as_str()), Some(event.message.channel_id.as_str()))
        }
        ChatEvent::MessageCreated(event) => (None, Some(event.message.channel_id.as_str())),
        ChatEvent::Unsupported { .. } => (None, None),
    }
}
