//! Telemetry broker connection
//!
//! A transport runs one session: it connects, subscribes to the session's
//! topics on every connection acknowledgement and forwards what it sees as
//! [`TransportEvent`]s. It keeps reconnecting with a capped exponential
//! backoff until the receiving side goes away.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use std::time::Duration;
use tokio::sync::mpsc;

use super::message::{heard_by_me_topic, heard_by_others_topic};
use crate::config::PskReporterConfig;

/// Everything a transport needs to run one operator's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub operator: String,
    pub client_id: String,
    pub topics: Vec<String>,
}

impl SessionInfo {
    pub fn new(operator: &str, topic_prefix: &str) -> Self {
        let nonce = uuid::Uuid::now_v7().simple().to_string();
        Self {
            operator: operator.to_string(),
            client_id: format!("spotdeck_{}_{}", operator, &nonce[nonce.len() - 8..]),
            topics: vec![
                heard_by_others_topic(topic_prefix, operator),
                heard_by_me_topic(topic_prefix, operator),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Offline(String),
    Reconnecting,
}

#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Run the session until `events` is closed.
    async fn run(&self, session: SessionInfo, events: mpsc::Sender<TransportEvent>);
}

/// Next reconnect delay: doubles from one second, never above `max`.
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    if current.is_zero() {
        Duration::from_secs(1).min(max)
    } else {
        current.saturating_mul(2).min(max)
    }
}

/// MQTT over secure WebSocket
pub struct MqttTransport {
    broker_url: String,
    broker_port: u16,
    keep_alive: Duration,
    connect_timeout: Duration,
    reconnect_max: Duration,
}

impl MqttTransport {
    pub fn new(config: &PskReporterConfig) -> Self {
        Self {
            broker_url: config.broker_url.clone(),
            broker_port: config.broker_port,
            keep_alive: Duration::from_secs(config.keep_alive_secs.max(5)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            reconnect_max: Duration::from_secs(config.reconnect_max_secs.max(1)),
        }
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.broker_url.clone(), self.broker_port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if self.broker_url.starts_with("wss://") {
            options.set_transport(Transport::wss_with_default_config());
        } else if self.broker_url.starts_with("ws://") {
            options.set_transport(Transport::Ws);
        }
        options
    }
}

#[async_trait]
impl TelemetryTransport for MqttTransport {
    async fn run(&self, session: SessionInfo, events: mpsc::Sender<TransportEvent>) {
        tracing::info!(
            "Connecting to {} as {} for {}",
            self.broker_url,
            session.client_id,
            session.operator
        );

        let (client, mut eventloop) = AsyncClient::new(self.options(&session.client_id), 64);
        let mut connected = false;
        let mut backoff = Duration::ZERO;

        loop {
            if events.is_closed() {
                break;
            }

            let polled = if connected {
                Ok(eventloop.poll().await)
            } else {
                tokio::time::timeout(self.connect_timeout, eventloop.poll()).await
            };

            let failure = match polled {
                Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                    connected = true;
                    backoff = Duration::ZERO;
                    for topic in &session.topics {
                        if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                            tracing::warn!("Failed to queue subscription to {}: {}", topic, e);
                        }
                    }
                    tracing::info!("Connected to telemetry broker, subscribed to {} topics", session.topics.len());
                    if events.send(TransportEvent::Connected).await.is_err() {
                        break;
                    }
                    continue;
                }
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    let event = TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                    continue;
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("connect timed out after {}s", self.connect_timeout.as_secs()),
            };

            connected = false;
            backoff = next_backoff(backoff, self.reconnect_max);
            tracing::warn!(
                "Telemetry broker connection lost: {}. Reconnecting in {}s",
                failure,
                backoff.as_secs()
            );

            if events.send(TransportEvent::Offline(failure)).await.is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = events.closed() => break,
            }
            if events.send(TransportEvent::Reconnecting).await.is_err() {
                break;
            }
        }

        if let Err(e) = client.try_disconnect() {
            tracing::debug!("Disconnect request not queued: {}", e);
        }
        tracing::info!("Telemetry session for {} closed", session.operator);
    }
}
