//! rumqttc-backed MQTT session.
//!
//! Owns the network event loop and delivers connection and message events to
//! the observers one at a time. Reconnection lives here: after a session
//! error the loop pauses briefly and polls again, and every fresh CONNACK
//! re-triggers the observer's full resynchronization.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport,
};
use tracing::{debug, error, info};

use super::{BusHandle, ConnectStatus, ConnectionObserver, MessageObserver};
use crate::config::{BrokerEndpoint, MqttConfig};
use crate::lifecycle::Shutdown;

/// Delivery quality for every subscription and publication.
const DELIVERY_QOS: QoS = QoS::AtLeastOnce;

/// Broker keep-alive interval.
const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Pause between polls after a session error.
const RECONNECT_PAUSE: Duration = Duration::from_secs(2);

/// Request queue capacity for the client/event-loop pair.
const EVENT_CAPACITY: usize = 64;

/// Publishing half of the session, handed to the controller.
#[derive(Clone)]
pub struct MqttBusHandle {
    client: AsyncClient,
}

#[async_trait]
impl BusHandle for MqttBusHandle {
    async fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, DELIVERY_QOS)
            .await
            .with_context(|| format!("subscribe to {topic} failed"))
    }

    async fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.client
            .publish(topic, DELIVERY_QOS, retain, payload)
            .await
            .with_context(|| format!("publish to {topic} failed"))
    }
}

/// MQTT session: the client plus the event loop that drives it.
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttSession {
    /// Build a session from configuration. Fails only on an unusable broker
    /// endpoint; the first network attempt happens once the loop runs.
    pub fn new(config: &MqttConfig) -> Result<Self> {
        let options = mqtt_options(config)?;
        let (client, eventloop) = AsyncClient::new(options, EVENT_CAPACITY);
        Ok(Self { client, eventloop })
    }

    /// Outbound handle for the controller; usable before the loop starts.
    pub fn handle(&self) -> Arc<dyn BusHandle> {
        Arc::new(MqttBusHandle {
            client: self.client.clone(),
        })
    }

    /// Drive the event loop until shutdown is requested and the broker
    /// connection has been torn down.
    pub async fn run<O>(mut self, observer: Arc<O>, shutdown: Arc<Shutdown>)
    where
        O: ConnectionObserver + MessageObserver,
    {
        let mut disconnecting = false;
        loop {
            tokio::select! {
                _ = shutdown.notified(), if !disconnecting => {
                    disconnecting = true;
                    info!("Disconnecting from broker");
                    if self.client.disconnect().await.is_err() {
                        break;
                    }
                }
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        let status = if ack.code == ConnectReturnCode::Success {
                            ConnectStatus::Accepted
                        } else {
                            ConnectStatus::Refused(format!("{:?}", ack.code))
                        };
                        observer.on_connect(status).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        observer.on_message(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) if disconnecting || shutdown.is_requested() => {
                        debug!("Session closed: {e}");
                        break;
                    }
                    Err(e) => {
                        error!("MQTT session error: {e}");
                        tokio::time::sleep(RECONNECT_PAUSE).await;
                    }
                }
            }
        }
    }
}

/// Translate configuration into rumqttc options, selecting the transport
/// from the endpoint scheme.
fn mqtt_options(config: &MqttConfig) -> Result<MqttOptions> {
    let mut options = match BrokerEndpoint::parse(&config.broker)? {
        BrokerEndpoint::Tcp { host, port } => {
            info!("Broker endpoint: {host}:{port} (TCP)");
            MqttOptions::new(&config.client_id, host, port)
        }
        BrokerEndpoint::TlsWebsocket { url } => {
            info!("Broker endpoint: {url} (WSS)");
            let mut options = MqttOptions::new(&config.client_id, url, 443);
            options.set_transport(Transport::wss_with_default_config());
            options
        }
    };
    options.set_credentials(&config.username, &config.password);
    options.set_keep_alive(KEEP_ALIVE);
    Ok(options)
}
