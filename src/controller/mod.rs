//! Device controller: owns the registry, maps control messages to host
//! commands, and keeps the retained bus state topics synchronized with the
//! devices themselves.
//!
//! A state publication always carries the *queried* state, never the
//! requested one. The state command stays the single source of truth even
//! immediately after a successful actuation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::bus::{topics, BusHandle, ConnectStatus, ConnectionObserver, MessageObserver};
use crate::command::CommandExecutor;
use crate::device::{DeviceRecord, DeviceRegistry, DeviceState};

pub struct DeviceController {
    registry: DeviceRegistry,
    base_topic: String,
    bus: Arc<dyn BusHandle>,
    executor: CommandExecutor,
}

impl DeviceController {
    pub fn new(
        devices: Vec<DeviceRecord>,
        base_topic: String,
        bus: Arc<dyn BusHandle>,
        executor: CommandExecutor,
    ) -> Self {
        let registry = devices.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            registry,
            base_topic,
            bus,
            executor,
        }
    }

    /// Query a device's actual state.
    ///
    /// Unknown devices and failed queries read as off.
    pub async fn device_state(&self, device_id: &str) -> DeviceState {
        let Some(device) = self.registry.get(device_id) else {
            return DeviceState::Off;
        };
        let outcome = self.executor.execute(&device.state_command).await;
        if outcome.succeeded {
            DeviceState::from_query_output(&outcome.output)
        } else {
            DeviceState::Off
        }
    }

    /// Actuate a device.
    ///
    /// On success the actual state is republished immediately; on failure
    /// nothing is published, leaving the last retained state untouched.
    pub async fn set_device_state(&self, device_id: &str, target: DeviceState) -> bool {
        let Some(device) = self.registry.get(device_id) else {
            warn!("Unknown device: {device_id}");
            return false;
        };
        let action = match target {
            DeviceState::On => &device.enable_action,
            DeviceState::Off => &device.disable_action,
        };
        let outcome = self.executor.execute(action).await;
        if outcome.succeeded {
            info!("Device {} switched {}", device.name, target.label());
            self.publish_state(device_id).await;
        } else {
            error!("Device {} action failed: {}", device.name, outcome.output);
        }
        outcome.succeeded
    }

    /// Re-query a device and publish its state, retained, at-least-once.
    pub async fn publish_state(&self, device_id: &str) {
        let state = self.device_state(device_id).await;
        let topic = topics::state_topic(&self.base_topic, device_id);
        match self.bus.publish(&topic, state.as_str(), true).await {
            Ok(()) => info!("Published state: {topic} = {state}"),
            Err(e) => error!("Failed to publish {topic}: {e}"),
        }
    }
}

#[async_trait]
impl ConnectionObserver for DeviceController {
    async fn on_connect(&self, status: ConnectStatus) {
        match status {
            ConnectStatus::Refused(code) => {
                error!("Broker refused connection: {code}");
            }
            ConnectStatus::Accepted => {
                info!("Connected to broker");
                // Every control subscription is in place before the first
                // state publish.
                for device_id in self.registry.keys() {
                    let topic = topics::control_topic(&self.base_topic, device_id);
                    match self.bus.subscribe(&topic).await {
                        Ok(()) => info!("Subscribed: {topic}"),
                        Err(e) => error!("Failed to subscribe {topic}: {e}"),
                    }
                }
                for device_id in self.registry.keys() {
                    self.publish_state(device_id).await;
                }
            }
        }
    }
}

#[async_trait]
impl MessageObserver for DeviceController {
    async fn on_message(&self, topic: &str, payload: &[u8]) {
        let Ok(payload) = std::str::from_utf8(payload) else {
            debug!("Received non-text payload on {topic}");
            return;
        };
        debug!("Received: {topic} = {payload}");

        let Some(device_id) = topics::parse_control_topic(topic) else {
            return;
        };
        let Some(target) = DeviceState::from_payload(payload) else {
            return;
        };
        self.set_device_state(device_id, target).await;
    }
}
