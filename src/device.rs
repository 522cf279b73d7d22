//! Driver handle for a single light.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::SinkExt;
use log::debug;
use serde_json::{Value, json};

use crate::config::Config;
use crate::errors::Error;
use crate::event::Observer;
use crate::history::MessageHistory;
use crate::message::{Light, Message, Power, StateValue};
use crate::pipeline::{Outbound, Pipeline, Shared};
use crate::registry::MessageRegistry;
use crate::runtime::Mutex;
use crate::state::DeviceState;
use crate::types::StateKind;

type Result<T> = std::result::Result<T, Error>;

/// A connection to one Neewer light.
///
/// Connecting opens a socket pair and starts the background pipeline, which
/// keeps the connection alive, tracks the light's state and reports changes to
/// the [`Observer`] given at construction.
///
/// # Example
///
/// ```ignore
/// use std::net::Ipv4Addr;
/// use neewer_rs::{Config, Event, Neewer};
///
/// let config = Config::new(Ipv4Addr::new(192, 168, 1, 40), Ipv4Addr::new(192, 168, 1, 10));
/// let light = Neewer::connect(config, |event: &Event| println!("{event:?}")).await?;
/// light.set_light(80, 56).await?;
/// ```
pub struct Neewer {
    config: Config,
    shared: Shared,
    pipeline: Option<Pipeline>,
}

impl Neewer {
    /// Create a disconnected driver. Call [`Neewer::reconnect`] to start it.
    pub fn new(config: Config, observer: impl Observer) -> Self {
        Neewer {
            config,
            shared: Shared {
                registry: Arc::new(MessageRegistry::new()),
                observer: Arc::new(Mutex::new(Box::new(observer))),
                snapshot: Arc::new(Mutex::new(DeviceState::default())),
                history: Arc::new(Mutex::new(MessageHistory::new())),
            },
            pipeline: None,
        }
    }

    /// Use a custom registry for decoding inbound messages.
    pub fn with_registry(mut self, registry: MessageRegistry) -> Self {
        self.shared.registry = Arc::new(registry);
        self
    }

    /// Create a driver and connect it.
    pub async fn connect(config: Config, observer: impl Observer) -> Result<Self> {
        let mut neewer = Self::new(config, observer);
        neewer.reconnect().await?;
        Ok(neewer)
    }

    /// Tear down any running connection and start a fresh one.
    ///
    /// The old tasks are stopped before the new sockets are opened, and the
    /// device state starts over as dead.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.close().await;
        *self.shared.snapshot.lock().await = DeviceState::default();

        let pipeline = Pipeline::start(&self.config, self.shared.clone()).await?;
        debug!("Connected to {}", self.config.device_addr());
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Stop the background tasks and close the sockets.
    pub async fn close(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown().await;
            debug!("Disconnected from {}", self.config.device_addr());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The address the driver is listening on, while connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.pipeline.as_ref().map(Pipeline::local_addr)
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.send(Message::SetState(StateValue::Power(Power { on })))
            .await
    }

    /// Set brightness (0-100) and temperature (29-70), then ask the light to
    /// report the result.
    ///
    /// Out-of-range values are rejected before anything is queued.
    pub async fn set_light(&self, brightness: u8, temperature: u8) -> Result<()> {
        let light = Light::new(brightness, temperature)?;
        self.send(Message::SetState(StateValue::Light(light)))
            .await?;
        self.query(StateKind::Light).await
    }

    pub async fn query(&self, kind: StateKind) -> Result<()> {
        self.send(Message::QueryState(kind)).await
    }

    /// Queue any message for writing.
    pub async fn send(&self, message: Message) -> Result<()> {
        let mut sender = self
            .pipeline
            .as_ref()
            .ok_or(Error::NotConnected)?
            .sender();
        sender
            .send(Outbound::new(message))
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// The state as of the last change notification.
    pub async fn state(&self) -> DeviceState {
        *self.shared.snapshot.lock().await
    }

    pub async fn history(&self) -> MessageHistory {
        self.shared.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.shared.history.lock().await.clear();
    }

    /// Returns diagnostics including state, configuration, and history.
    pub async fn diagnostics(&self) -> Value {
        let state = self.state().await;
        let history = self.shared.history.lock().await;
        let kinds: Vec<&'static str> = self
            .shared
            .registry
            .kinds()
            .into_iter()
            .map(<&'static str>::from)
            .collect();

        json!({
            "device": self.config.device_addr().to_string(),
            "listen": self.local_addr().map(|a| a.to_string()),
            "connected": self.is_connected(),
            "state": serde_json::to_value(state).unwrap_or(Value::Null),
            "registered_kinds": kinds,
            "history": serde_json::to_value(history.summary()).unwrap_or(Value::Null),
        })
    }
}
