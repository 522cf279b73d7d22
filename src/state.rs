//! Connection liveness and device state tracking.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::message::{Message, StateValue};
use crate::types::StateKind;

/// Last known state of the light.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub alive: bool,
    pub power: bool,
    pub brightness: u8,
    pub temperature: u8,
}

/// What the connection wants done after handling an input.
///
/// Outbound messages must be enqueued in order; events are delivered after.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub outbound: Vec<Message>,
    pub events: Vec<Event>,
}

/// The liveness state machine for one connection.
///
/// Starts dead. A host heartbeat makes it alive; a tick more than the
/// heartbeat timeout after the last heartbeat makes it dead again. Every
/// tick also decides what to poke the light with: a connect request while
/// dead, a client heartbeat plus a light query while alive.
///
/// Time is passed in explicitly so the machine can be driven in tests.
#[derive(Debug)]
pub struct Connection {
    state: DeviceState,
    last_heartbeat: Option<Instant>,
    client_ip: Ipv4Addr,
    timeout: Duration,
}

impl Connection {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(client_ip: Ipv4Addr, timeout: Duration) -> Self {
        Connection {
            state: DeviceState::default(),
            last_heartbeat: None,
            client_ip,
            timeout,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state.alive
    }

    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    /// React to a message received from the light.
    pub fn handle(&mut self, message: &Message, now: Instant) -> Effects {
        let mut effects = Effects::default();
        match message {
            Message::HostHeartbeat => {
                self.last_heartbeat = Some(now);
                if !self.state.alive {
                    info!("Light is alive");
                    self.state.alive = true;
                    effects.outbound.push(Message::QueryState(StateKind::Power));
                    effects.events.push(Event::AliveChanged(true));
                    effects.events.push(Event::StateChanged(self.state));
                }
            }
            Message::StateReport(report) => self.apply_report(report, &mut effects),
            Message::Generic { id, payload } => {
                debug!("Received unknown message: id={id:#04x}, data={payload:02x?}");
                effects.events.push(Event::Unknown {
                    id: *id,
                    payload: payload.clone(),
                });
            }
            other => trace!("Ignoring inbound {}", other.name()),
        }
        effects
    }

    /// Periodic liveness check and keepalive.
    pub fn tick(&mut self, now: Instant) -> Effects {
        let mut effects = Effects::default();

        if self.state.alive && self.heartbeat_expired(now) {
            info!("No heartbeat for over {:?}, light is dead", self.timeout);
            self.state.alive = false;
            effects.events.push(Event::AliveChanged(false));
        }

        if self.state.alive {
            effects.outbound.push(Message::ClientHeartbeat);
            effects.outbound.push(Message::QueryState(StateKind::Light));
        } else {
            effects.outbound.push(Message::ConnectRequest {
                client_ip: self.client_ip,
            });
        }
        effects
    }

    fn heartbeat_expired(&self, now: Instant) -> bool {
        match self.last_heartbeat {
            Some(at) => now.saturating_duration_since(at) > self.timeout,
            None => true,
        }
    }

    fn apply_report(&mut self, report: &StateValue, effects: &mut Effects) {
        let before = effects.events.len();
        match report {
            StateValue::Power(power) => {
                if self.state.power != power.on {
                    self.state.power = power.on;
                    effects.events.push(Event::PowerChanged(power.on));
                }
            }
            StateValue::Light(light) => {
                if self.state.brightness != light.brightness {
                    self.state.brightness = light.brightness;
                    effects.events.push(Event::BrightnessChanged(light.brightness));
                }
                if self.state.temperature != light.temperature {
                    self.state.temperature = light.temperature;
                    effects.events.push(Event::TemperatureChanged(light.temperature));
                }
            }
        }
        if effects.events.len() > before {
            effects.events.push(Event::StateChanged(self.state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Light, Power};

    const CLIENT: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

    fn connection() -> Connection {
        Connection::new(CLIENT, Connection::DEFAULT_TIMEOUT)
    }

    fn alive_connection(now: Instant) -> Connection {
        let mut conn = connection();
        conn.handle(&Message::HostHeartbeat, now);
        conn
    }

    fn light_report(brightness: u8, temperature: u8) -> Message {
        Message::StateReport(StateValue::Light(Light::new(brightness, temperature).unwrap()))
    }

    #[test]
    fn test_dead_tick_requests_connection() {
        let mut conn = connection();
        let effects = conn.tick(Instant::now());
        assert_eq!(
            effects.outbound,
            vec![Message::ConnectRequest { client_ip: CLIENT }]
        );
        assert!(effects.events.is_empty());
    }

    #[test]
    fn test_first_heartbeat_makes_alive() {
        let mut conn = connection();
        let effects = conn.handle(&Message::HostHeartbeat, Instant::now());

        assert!(conn.is_alive());
        assert_eq!(effects.outbound, vec![Message::QueryState(StateKind::Power)]);
        assert_eq!(
            effects.events,
            vec![
                Event::AliveChanged(true),
                Event::StateChanged(DeviceState {
                    alive: true,
                    ..DeviceState::default()
                }),
            ]
        );
    }

    #[test]
    fn test_repeated_heartbeat_is_quiet() {
        let start = Instant::now();
        let mut conn = alive_connection(start);
        let effects = conn.handle(&Message::HostHeartbeat, start + Duration::from_secs(1));
        assert_eq!(effects, Effects::default());
        assert_eq!(conn.last_heartbeat(), Some(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_alive_tick_sends_heartbeat_then_query() {
        let start = Instant::now();
        let mut conn = alive_connection(start);
        let effects = conn.tick(start + Duration::from_secs(1));
        assert_eq!(
            effects.outbound,
            vec![
                Message::ClientHeartbeat,
                Message::QueryState(StateKind::Light)
            ]
        );
        assert!(effects.events.is_empty());
    }

    #[test]
    fn test_dies_strictly_after_timeout() {
        let start = Instant::now();
        let mut conn = alive_connection(start);

        let mut alive_events = Vec::new();
        for secs in 1..=5 {
            let effects = conn.tick(start + Duration::from_secs(secs));
            alive_events.extend(effects.events);
        }
        assert!(conn.is_alive(), "still alive at exactly 5s");
        assert!(alive_events.is_empty());

        let effects = conn.tick(start + Duration::from_millis(5001));
        assert!(!conn.is_alive());
        assert_eq!(effects.events, vec![Event::AliveChanged(false)]);
        assert_eq!(
            effects.outbound,
            vec![Message::ConnectRequest { client_ip: CLIENT }]
        );

        // Further ticks keep requesting a connection without more events.
        for secs in 6..=9 {
            let effects = conn.tick(start + Duration::from_secs(secs));
            assert!(effects.events.is_empty());
        }
    }

    #[test]
    fn test_report_fires_only_changed_fields() {
        let mut conn = connection();
        let now = Instant::now();
        conn.handle(&light_report(60, 30), now);

        let effects = conn.handle(&light_report(60, 40), now);
        assert_eq!(
            effects.events,
            vec![
                Event::TemperatureChanged(40),
                Event::StateChanged(DeviceState {
                    alive: false,
                    power: false,
                    brightness: 60,
                    temperature: 40,
                }),
            ]
        );
    }

    #[test]
    fn test_unchanged_report_is_quiet() {
        let mut conn = connection();
        let now = Instant::now();
        let report = Message::StateReport(StateValue::Power(Power { on: true }));

        let first = conn.handle(&report, now);
        assert_eq!(first.events.len(), 2);
        assert!(conn.state().power);

        let second = conn.handle(&report, now);
        assert!(second.events.is_empty());
    }

    #[test]
    fn test_unknown_message_is_surfaced() {
        let mut conn = connection();
        let effects = conn.handle(
            &Message::Generic {
                id: 0x20,
                payload: vec![0xab],
            },
            Instant::now(),
        );
        assert_eq!(
            effects.events,
            vec![Event::Unknown {
                id: 0x20,
                payload: vec![0xab]
            }]
        );
        assert_eq!(*conn.state(), DeviceState::default());
    }

    #[test]
    fn test_outbound_only_messages_are_ignored() {
        let mut conn = connection();
        let now = Instant::now();
        for msg in [
            Message::ClientHeartbeat,
            Message::QueryState(StateKind::Light),
            Message::SetState(StateValue::Power(Power { on: true })),
        ] {
            assert_eq!(conn.handle(&msg, now), Effects::default());
        }
    }
}
