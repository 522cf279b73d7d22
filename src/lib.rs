//! # neewer_rs
//!
//! An async Rust driver for Neewer network lights over UDP.
//!
//! This crate provides a **runtime-agnostic** async client that keeps a
//! connection to a single light alive, tracks its power, brightness and
//! color temperature, and lets you change them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::net::Ipv4Addr;
//! use neewer_rs::{Config, Event, Neewer};
//!
//! async fn control_light() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new(Ipv4Addr::new(192, 168, 1, 40), Ipv4Addr::new(192, 168, 1, 10));
//!     let light = Neewer::connect(config, |event: &Event| println!("{event:?}")).await?;
//!
//!     // 80% brightness, 5600K
//!     light.set_light(80, 56).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Liveness**: Heartbeats are exchanged automatically; see [`Event::AliveChanged`]
//! - **State Tracking**: Reports from the light update a [`DeviceState`] snapshot
//! - **Change Notifications**: Any [`Observer`] (or plain closure) receives [`Event`]s
//! - **Paced Writes**: Outbound messages are spaced out and retried on socket errors
//! - **Extensible Decoding**: Unknown message ids surface as [`Message::Generic`]
//!
//! ## Communication
//!
//! The light listens on UDP port 5052 and talks back to the client on the same
//! port. Every datagram carries one or more frames:
//!
//! ```text
//! 0x80 | id | len | payload[len] | checksum
//! ```
//!
//! where the checksum is the sum of all preceding bytes modulo 256. See
//! [`frame`] and [`lv`] for the wire helpers.
//!
//! ## Runtime Selection
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! neewer-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! neewer-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! neewer-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod config;
mod device;
mod errors;
mod event;
pub mod frame;
mod history;
pub mod lv;
mod message;
mod pipeline;
mod registry;
pub mod runtime;
mod state;
mod types;

// Re-export public API
pub use config::Config;
pub use device::Neewer;
pub use errors::{Error, ErrorKind};
pub use event::{Event, EventSender, Observer, event_channel, ignore_events};
pub use history::{Direction, HistoryEntry, HistorySummary, MessageHistory};
pub use message::{Broadcast, Light, Message, Power, StateValue};
pub use registry::MessageRegistry;
pub use state::{Connection, DeviceState, Effects};
pub use types::{Brightness, MessageKind, StateKind, Temperature};
