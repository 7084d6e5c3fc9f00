//! LYRC Transmission Engine
//!
//! This crate owns the single infrared transmitter and everything needed to
//! drive it from queued requests.
//!
//! # Architecture
//!
//! - The **waveform compiler** turns each remote's [`TimingSpec`] into
//!   reusable hardware waves (one per pulse duration) once per engine start.
//! - The **chain builder** maps a key code onto those waves, header first,
//!   one wave group per bit (MSB first), trailer last, and the gap when a
//!   repeat is being started.
//! - The **engine** is a single long-lived task that owns the
//!   [`Transmitter`]. All access goes through an unbounded FIFO queue of
//!   [`EngineMessage`]s, so no lock guards the hardware.
//! - Each [`Command`] carries a oneshot result slot that the engine fills
//!   exactly once. [`EngineHandle::submit`] awaits it with a timeout.
//! - [`EngineLifecycle`] starts the engine for the first client and shuts it
//!   down after the last one leaves.
//!
//! [`TimingSpec`]: lyrc_catalog::TimingSpec
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lyrc_engine::{EngineConfig, EngineLifecycle, PigpioConnector};
//! use lyrc_protocol::Request;
//!
//! let lifecycle = EngineLifecycle::new(
//!     Arc::new(PigpioConnector::new("localhost", 8888)),
//!     EngineConfig::default(),
//!     Arc::new(move || catalog.clone()),
//! );
//!
//! let handle = lifecycle.acquire().await;
//! let response = handle.submit(&Request::parse("SEND_ONCE TV POWER")?).await;
//! print!("{}", response.render());
//! lifecycle.release().await;
//! ```

pub mod chain;
pub mod command;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod lifecycle;
pub mod pigpio;
pub mod waveform;

pub use chain::{Chain, ChainBuilder, Symbol};
pub use command::{Command, CommandReceiver, CommandSender, EngineMessage, Reply};
pub use engine::{run_engine, EngineConfig, EngineState};
pub use error::{ChainError, EngineConfigError, HardwareError};
pub use hardware::{Connector, Pulse, ServiceControl, Transmitter, WaveId, MAX_WAVE_GPIO};
pub use lifecycle::{CatalogSource, EngineHandle, EngineLifecycle};
pub use pigpio::{PigpioConnector, PigpioTransmitter};
pub use waveform::{CompiledRemote, CompiledSymbol, WaveformTable};
