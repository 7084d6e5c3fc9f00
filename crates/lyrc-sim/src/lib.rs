//! LYRC Simulation Library
//!
//! A stand-in for the pigpio daemon, used by `lyrcd --simulate` and by the
//! engine tests. It includes:
//!
//! - **VirtualConnector**: hands out virtual transmitters, optionally
//!   refusing to connect
//! - **VirtualTransmitter**: registers waves in memory and records every
//!   chain it is asked to play, staying busy for a configurable time
//! - **SimProbe**: shared view of the simulated hardware for assertions and
//!   fault injection
//!
//! # Example
//!
//! ```rust
//! use lyrc_engine::{Connector, Pulse};
//! use lyrc_sim::{VirtualConfig, VirtualConnector};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! rt.block_on(async {
//!     let connector = VirtualConnector::new(VirtualConfig::default());
//!     let probe = connector.probe();
//!
//!     let mut tx = connector.connect(22).await.unwrap();
//!     let wave = tx.create_wave(&[Pulse::high(22, 13), Pulse::low(22, 13)]).await.unwrap();
//!     tx.send_chain(&[wave, wave]).await.unwrap();
//!
//!     assert_eq!(probe.transmission_count(), 1);
//!     assert_eq!(probe.transmissions()[0].airtime_us, 52);
//! });
//! ```

pub mod probe;
pub mod transmitter;

pub use probe::{SimProbe, Transmission};
pub use transmitter::{VirtualConfig, VirtualConnector, VirtualTransmitter};
