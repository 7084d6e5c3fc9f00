//! Transmitter hardware seam
//!
//! The engine talks to the transmitter only through [`Transmitter`], which
//! follows the pigpio waveform model: pulses are uploaded once and turned
//! into reusable waves, and a transmission is a chain of wave ids played
//! back-to-back by the hardware.

use async_trait::async_trait;
use tokio::process::Command as ProcessCommand;
use tracing::{info, warn};

use crate::error::HardwareError;

/// Highest GPIO a wave pulse can switch
pub const MAX_WAVE_GPIO: u32 = 31;

/// Opaque handle of a wave registered with the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveId(pub u32);

/// One pulse of a wave
///
/// The GPIOs in `on_mask` go high and those in `off_mask` go low, then the
/// level is held for `delay_us` microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// GPIOs switched on at the start of the pulse
    pub on_mask: u32,
    /// GPIOs switched off at the start of the pulse
    pub off_mask: u32,
    /// Pulse length in microseconds
    pub delay_us: u32,
}

impl Pulse {
    /// Carrier-high pulse on `gpio_pin`
    ///
    /// `gpio_pin` must not exceed [`MAX_WAVE_GPIO`].
    pub fn high(gpio_pin: u32, delay_us: u32) -> Self {
        Self {
            on_mask: 1 << gpio_pin,
            off_mask: 0,
            delay_us,
        }
    }

    /// Carrier-low pulse on `gpio_pin`
    pub fn low(gpio_pin: u32, delay_us: u32) -> Self {
        Self {
            on_mask: 0,
            off_mask: 1 << gpio_pin,
            delay_us,
        }
    }

    /// Pulse that changes no GPIO
    pub fn silence(delay_us: u32) -> Self {
        Self {
            on_mask: 0,
            off_mask: 0,
            delay_us,
        }
    }
}

/// An acquired transmitter
///
/// Exactly one task owns a transmitter at a time; none of the methods need
/// to be safe against concurrent use.
#[async_trait]
pub trait Transmitter: Send {
    /// Drop every wave the hardware knows about, including a previous owner's
    async fn clear_waves(&mut self) -> Result<(), HardwareError>;

    /// Register a wave and return its reusable id
    async fn create_wave(&mut self, pulses: &[Pulse]) -> Result<WaveId, HardwareError>;

    /// Release a wave
    async fn delete_wave(&mut self, wave: WaveId) -> Result<(), HardwareError>;

    /// Start transmitting the waves back-to-back; returns once queued
    async fn send_chain(&mut self, waves: &[WaveId]) -> Result<(), HardwareError>;

    /// Returns whether a transmission is still in progress
    async fn is_busy(&mut self) -> Result<bool, HardwareError>;

    /// Give the transmitter back
    async fn release(&mut self) -> Result<(), HardwareError>;
}

/// Acquires a transmitter driving `gpio_pin`
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the hardware and configure the pin as an output
    async fn connect(&self, gpio_pin: u32) -> Result<Box<dyn Transmitter>, HardwareError>;
}

/// Starts and stops the system service backing the transmitter
#[derive(Debug, Clone)]
pub struct ServiceControl {
    name: String,
}

impl ServiceControl {
    /// Control the named service (e.g. `pigpiod`)
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Service name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the service; returns whether it started
    pub async fn start(&self) -> bool {
        self.run("start").await
    }

    /// Stop the service
    pub async fn stop(&self) {
        self.run("stop").await;
    }

    async fn run(&self, action: &str) -> bool {
        let status = ProcessCommand::new("sudo")
            .args(["service", self.name.as_str(), action])
            .status()
            .await;
        match status {
            Ok(s) if s.success() => {
                info!("Service {}: {} ok", self.name, action);
                true
            }
            Ok(s) => {
                warn!("Service {}: {} exited with {}", self.name, action, s);
                false
            }
            Err(e) => {
                warn!("Service {}: {} failed: {}", self.name, action, e);
                false
            }
        }
    }
}
