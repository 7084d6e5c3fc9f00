//! Error types for the transmission engine

use thiserror::Error;

/// Errors reported by the transmitter hardware
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// The transmitter cannot be reached (service down, connection lost)
    #[error("transmitter unavailable: {0}")]
    Unavailable(String),

    /// The hardware rejected a command
    #[error("hardware command {command} failed with status {status}")]
    Rejected {
        /// Command number
        command: u32,
        /// Negative status returned by the hardware
        status: i32,
    },

    /// A wave or chain cannot be expressed on this hardware
    #[error("invalid waveform: {0}")]
    InvalidWaveform(String),
}

impl HardwareError {
    /// Returns whether the engine must stop after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Engine settings the engine refuses to run with
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineConfigError {
    /// Waves can only drive GPIOs 0 to 31
    #[error("gpio_pin {0} cannot carry waves, must be 0-{max}", max = crate::hardware::MAX_WAVE_GPIO)]
    GpioOutOfRange(u32),

    #[error("busy_poll_ms must be at least 1")]
    ZeroBusyPoll,

    #[error("request_timeout_secs must be at least 1")]
    ZeroRequestTimeout,
}

/// Errors building a chain for a key
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Remote not in the catalog
    #[error("Unknown remote")]
    UnknownRemote,

    /// Key not in the remote's code table
    #[error("Unknown key_code")]
    UnknownKey,

    /// The remote's waveforms could not be compiled
    #[error("Remote '{0}' has no usable waveforms")]
    Uncompiled(String),
}
