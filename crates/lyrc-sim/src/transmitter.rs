//! Virtual transmitter
//!
//! Behaves like a pigpio waveform engine without touching any GPIO: waves
//! get sequential ids, a chain may only reference registered waves, and the
//! transmitter reports busy for `transmit_time_ms` after each chain.

use std::time::Duration;

use async_trait::async_trait;
use lyrc_engine::{Connector, HardwareError, Pulse, Transmitter, WaveId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::probe::{SimProbe, Transmission};

/// Configuration for the simulated hardware
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VirtualConfig {
    /// How long each chain keeps the transmitter busy
    pub transmit_time_ms: u64,
    /// Refuse every connection attempt
    pub fail_connect: bool,
}

impl VirtualConfig {
    /// Busy time per chain
    pub fn transmit_time(&self) -> Duration {
        Duration::from_millis(self.transmit_time_ms)
    }
}

/// Hands out virtual transmitters sharing one [`SimProbe`]
#[derive(Debug, Clone)]
pub struct VirtualConnector {
    config: VirtualConfig,
    probe: SimProbe,
}

impl VirtualConnector {
    pub fn new(config: VirtualConfig) -> Self {
        Self {
            config,
            probe: SimProbe::new(),
        }
    }

    /// Probe observing every transmitter this connector creates
    pub fn probe(&self) -> SimProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Connector for VirtualConnector {
    async fn connect(&self, gpio_pin: u32) -> Result<Box<dyn Transmitter>, HardwareError> {
        if self.config.fail_connect {
            return Err(HardwareError::Unavailable(
                "virtual transmitter refused connection".to_string(),
            ));
        }
        {
            let mut state = self.probe.lock();
            state.disconnected = false;
            state.connects += 1;
        }
        info!("Virtual transmitter connected on GPIO {}", gpio_pin);
        Ok(Box::new(VirtualTransmitter {
            transmit_time: self.config.transmit_time(),
            probe: self.probe.clone(),
        }))
    }
}

/// In-memory transmitter
#[derive(Debug)]
pub struct VirtualTransmitter {
    transmit_time: Duration,
    probe: SimProbe,
}

impl VirtualTransmitter {
    fn check_connected(&self) -> Result<(), HardwareError> {
        if self.probe.lock().disconnected {
            return Err(HardwareError::Unavailable(
                "virtual transmitter disconnected".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transmitter for VirtualTransmitter {
    async fn clear_waves(&mut self) -> Result<(), HardwareError> {
        self.check_connected()?;
        let mut state = self.probe.lock();
        state.waves.clear();
        state.clears += 1;
        Ok(())
    }

    async fn create_wave(&mut self, pulses: &[Pulse]) -> Result<WaveId, HardwareError> {
        self.check_connected()?;
        if pulses.is_empty() {
            return Err(HardwareError::InvalidWaveform("empty wave".to_string()));
        }
        let mut state = self.probe.lock();
        let id = WaveId(state.next_id);
        state.next_id += 1;
        state.waves.insert(id, pulses.to_vec());
        Ok(id)
    }

    async fn delete_wave(&mut self, wave: WaveId) -> Result<(), HardwareError> {
        self.check_connected()?;
        match self.probe.lock().waves.remove(&wave) {
            Some(_) => Ok(()),
            None => Err(HardwareError::InvalidWaveform(format!(
                "wave {} does not exist",
                wave.0
            ))),
        }
    }

    async fn send_chain(&mut self, waves: &[WaveId]) -> Result<(), HardwareError> {
        self.check_connected()?;
        let mut state = self.probe.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        let mut airtime_us = 0u64;
        for wave in waves {
            let pulses = state.waves.get(wave).ok_or_else(|| {
                HardwareError::InvalidWaveform(format!("wave {} does not exist", wave.0))
            })?;
            airtime_us += pulses.iter().map(|p| u64::from(p.delay_us)).sum::<u64>();
        }

        debug!(
            "Virtual transmission of {} wave(s), {} us",
            waves.len(),
            airtime_us
        );
        state.transmissions.push(Transmission {
            waves: waves.to_vec(),
            airtime_us,
        });
        state.busy_until = Some(Instant::now() + self.transmit_time);
        Ok(())
    }

    async fn is_busy(&mut self) -> Result<bool, HardwareError> {
        self.check_connected()?;
        let state = self.probe.lock();
        Ok(state.busy_until.is_some_and(|until| Instant::now() < until))
    }

    async fn release(&mut self) -> Result<(), HardwareError> {
        let mut state = self.probe.lock();
        state.releases += 1;
        state.busy_until = None;
        info!("Virtual transmitter released");
        Ok(())
    }
}
