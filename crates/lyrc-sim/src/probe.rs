//! Shared state of the simulated hardware

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lyrc_engine::{HardwareError, Pulse, WaveId};
use tokio::time::Instant;

/// One chain played by a virtual transmitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    /// Wave ids in playback order
    pub waves: Vec<WaveId>,
    /// Sum of all pulse delays in the chain
    pub airtime_us: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SimState {
    pub(crate) next_id: u32,
    pub(crate) waves: BTreeMap<WaveId, Vec<Pulse>>,
    pub(crate) transmissions: Vec<Transmission>,
    pub(crate) connects: usize,
    pub(crate) releases: usize,
    pub(crate) clears: usize,
    pub(crate) fail_next: Option<HardwareError>,
    pub(crate) disconnected: bool,
    pub(crate) busy_until: Option<Instant>,
}

/// Handle for inspecting and steering the simulated hardware
///
/// Cloned probes share the same state as the connector that created them.
#[derive(Debug, Clone, Default)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every chain played so far
    pub fn transmissions(&self) -> Vec<Transmission> {
        self.lock().transmissions.clone()
    }

    /// Number of chains played so far
    pub fn transmission_count(&self) -> usize {
        self.lock().transmissions.len()
    }

    /// Waves currently registered
    pub fn live_wave_count(&self) -> usize {
        self.lock().waves.len()
    }

    /// Pulses of a registered wave
    pub fn wave(&self, id: WaveId) -> Option<Vec<Pulse>> {
        self.lock().waves.get(&id).cloned()
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// Number of transmitter releases
    pub fn release_count(&self) -> usize {
        self.lock().releases
    }

    /// Number of `clear_waves` calls
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// Make the next `send_chain` fail with `error`
    pub fn fail_next_transmission(&self, error: HardwareError) {
        self.lock().fail_next = Some(error);
    }

    /// Returns whether an injected failure is still waiting to fire
    pub fn has_pending_failure(&self) -> bool {
        self.lock().fail_next.is_some()
    }

    /// Drop the simulated connection: every later call fails as unavailable
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    /// Wait until at least `count` chains were played
    ///
    /// Returns `false` if `timeout` passed first.
    pub async fn wait_for_transmissions(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.transmission_count() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
