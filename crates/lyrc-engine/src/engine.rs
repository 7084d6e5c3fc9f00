//! Transmission engine
//!
//! The engine is the single task that owns the transmitter. It consumes
//! [`EngineMessage`]s in FIFO order and keeps retransmitting the last
//! `SEND_START` chain whenever the queue is empty.
//!
//! # State machine
//!
//! - `Idle`: block on the queue.
//! - `Repeating(chain)`: take the next queued command if there is one,
//!   otherwise transmit `chain` once more. New commands therefore always
//!   preempt a repeat, but never overtake each other.
//!
//! `SEND_STOP` and any valid `SEND_ONCE` return the engine to `Idle`;
//! `SEND_START` enters `Repeating`.
//!
//! # Teardown
//!
//! Waves, the transmitter and (if the engine started it) the hardware
//! service are released exactly once, whether the engine stops on a
//! shutdown message, a closed queue, a fatal hardware error or a panic
//! while processing a command.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use lyrc_catalog::Catalog;
use lyrc_protocol::Directive;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::chain::{Chain, ChainBuilder};
use crate::command::{Command, CommandReceiver, EngineMessage, Reply};
use crate::error::{EngineConfigError, HardwareError};
use crate::hardware::{Connector, ServiceControl, Transmitter, WaveId, MAX_WAVE_GPIO};
use crate::waveform::{compile_catalog, WaveformTable};

/// Reply to `SEND_STOP` when nothing is repeating
pub const NO_ACTIVE_REPEAT: &str = "No key was scheduled for repeat";
/// `LIST` reply for an unknown remote
pub const LIST_UNKNOWN_REMOTE: &str = "unknown remote";
/// `LIST` reply for an unknown key
pub const LIST_UNKNOWN_KEY: &str = "unknown key_code";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// GPIO driving the IR LED
    pub gpio_pin: u32,
    /// Divisor applied to mark/space durations before synthesis
    pub pulse_divisor: u32,
    /// Sleep between busy polls while transmitting (ms)
    pub busy_poll_ms: u64,
    /// How long a client waits for its reply (s)
    pub request_timeout_secs: u64,
    /// Start the hardware service with the engine and stop it afterwards
    pub manage_service: bool,
    /// Name of the hardware service
    pub service_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gpio_pin: 22,
            pulse_divisor: 2,
            busy_poll_ms: 50,
            request_timeout_secs: 60,
            manage_service: false,
            service_name: "pigpiod".to_string(),
        }
    }
}

impl EngineConfig {
    /// Check the settings the engine cannot run with
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.gpio_pin > MAX_WAVE_GPIO {
            return Err(EngineConfigError::GpioOutOfRange(self.gpio_pin));
        }
        if self.busy_poll_ms == 0 {
            return Err(EngineConfigError::ZeroBusyPoll);
        }
        if self.request_timeout_secs == 0 {
            return Err(EngineConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }

    /// Busy-poll interval, at least 1 ms
    pub fn busy_poll(&self) -> Duration {
        Duration::from_millis(self.busy_poll_ms.max(1))
    }

    /// Per-request timeout, at least 1 s
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Repeat state of the transmitter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Nothing is being repeated
    #[default]
    Idle,
    /// The chain is retransmitted whenever the queue is empty
    Repeating(Chain),
}

impl EngineState {
    /// Returns whether a chain is being repeated
    pub fn is_repeating(&self) -> bool {
        matches!(self, Self::Repeating(_))
    }
}

/// Play `waves` and wait until the hardware is done
async fn transmit(
    tx: &mut dyn Transmitter,
    waves: &[WaveId],
    poll: Duration,
) -> Result<(), HardwareError> {
    tx.send_chain(waves).await?;
    while tx.is_busy().await? {
        tokio::time::sleep(poll).await;
    }
    Ok(())
}

struct Engine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    tx: Box<dyn Transmitter>,
    waveforms: WaveformTable,
    state: EngineState,
    service: Option<ServiceControl>,
}

impl Engine {
    async fn compile_waveforms(&mut self) -> Result<(), HardwareError> {
        self.tx.clear_waves().await?;
        compile_catalog(
            self.tx.as_mut(),
            &self.catalog,
            self.config.gpio_pin,
            self.config.pulse_divisor,
            &mut self.waveforms,
        )
        .await
    }

    async fn run(&mut self, queue: &mut CommandReceiver) -> Result<(), HardwareError> {
        self.compile_waveforms().await?;
        info!(
            "Transmission engine ready on GPIO {} with {} remote(s)",
            self.config.gpio_pin,
            self.catalog.len()
        );

        loop {
            let message = if self.state.is_repeating() {
                match queue.try_recv() {
                    Ok(message) => Some(message),
                    Err(TryRecvError::Empty) => {
                        self.repeat_once().await?;
                        // A zero-latency transmitter must not starve producers
                        tokio::task::yield_now().await;
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => None,
                }
            } else {
                queue.recv().await
            };

            match message {
                Some(EngineMessage::Command(command)) => self.handle(command).await?,
                Some(EngineMessage::Shutdown) => {
                    info!("Shutdown requested for transmission engine");
                    break;
                }
                None => {
                    info!("Engine queue closed");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn repeat_once(&mut self) -> Result<(), HardwareError> {
        let EngineState::Repeating(chain) = std::mem::take(&mut self.state) else {
            return Ok(());
        };

        match transmit(self.tx.as_mut(), chain.waves(), self.config.busy_poll()).await {
            Ok(()) => {
                self.state = EngineState::Repeating(chain);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    "Repeat of {} {} failed, stopping repeat: {}",
                    chain.remote(),
                    chain.key(),
                    e
                );
                Ok(())
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<(), HardwareError> {
        debug!(
            "Processing {} '{}' '{}'",
            command.directive, command.remote, command.key
        );

        let (reply, result) = match &command.directive {
            Directive::List => (self.list(&command.remote, &command.key), Ok(())),
            Directive::SendStop => (self.stop_repeat(), Ok(())),
            Directive::SendOnce | Directive::SendStart => {
                let repeat = command.directive == Directive::SendStart;
                match self.send(&command.remote, &command.key, repeat).await {
                    Ok(reply) => (reply, Ok(())),
                    Err(e) => (Reply::error(format!("transmission failed: {}", e)), Err(e)),
                }
            }
            Directive::Other(name) => (
                Reply::Error(format!("Directive '{}' not supported", name)),
                Ok(()),
            ),
        };

        command.resolve(reply);
        result
    }

    fn list(&self, remote: &str, key: &str) -> Reply {
        if remote.is_empty() {
            return Reply::Data(self.catalog.names().map(String::from).collect());
        }
        let Some(definition) = self.catalog.get(remote) else {
            return Reply::error(LIST_UNKNOWN_REMOTE);
        };
        if key.is_empty() {
            return Reply::Data(definition.codes.keys().map(String::from).collect());
        }
        match definition.codes.hex(key) {
            Some(hex) => Reply::Data(vec![format!("{} {}", key, hex)]),
            None => Reply::error(LIST_UNKNOWN_KEY),
        }
    }

    fn stop_repeat(&mut self) -> Reply {
        match std::mem::take(&mut self.state) {
            EngineState::Repeating(chain) => {
                info!("Stopped repeating {} {}", chain.remote(), chain.key());
                Reply::Success
            }
            EngineState::Idle => Reply::error(NO_ACTIVE_REPEAT),
        }
    }

    /// Transmit a key; only fatal hardware errors are returned as `Err`
    async fn send(&mut self, remote: &str, key: &str, repeat: bool) -> Result<Reply, HardwareError> {
        let chain = match ChainBuilder::new(&self.catalog, &self.waveforms).build(remote, key, repeat) {
            Ok(chain) => chain,
            Err(e) => return Ok(Reply::error(e)),
        };
        debug!("Chain for {} {}: {:?}", remote, key, chain.symbols());

        // A valid send always replaces the current repeat
        self.state = EngineState::Idle;

        match transmit(self.tx.as_mut(), chain.waves(), self.config.busy_poll()).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Transmission of {} {} failed: {}", remote, key, e);
                return Ok(Reply::error(format!("transmission failed: {}", e)));
            }
        }

        if repeat {
            info!("Repeating {} {}", remote, key);
            self.state = EngineState::Repeating(chain);
        }
        Ok(Reply::Success)
    }

    async fn teardown(mut self) {
        let waves = self.waveforms.drain_waves();
        debug!("Releasing {} wave(s)", waves.len());
        for wave in waves {
            if let Err(e) = self.tx.delete_wave(wave).await {
                warn!("Failed to delete wave {}: {}", wave.0, e);
                if e.is_fatal() {
                    break;
                }
            }
        }

        if let Err(e) = self.tx.release().await {
            warn!("Failed to release transmitter: {}", e);
        }

        if let Some(service) = self.service.take() {
            info!("Stopping {}", service.name());
            service.stop().await;
        }

        info!("Transmission engine stopped");
    }
}

/// Run the transmission engine until shutdown
///
/// Validates `config`, acquires the transmitter through `connector`,
/// compiles every remote of `catalog` and then processes `queue`. Returns the fatal hardware error
/// that stopped the engine, if any. Commands still queued when the engine
/// stops are dropped, which closes their result slots.
pub async fn run_engine(
    catalog: Arc<Catalog>,
    connector: Arc<dyn Connector>,
    config: EngineConfig,
    mut queue: CommandReceiver,
) -> Result<(), HardwareError> {
    info!("Starting transmission engine");

    if let Err(e) = config.validate() {
        error!("Refusing to start transmission engine: {}", e);
        return Err(HardwareError::InvalidWaveform(e.to_string()));
    }

    let service = if config.manage_service {
        let control = ServiceControl::new(config.service_name.clone());
        control.start().await.then_some(control)
    } else {
        None
    };

    let tx = match connector.connect(config.gpio_pin).await {
        Ok(tx) => tx,
        Err(e) => {
            error!("Failed to acquire transmitter: {}", e);
            if let Some(service) = service {
                service.stop().await;
            }
            return Err(e);
        }
    };

    let mut engine = Engine {
        catalog,
        config,
        tx,
        waveforms: WaveformTable::new(),
        state: EngineState::Idle,
        service,
    };

    let outcome = AssertUnwindSafe(engine.run(&mut queue))
        .catch_unwind()
        .await;

    engine.teardown().await;

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Transmission engine stopped on hardware failure: {}", e);
            Err(e)
        }
        Err(_) => {
            error!("Transmission engine panicked");
            Err(HardwareError::Unavailable("engine panicked".to_string()))
        }
    }
}
