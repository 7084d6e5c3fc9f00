//! pigpiod socket client
//!
//! Speaks the pigpio daemon's binary socket protocol. Every request is a
//! 16-byte little-endian header `{cmd, p1, p2, p3}` where `p3` is the length
//! of an optional extension that follows it. Every reply is 16 bytes and the
//! last word holds the signed result; negative values are pigpio errors.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::HardwareError;
use crate::hardware::{Connector, Pulse, Transmitter, WaveId};

/// Set GPIO mode
pub const CMD_MODES: u32 = 0;
/// Clear all waveforms
pub const CMD_WVCLR: u32 = 27;
/// Append generic pulses to the waveform under construction
pub const CMD_WVAG: u32 = 28;
/// Is a waveform being transmitted
pub const CMD_WVBSY: u32 = 32;
/// Stop the current waveform
pub const CMD_WVHLT: u32 = 33;
/// Create a wave from the pulses added so far
pub const CMD_WVCRE: u32 = 49;
/// Delete a wave
pub const CMD_WVDEL: u32 = 50;
/// Start a new empty waveform
pub const CMD_WVNEW: u32 = 53;
/// Transmit a chain of waves
pub const CMD_WVCHA: u32 = 93;

/// GPIO output mode for `MODES`
const MODE_OUTPUT: u32 = 1;

/// Largest chain pigpio accepts, in bytes
pub const MAX_CHAIN_BYTES: usize = 600;

/// Wave ids from this value on cannot be chained; pigpio reserves 255 as
/// the escape byte of its chain language
const CHAIN_ESCAPE: u32 = 255;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Encode a command header and its extension
pub fn encode_command(cmd: u32, p1: u32, p2: u32, extension: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(16 + extension.len());
    frame.extend_from_slice(&cmd.to_le_bytes());
    frame.extend_from_slice(&p1.to_le_bytes());
    frame.extend_from_slice(&p2.to_le_bytes());
    frame.extend_from_slice(&(extension.len() as u32).to_le_bytes());
    frame.extend_from_slice(extension);
    frame
}

/// Encode pulses for `WVAG`, 12 bytes each
pub fn encode_pulses(pulses: &[Pulse]) -> Vec<u8> {
    let mut ext = Vec::with_capacity(pulses.len() * 12);
    for pulse in pulses {
        ext.extend_from_slice(&pulse.on_mask.to_le_bytes());
        ext.extend_from_slice(&pulse.off_mask.to_le_bytes());
        ext.extend_from_slice(&pulse.delay_us.to_le_bytes());
    }
    ext
}

/// Encode a chain for `WVCHA`, one byte per wave
pub fn encode_chain(waves: &[WaveId]) -> Result<Vec<u8>, HardwareError> {
    if waves.len() > MAX_CHAIN_BYTES {
        return Err(HardwareError::InvalidWaveform(format!(
            "chain of {} waves exceeds {} bytes",
            waves.len(),
            MAX_CHAIN_BYTES
        )));
    }
    waves
        .iter()
        .map(|w| {
            if w.0 >= CHAIN_ESCAPE {
                Err(HardwareError::InvalidWaveform(format!(
                    "wave id {} cannot be chained",
                    w.0
                )))
            } else {
                Ok(w.0 as u8)
            }
        })
        .collect()
}

/// Extract the signed result of a reply
pub fn decode_status(reply: &[u8; 16]) -> i32 {
    i32::from_le_bytes([reply[12], reply[13], reply[14], reply[15]])
}

fn unavailable(context: &str, e: std::io::Error) -> HardwareError {
    HardwareError::Unavailable(format!("{}: {}", context, e))
}

/// Connects to a pigpio daemon over TCP
#[derive(Debug, Clone)]
pub struct PigpioConnector {
    host: String,
    port: u16,
}

impl PigpioConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Daemon address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl Connector for PigpioConnector {
    async fn connect(&self, gpio_pin: u32) -> Result<Box<dyn Transmitter>, HardwareError> {
        let address = self.address();
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&address))
            .await
            .map_err(|_| HardwareError::Unavailable(format!("connect to {} timed out", address)))?
            .map_err(|e| unavailable(&format!("connect to {}", address), e))?;
        // Replies are tiny and latency matters while polling
        stream
            .set_nodelay(true)
            .map_err(|e| unavailable("configure socket", e))?;

        let mut tx = PigpioTransmitter { stream };
        tx.command(CMD_MODES, gpio_pin, MODE_OUTPUT, &[]).await?;
        info!("Connected to pigpiod at {}, GPIO {} set to output", address, gpio_pin);
        Ok(Box::new(tx))
    }
}

/// Transmitter backed by one pigpiod connection
#[derive(Debug)]
pub struct PigpioTransmitter {
    stream: TcpStream,
}

impl PigpioTransmitter {
    /// Send one command and return its non-negative result
    async fn command(&mut self, cmd: u32, p1: u32, p2: u32, ext: &[u8]) -> Result<u32, HardwareError> {
        let frame = encode_command(cmd, p1, p2, ext);
        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| unavailable("write to pigpiod", e))?;

        let mut reply = [0u8; 16];
        self.stream
            .read_exact(&mut reply)
            .await
            .map_err(|e| unavailable("read from pigpiod", e))?;

        let status = decode_status(&reply);
        if status < 0 {
            debug!("pigpiod command {} failed with {}", cmd, status);
            return Err(HardwareError::Rejected {
                command: cmd,
                status,
            });
        }
        Ok(status as u32)
    }
}

#[async_trait]
impl Transmitter for PigpioTransmitter {
    async fn clear_waves(&mut self) -> Result<(), HardwareError> {
        self.command(CMD_WVCLR, 0, 0, &[]).await?;
        self.command(CMD_WVNEW, 0, 0, &[]).await?;
        Ok(())
    }

    async fn create_wave(&mut self, pulses: &[Pulse]) -> Result<WaveId, HardwareError> {
        self.command(CMD_WVAG, 0, 0, &encode_pulses(pulses)).await?;
        let id = self.command(CMD_WVCRE, 0, 0, &[]).await?;
        Ok(WaveId(id))
    }

    async fn delete_wave(&mut self, wave: WaveId) -> Result<(), HardwareError> {
        self.command(CMD_WVDEL, wave.0, 0, &[]).await?;
        Ok(())
    }

    async fn send_chain(&mut self, waves: &[WaveId]) -> Result<(), HardwareError> {
        let chain = encode_chain(waves)?;
        self.command(CMD_WVCHA, 0, 0, &chain).await?;
        Ok(())
    }

    async fn is_busy(&mut self) -> Result<bool, HardwareError> {
        Ok(self.command(CMD_WVBSY, 0, 0, &[]).await? == 1)
    }

    async fn release(&mut self) -> Result<(), HardwareError> {
        self.command(CMD_WVHLT, 0, 0, &[]).await?;
        self.stream
            .shutdown()
            .await
            .map_err(|e| unavailable("close pigpiod connection", e))
    }
}
