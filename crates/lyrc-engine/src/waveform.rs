//! Waveform compiler
//!
//! Turns a remote's [`TimingSpec`] into hardware waves. Every duration of a
//! pulse pattern becomes its own wave: even positions are carrier bursts,
//! odd positions are plain silence. The resulting ids are cached for the
//! engine's lifetime and reused by every transmission.
//!
//! Rounding uses ties-to-even throughout, matching the timing tables the
//! daemon has been validated against.

use std::collections::HashMap;

use lyrc_catalog::{Catalog, TimingSpec};
use tracing::{debug, info, warn};

use crate::chain::Symbol;
use crate::error::HardwareError;
use crate::hardware::{Pulse, Transmitter, WaveId};

/// Waves compiled from one pulse pattern, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledSymbol(Vec<WaveId>);

impl From<Vec<WaveId>> for CompiledSymbol {
    fn from(waves: Vec<WaveId>) -> Self {
        Self(waves)
    }
}

impl CompiledSymbol {
    /// Wave ids in transmission order
    pub fn waves(&self) -> &[WaveId] {
        &self.0
    }

    /// Number of waves
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the pattern was empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// All waves of one remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRemote {
    pub header: CompiledSymbol,
    pub one: CompiledSymbol,
    pub zero: CompiledSymbol,
    pub trailer: CompiledSymbol,
    pub gap: WaveId,
}

impl CompiledRemote {
    /// Waves for one symbol
    pub fn symbol(&self, symbol: Symbol) -> &[WaveId] {
        match symbol {
            Symbol::Header => self.header.waves(),
            Symbol::One => self.one.waves(),
            Symbol::Zero => self.zero.waves(),
            Symbol::Trailer => self.trailer.waves(),
            Symbol::Gap => std::slice::from_ref(&self.gap),
        }
    }

    /// Every wave owned by this remote
    pub fn all_waves(&self) -> impl Iterator<Item = WaveId> + '_ {
        [&self.header, &self.one, &self.zero, &self.trailer]
            .into_iter()
            .flat_map(|s| s.waves().iter().copied())
            .chain(std::iter::once(self.gap))
    }
}

/// Compiled waves for every remote of a catalog
#[derive(Debug, Default)]
pub struct WaveformTable {
    remotes: HashMap<String, CompiledRemote>,
}

impl WaveformTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compiled remote
    pub fn insert(&mut self, name: impl Into<String>, remote: CompiledRemote) {
        self.remotes.insert(name.into(), remote);
    }

    /// Look up a remote's waves
    pub fn get(&self, name: &str) -> Option<&CompiledRemote> {
        self.remotes.get(name)
    }

    /// Number of compiled remotes
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    /// Returns whether nothing was compiled
    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Total number of waves held
    pub fn wave_count(&self) -> usize {
        self.remotes.values().map(|r| r.all_waves().count()).sum()
    }

    /// Remove every remote and return the waves they held
    pub fn drain_waves(&mut self) -> Vec<WaveId> {
        self.remotes
            .drain()
            .flat_map(|(_, r)| r.all_waves().collect::<Vec<_>>())
            .collect()
    }
}

fn round_us(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Synthesize a carrier burst of `micros` microseconds
///
/// Each cycle is one high/low pulse pair. The low part of every cycle is cut
/// to land on the rounded cumulative cycle boundary, so rounding error never
/// accumulates over long bursts.
pub fn carrier(gpio_pin: u32, frequency_khz: f64, micros: u32, duty_cycle: f64) -> Vec<Pulse> {
    let cycle = 1000.0 / frequency_khz;
    let cycles = round_us(f64::from(micros) / cycle).max(0);
    let on = round_us(cycle * duty_cycle).max(0);

    let mut pulses = Vec::with_capacity(cycles as usize * 2);
    let mut so_far: i64 = 0;
    for c in 0..cycles {
        let target = round_us((c + 1) as f64 * cycle);
        so_far += on;
        let off = (target - so_far).max(0);
        so_far += off;
        pulses.push(Pulse::high(gpio_pin, on as u32));
        pulses.push(Pulse::low(gpio_pin, off as u32));
    }
    pulses
}

/// Pulses for the duration at `index` of a pattern
///
/// Durations are divided by `pulse_divisor` before synthesis.
pub fn burst(
    index: usize,
    duration_us: u32,
    timing: &TimingSpec,
    gpio_pin: u32,
    pulse_divisor: u32,
) -> Vec<Pulse> {
    let scaled = round_us(f64::from(duration_us) / f64::from(pulse_divisor.max(1))) as u32;
    if index % 2 == 0 {
        let pulses = carrier(gpio_pin, timing.frequency_khz, scaled, timing.duty_cycle);
        if !pulses.is_empty() {
            return pulses;
        }
    }
    vec![Pulse::silence(scaled)]
}

async fn compile_pattern(
    tx: &mut dyn Transmitter,
    pattern: &[u32],
    timing: &TimingSpec,
    gpio_pin: u32,
    pulse_divisor: u32,
    created: &mut Vec<WaveId>,
) -> Result<CompiledSymbol, HardwareError> {
    let mut waves = Vec::with_capacity(pattern.len());
    for (index, &duration) in pattern.iter().enumerate() {
        let pulses = burst(index, duration, timing, gpio_pin, pulse_divisor);
        let wave = tx.create_wave(&pulses).await?;
        created.push(wave);
        waves.push(wave);
    }
    Ok(CompiledSymbol(waves))
}

async fn compile_into(
    tx: &mut dyn Transmitter,
    timing: &TimingSpec,
    gpio_pin: u32,
    pulse_divisor: u32,
    created: &mut Vec<WaveId>,
) -> Result<CompiledRemote, HardwareError> {
    if !timing.can_encode_bits() {
        return Err(HardwareError::InvalidWaveform(
            "missing one/zero patterns".to_string(),
        ));
    }

    let header = compile_pattern(tx, &timing.header, timing, gpio_pin, pulse_divisor, created).await?;
    let one = compile_pattern(tx, &timing.one, timing, gpio_pin, pulse_divisor, created).await?;
    let zero = compile_pattern(tx, &timing.zero, timing, gpio_pin, pulse_divisor, created).await?;
    let trailer = compile_pattern(tx, &timing.trailer, timing, gpio_pin, pulse_divisor, created).await?;

    let gap = tx.create_wave(&[Pulse::silence(timing.gap_us)]).await?;
    created.push(gap);

    Ok(CompiledRemote {
        header,
        one,
        zero,
        trailer,
        gap,
    })
}

/// Compile one remote's waves
///
/// On a non-fatal failure the waves created so far are deleted again.
pub async fn compile_remote(
    tx: &mut dyn Transmitter,
    timing: &TimingSpec,
    gpio_pin: u32,
    pulse_divisor: u32,
) -> Result<CompiledRemote, HardwareError> {
    let mut created = Vec::new();
    match compile_into(tx, timing, gpio_pin, pulse_divisor, &mut created).await {
        Ok(remote) => Ok(remote),
        Err(e) => {
            if !e.is_fatal() {
                for wave in created {
                    if let Err(del) = tx.delete_wave(wave).await {
                        debug!("Failed to delete wave {} after compile error: {}", wave.0, del);
                    }
                }
            }
            Err(e)
        }
    }
}

/// Compile every remote of the catalog into `table`
///
/// A remote that fails to compile is skipped. Only a fatal hardware error
/// stops compilation; everything compiled up to that point stays in `table`
/// so it can be released.
pub async fn compile_catalog(
    tx: &mut dyn Transmitter,
    catalog: &Catalog,
    gpio_pin: u32,
    pulse_divisor: u32,
    table: &mut WaveformTable,
) -> Result<(), HardwareError> {
    for remote in catalog.remotes() {
        debug!("Creating waves for {}", remote.name);
        match compile_remote(tx, &remote.timing, gpio_pin, pulse_divisor).await {
            Ok(compiled) => table.insert(remote.name.clone(), compiled),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Skipping remote '{}': {}", remote.name, e),
        }
    }
    info!(
        "Compiled {} wave(s) for {} of {} remote(s)",
        table.wave_count(),
        table.len(),
        catalog.len()
    );
    Ok(())
}
