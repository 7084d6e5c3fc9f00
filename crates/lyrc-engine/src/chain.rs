//! Chain builder
//!
//! A chain is one complete transmission of a key: the header, one symbol per
//! code bit (most significant bit first), the trailer and, when a repeat is
//! being started, the gap. The symbols are flattened into the wave ids the
//! hardware plays back as a single unit.

use lyrc_catalog::Catalog;

use crate::error::ChainError;
use crate::hardware::WaveId;
use crate::waveform::WaveformTable;

/// Building blocks of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Header,
    One,
    Zero,
    Trailer,
    Gap,
}

/// Symbol sequence for a code, MSB first
pub fn symbols_for(code: &[u8], repeat_start: bool) -> Vec<Symbol> {
    let mut symbols = Vec::with_capacity(code.len() * 8 + 3);
    symbols.push(Symbol::Header);
    for byte in code {
        for bit in (0..8).rev() {
            symbols.push(if byte & (1 << bit) != 0 {
                Symbol::One
            } else {
                Symbol::Zero
            });
        }
    }
    symbols.push(Symbol::Trailer);
    if repeat_start {
        symbols.push(Symbol::Gap);
    }
    symbols
}

/// One full transmission of a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    remote: String,
    key: String,
    symbols: Vec<Symbol>,
    waves: Vec<WaveId>,
}

impl Chain {
    /// Remote the chain was built for
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Key the chain was built for
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Symbols in transmission order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Flattened wave ids in transmission order
    pub fn waves(&self) -> &[WaveId] {
        &self.waves
    }

    /// Returns whether the chain ends with the gap
    pub fn has_gap(&self) -> bool {
        self.symbols.last() == Some(&Symbol::Gap)
    }
}

/// Builds chains from the catalog and its compiled waves
pub struct ChainBuilder<'a> {
    catalog: &'a Catalog,
    waveforms: &'a WaveformTable,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(catalog: &'a Catalog, waveforms: &'a WaveformTable) -> Self {
        Self { catalog, waveforms }
    }

    /// Build the chain for `key` of `remote`
    ///
    /// The remote is checked before the key, and nothing is looked up in a
    /// code table before both are known to exist.
    pub fn build(&self, remote: &str, key: &str, repeat_start: bool) -> Result<Chain, ChainError> {
        let definition = self.catalog.get(remote).ok_or(ChainError::UnknownRemote)?;
        let code = definition.codes.get(key).ok_or(ChainError::UnknownKey)?;
        let compiled = self
            .waveforms
            .get(remote)
            .ok_or_else(|| ChainError::Uncompiled(remote.to_string()))?;

        let symbols = symbols_for(code, repeat_start);
        let waves = symbols
            .iter()
            .flat_map(|s| compiled.symbol(*s).iter().copied())
            .collect();

        Ok(Chain {
            remote: remote.to_string(),
            key: key.to_string(),
            symbols,
            waves,
        })
    }
}
