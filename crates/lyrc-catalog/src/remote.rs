//! Remote definitions

use std::fmt::Write as _;

/// Default carrier frequency when a definition does not declare one
pub const DEFAULT_FREQUENCY_KHZ: f64 = 38.0;

/// Default carrier duty cycle
pub const DEFAULT_DUTY_CYCLE: f64 = 0.5;

/// Default code width in bits
pub const DEFAULT_BITS: u32 = 32;

/// Timing of one remote's signal
///
/// Every pulse pattern is a sequence of microsecond durations alternating
/// carrier-active (even index) and silent (odd index).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingSpec {
    /// Carrier frequency in kHz
    pub frequency_khz: f64,
    /// Carrier duty cycle (0.0..1.0)
    pub duty_cycle: f64,
    /// Declared code width in bits
    pub bits: u32,
    /// Leading pattern
    pub header: Vec<u32>,
    /// Pattern for a 1 bit
    pub one: Vec<u32>,
    /// Pattern for a 0 bit
    pub zero: Vec<u32>,
    /// Trailing pattern
    pub trailer: Vec<u32>,
    /// Silence after a transmission in microseconds
    pub gap_us: u32,
}

impl Default for TimingSpec {
    fn default() -> Self {
        Self {
            frequency_khz: DEFAULT_FREQUENCY_KHZ,
            duty_cycle: DEFAULT_DUTY_CYCLE,
            bits: DEFAULT_BITS,
            header: Vec::new(),
            one: Vec::new(),
            zero: Vec::new(),
            trailer: Vec::new(),
            gap_us: 0,
        }
    }
}

impl TimingSpec {
    /// Returns whether both bit patterns are present
    pub fn can_encode_bits(&self) -> bool {
        !self.one.is_empty() && !self.zero.is_empty()
    }
}

/// Key name to code bytes, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyCodeTable {
    entries: Vec<(String, Vec<u8>)>,
}

impl KeyCodeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing any earlier code with the same name
    pub fn insert(&mut self, key: impl Into<String>, code: Vec<u8>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = code,
            None => self.entries.push((key, code)),
        }
    }

    /// Look up a key's code bytes
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, code)| code.as_slice())
    }

    /// Returns whether the key exists
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Key names in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upper-case hex rendering of a key's code, e.g. `0xA25D`
    pub fn hex(&self, key: &str) -> Option<String> {
        self.get(key).map(|code| {
            let mut out = String::with_capacity(2 + code.len() * 2);
            out.push_str("0x");
            for byte in code {
                let _ = write!(out, "{:02X}", byte);
            }
            out
        })
    }
}

/// One infrared remote
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Remote {
    /// Remote name as used in requests
    pub name: String,
    /// Signal timing
    pub timing: TimingSpec,
    /// Key codes
    pub codes: KeyCodeTable,
}

impl Remote {
    /// Create a remote with no keys
    pub fn new(name: impl Into<String>, timing: TimingSpec) -> Self {
        Self {
            name: name.into(),
            timing,
            codes: KeyCodeTable::new(),
        }
    }

    /// Builder-style key insertion
    pub fn with_key(mut self, key: impl Into<String>, code: Vec<u8>) -> Self {
        self.codes.insert(key, code);
        self
    }
}
