//! LIRC configuration loader
//!
//! Reads the subset of the LIRC remote-definition format needed to replay
//! raw-timed remotes:
//!
//! ```text
//! begin remote
//!   name       TV
//!   bits       16
//!   frequency  38000        # Hz
//!   duty_cycle 50           # percent
//!   header     9000 4500
//!   one        560  1690
//!   zero       560  560
//!   ptrail     560
//!   gap        40000
//!   begin codes
//!     POWER    0xA25D
//!   end codes
//! end remote
//! ```
//!
//! Unknown keywords are ignored. Malformed lines are logged and skipped, and
//! a broken file never prevents the rest of the catalog from loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::remote::{Remote, TimingSpec};

/// Substring a file name must contain to be read as a remote definition
pub const REMOTE_FILE_MARKER: &str = ".conf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Ignore,
    Remote,
    Codes,
}

/// A remote block being assembled
#[derive(Default)]
struct PendingRemote {
    name: Option<String>,
    timing: TimingSpec,
    codes: Vec<(String, Vec<u8>)>,
}

impl PendingRemote {
    fn finish(self, source_name: &str) -> Result<Remote, CatalogError> {
        let name = self
            .name
            .ok_or_else(|| CatalogError::MissingName(source_name.to_string()))?;

        let mut remote = Remote::new(name, self.timing);
        for (key, code) in self.codes {
            if code.len() as u32 * 8 != remote.timing.bits {
                warn!(
                    "{}: key '{}' of remote '{}' has {} bits, expected {}",
                    source_name,
                    key,
                    remote.name,
                    code.len() * 8,
                    remote.timing.bits
                );
            }
            remote.codes.insert(key, code);
        }

        if !remote.timing.can_encode_bits() {
            warn!(
                "{}: remote '{}' lacks one/zero patterns and cannot be sent",
                source_name, remote.name
            );
        }

        Ok(remote)
    }
}

/// Parse every remote block in a configuration text
///
/// `source_name` is only used in log messages.
pub fn parse_remotes(text: &str, source_name: &str) -> Vec<Remote> {
    let mut remotes = Vec::new();
    let mut section = Section::Ignore;
    let mut pending: Option<PendingRemote> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "begin remote" => {
                if let Some(unfinished) = pending.take() {
                    warn!("{}:{}: nested 'begin remote'", source_name, line_no);
                    push_finished(&mut remotes, unfinished, source_name);
                }
                pending = Some(PendingRemote::default());
                section = Section::Remote;
            }
            "begin codes" => section = Section::Codes,
            "end codes" => section = Section::Remote,
            "end remote" => {
                if let Some(done) = pending.take() {
                    push_finished(&mut remotes, done, source_name);
                }
                section = Section::Ignore;
            }
            _ => {
                let Some(remote) = pending.as_mut() else {
                    continue;
                };
                let result = match section {
                    Section::Remote => parse_remote_line(remote, line),
                    Section::Codes => parse_code_line(remote, line),
                    Section::Ignore => Ok(()),
                };
                if let Err(reason) = result {
                    let err = CatalogError::Malformed {
                        source_name: source_name.to_string(),
                        line: line_no,
                        reason,
                    };
                    warn!("{}", err);
                }
            }
        }
    }

    if let Some(unfinished) = pending {
        warn!("{}: missing 'end remote'", source_name);
        push_finished(&mut remotes, unfinished, source_name);
    }

    remotes
}

fn push_finished(remotes: &mut Vec<Remote>, pending: PendingRemote, source_name: &str) {
    match pending.finish(source_name) {
        Ok(remote) => {
            debug!(
                "{}: loaded remote '{}' with {} key(s)",
                source_name,
                remote.name,
                remote.codes.len()
            );
            remotes.push(remote);
        }
        Err(e) => warn!("{}", e),
    }
}

fn parse_remote_line(remote: &mut PendingRemote, line: &str) -> Result<(), String> {
    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Ok(());
    };
    let values: Vec<&str> = tokens.collect();

    match keyword {
        "name" => {
            let name = values.join(" ");
            if name.is_empty() {
                return Err("empty remote name".to_string());
            }
            remote.name = Some(name);
        }
        "bits" => remote.timing.bits = parse_single(keyword, &values)?,
        "frequency" => {
            let hz: u32 = parse_single(keyword, &values)?;
            if hz == 0 {
                return Err("carrier frequency must be non-zero".to_string());
            }
            remote.timing.frequency_khz = f64::from(hz) / 1000.0;
        }
        "duty_cycle" => {
            let percent: u32 = parse_single(keyword, &values)?;
            if !(1..=99).contains(&percent) {
                return Err(format!("duty cycle {}% out of range", percent));
            }
            remote.timing.duty_cycle = f64::from(percent) / 100.0;
        }
        "header" => remote.timing.header = parse_pattern(keyword, &values)?,
        "one" => remote.timing.one = parse_pattern(keyword, &values)?,
        "zero" => remote.timing.zero = parse_pattern(keyword, &values)?,
        "ptrail" => remote.timing.trailer = parse_pattern(keyword, &values)?,
        "gap" => remote.timing.gap_us = parse_single(keyword, &values)?,
        _ => {}
    }
    Ok(())
}

fn parse_code_line(remote: &mut PendingRemote, line: &str) -> Result<(), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [key, code] = tokens.as_slice() else {
        return Err(format!("expected '<key> <code>', got '{}'", line));
    };
    let bytes = parse_hex_code(code)?;
    remote.codes.push((key.to_string(), bytes));
    Ok(())
}

fn parse_single<T: std::str::FromStr>(keyword: &str, values: &[&str]) -> Result<T, String> {
    match values {
        [value] => value
            .parse()
            .map_err(|_| format!("invalid value '{}' for {}", value, keyword)),
        _ => Err(format!("{} expects exactly one value", keyword)),
    }
}

fn parse_pattern(keyword: &str, values: &[&str]) -> Result<Vec<u32>, String> {
    values
        .iter()
        .map(|v| {
            v.parse()
                .map_err(|_| format!("invalid duration '{}' in {}", v, keyword))
        })
        .collect()
}

/// Parse a hex code with optional `0x` prefix into bytes, most significant first
///
/// An odd number of digits is padded with a leading zero.
fn parse_hex_code(code: &str) -> Result<Vec<u8>, String> {
    let digits = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex code '{}'", code));
    }

    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };

    padded
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(s, 16).map_err(|e| e.to_string())
        })
        .collect()
}

/// Load every remote definition found under `dir`
///
/// Files are found recursively by [`REMOTE_FILE_MARKER`] in their name and
/// read in sorted path order. Only an unreadable top-level directory is an
/// error; individual bad files are logged and skipped.
pub fn load_catalog(dir: &Path) -> Result<Catalog, CatalogError> {
    let mut files = Vec::new();
    collect_remote_files(dir, &mut files).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    files.sort();

    let mut catalog = Catalog::new();
    for path in &files {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                warn!(
                    "{}",
                    CatalogError::Io {
                        path: path.clone(),
                        source
                    }
                );
                continue;
            }
        };
        let source_name = path.display().to_string();
        for remote in parse_remotes(&text, &source_name) {
            catalog.insert(remote);
        }
    }

    info!(
        "Loaded {} remote(s) from {} file(s) in {}",
        catalog.len(),
        files.len(),
        dir.display()
    );
    Ok(catalog)
}

fn collect_remote_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Err(e) = collect_remote_files(&path, out) {
                warn!("Skipping directory {}: {}", path.display(), e);
            }
        } else if entry
            .file_name()
            .to_string_lossy()
            .contains(REMOTE_FILE_MARKER)
        {
            out.push(path);
        }
    }
    Ok(())
}
