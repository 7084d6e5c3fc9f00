//! Remote Catalog
//!
//! This crate holds the read-only catalog of infrared remotes the daemon can
//! reproduce, and the loader that builds it from LIRC-style `.conf` files.
//!
//! Each [`Remote`] pairs a [`TimingSpec`] (carrier frequency, pulse patterns
//! for header/one/zero/trailer, gap) with a [`KeyCodeTable`] mapping key names
//! to their code bytes.
//!
//! # Example
//!
//! ```rust
//! use lyrc_catalog::parse_remotes;
//!
//! let conf = "
//! begin remote
//!   name  TV
//!   bits  16
//!   header 9000 4500
//!   one    560 1690
//!   zero   560 560
//!   ptrail 560
//!   gap    40000
//!   begin codes
//!     POWER 0xA25D
//!   end codes
//! end remote
//! ";
//!
//! let remotes = parse_remotes(conf, "tv.conf");
//! assert_eq!(remotes[0].name, "TV");
//! assert_eq!(remotes[0].codes.hex("POWER").as_deref(), Some("0xA25D"));
//! ```

pub mod catalog;
pub mod error;
pub mod loader;
pub mod remote;

pub use catalog::Catalog;
pub use error::CatalogError;
pub use loader::{load_catalog, parse_remotes, REMOTE_FILE_MARKER};
pub use remote::{KeyCodeTable, Remote, TimingSpec};
