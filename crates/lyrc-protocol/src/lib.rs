//! LYRC Line Protocol
//!
//! This crate provides parsing and rendering for the line-oriented text
//! protocol spoken by the LYRC infrared transmission daemon. The protocol
//! follows the shape of LIRC's `lircd` socket replies:
//!
//! - **Requests**: `<DIRECTIVE> [REMOTE] [KEY]`, one per line
//! - **Replies**: a `BEGIN`/`END` framed block echoing the request, followed
//!   by `SUCCESS` or `ERROR` and an optional `DATA` section
//!
//! # Example
//!
//! ```rust
//! use lyrc_protocol::{Directive, Request, Response};
//!
//! let request = Request::parse("SEND_ONCE TV POWER").unwrap();
//! assert_eq!(request.directive, Directive::SendOnce);
//! assert_eq!(request.remote, "TV");
//! assert_eq!(request.key, "POWER");
//!
//! let reply = Response::success(request.raw());
//! assert_eq!(reply.render(), "BEGIN\nSEND_ONCE TV POWER\nSUCCESS\nEND\n\n");
//! ```

pub mod error;
pub mod request;
pub mod response;

pub use error::ProtocolError;
pub use request::{Directive, Request};
pub use response::{Response, ResponseBody};
