//! Commands queued to the engine
//!
//! Every command carries a oneshot result slot. The engine is the only
//! writer and resolving consumes the command, so a slot can never be filled
//! twice.

use lyrc_protocol::{Directive, Request, Response};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Outcome of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command succeeded
    Success,
    /// The command produced listing data
    Data(Vec<String>),
    /// The command failed
    Error(String),
}

impl Reply {
    /// Error reply from anything printable
    pub fn error(message: impl ToString) -> Self {
        Self::Error(message.to_string())
    }

    /// Render as a protocol response echoing `request`
    pub fn into_response(self, request: &str) -> Response {
        match self {
            Self::Success => Response::success(request),
            Self::Data(lines) => Response::data(request, lines),
            Self::Error(message) => Response::error(request, message),
        }
    }
}

/// A request waiting to be processed by the engine
#[derive(Debug)]
pub struct Command {
    /// Requested verb
    pub directive: Directive,
    /// Remote name (may be empty)
    pub remote: String,
    /// Key name (may be empty)
    pub key: String,
    reply: oneshot::Sender<Reply>,
}

impl Command {
    /// Create a command and the receiver its result will arrive on
    pub fn new(
        directive: Directive,
        remote: impl Into<String>,
        key: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let command = Self {
            directive,
            remote: remote.into(),
            key: key.into(),
            reply: tx,
        };
        (command, rx)
    }

    /// Create a command from a parsed request
    pub fn from_request(request: &Request) -> (Self, oneshot::Receiver<Reply>) {
        Self::new(
            request.directive.clone(),
            request.remote.clone(),
            request.key.clone(),
        )
    }

    /// Fill the result slot
    pub fn resolve(self, reply: Reply) {
        if self.reply.send(reply).is_err() {
            debug!(
                "Requester for {} {} {} went away before the reply",
                self.directive, self.remote, self.key
            );
        }
    }
}

/// Items carried by the engine queue
#[derive(Debug)]
pub enum EngineMessage {
    /// A command to process
    Command(Command),
    /// Stop the engine and release the hardware
    Shutdown,
}

/// Producer side of the engine queue
pub type CommandSender = mpsc::UnboundedSender<EngineMessage>;

/// Consumer side of the engine queue
pub type CommandReceiver = mpsc::UnboundedReceiver<EngineMessage>;
