//! Reply rendering
//!
//! Every reply is a `BEGIN`/`END` block that echoes the request line and is
//! followed by an empty line.

/// Body of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Plain success
    Success,
    /// Success carrying data lines
    Data(Vec<String>),
    /// Failure with a message
    Error(String),
}

/// A reply to a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    request: String,
    body: ResponseBody,
}

impl Response {
    /// Plain success reply
    pub fn success(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            body: ResponseBody::Success,
        }
    }

    /// Success reply with data lines
    pub fn data(request: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            request: request.into(),
            body: ResponseBody::Data(lines),
        }
    }

    /// Error reply
    pub fn error(request: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            body: ResponseBody::Error(message.into()),
        }
    }

    /// The echoed request line
    pub fn request(&self) -> &str {
        &self.request
    }

    /// The reply body
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Returns whether this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }

    /// Render the reply in wire form, including the terminating empty line
    pub fn render(&self) -> String {
        let count = match &self.body {
            ResponseBody::Data(data) => data.len().to_string(),
            _ => String::new(),
        };
        let mut lines: Vec<&str> = vec!["BEGIN", self.request.as_str()];
        match &self.body {
            ResponseBody::Success => lines.push("SUCCESS"),
            ResponseBody::Data(data) => {
                lines.extend(["SUCCESS", "DATA", count.as_str()]);
                lines.extend(data.iter().map(String::as_str));
            }
            ResponseBody::Error(message) => {
                lines.extend(["ERROR", "DATA", "1", message.as_str()]);
            }
        }
        lines.push("END");

        let mut out = lines.join("\n");
        out.push_str("\n\n");
        out
    }
}
