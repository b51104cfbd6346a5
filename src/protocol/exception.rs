//! Structured Server Exception
//!
//! Error detail carried by `ServerException` responses. Stored as structured
//! fields; the concatenated message external consumers parse is a derived
//! display form.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;

/// Server-side failure detail attached to an exception response.
///
/// `display_message` yields
/// `"{original kind}: {original message}. AdditionalErrMsg: {message}"`
/// when an originating error was attached. The format is stable; callers on
/// the other side of the wire parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerException {
    /// Additional error message supplied at the failure boundary.
    pub message: String,

    /// Type name of the originating error, if one was attached.
    pub original_kind: Option<String>,

    /// Message of the originating error.
    pub original_message: Option<String>,

    /// Stack frames captured when the originating error was converted.
    pub stack_frames: Vec<String>,
}

impl ServerException {
    /// Exception carrying only an error message, no originating cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            original_kind: None,
            original_message: None,
            stack_frames: Vec::new(),
        }
    }

    /// Exception composed from an originating error plus an additional
    /// message. The original stack frames are preserved as captured.
    pub fn with_cause(
        original_kind: impl Into<String>,
        original_message: impl Into<String>,
        stack_frames: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            original_kind: Some(original_kind.into()),
            original_message: Some(original_message.into()),
            stack_frames,
        }
    }

    /// Exception derived from a concrete error with no additional message.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self {
            message: String::new(),
            original_kind: Some(std::any::type_name::<E>().to_string()),
            original_message: Some(error.to_string()),
            stack_frames: capture_stack_frames(),
        }
    }

    /// The composed diagnostic message.
    pub fn display_message(&self) -> String {
        match &self.original_kind {
            Some(kind) => {
                let original = self.original_message.as_deref().unwrap_or("");
                if self.message.is_empty() {
                    format!("{kind}: {original}")
                } else {
                    format!("{kind}: {original}. AdditionalErrMsg: {}", self.message)
                }
            }
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_message())
    }
}

impl std::error::Error for ServerException {}

/// Failure raised by a processor body.
///
/// Captures the concrete error's type name and a backtrace at the `From`
/// conversion, so the diagnostic trail survives the type erasure that a
/// boxed error would impose. Intentionally does not implement
/// `std::error::Error`, which keeps the blanket `From` impl coherent.
#[derive(Debug)]
pub struct ProcessorError {
    kind: &'static str,
    message: String,
    stack_frames: Vec<String>,
}

impl ProcessorError {
    /// Failure described by a bare message, with no underlying error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            kind: std::any::type_name::<ProcessorError>(),
            message: message.into(),
            stack_frames: capture_stack_frames(),
        }
    }

    /// Type name of the originating error.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack_frames(&self) -> &[String] {
        &self.stack_frames
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl<E> From<E> for ProcessorError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            kind: std::any::type_name::<E>(),
            message: error.to_string(),
            stack_frames: capture_stack_frames(),
        }
    }
}

fn capture_stack_frames() -> Vec<String> {
    Backtrace::force_capture()
        .to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}
