//! Response Status Taxonomy
//!
//! Closed enumeration of terminal outcomes attached to every response
//! command. The numeric values are part of the wire protocol and must not
//! change between releases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of a remote invocation.
///
/// Exactly one status attaches to a response command. It is set by the
/// command factory at construction time and is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ResponseStatus {
    /// Normal completion.
    Success = 0x0000,

    /// Generic failure with no more specific category.
    Error = 0x0001,

    /// Processor body raised; the response carries a structured exception.
    ServerException = 0x0002,

    /// Outcome could not be determined.
    Unknown = 0x0003,

    /// The server-side worker pool rejected the submission.
    ServerThreadpoolBusy = 0x0004,

    /// Communication-layer failure between peers.
    ErrorComm = 0x0005,

    /// No processor bound to the command code and no default registered.
    NoProcessor = 0x0006,

    /// The request was not answered within its deadline.
    Timeout = 0x0007,

    /// The client failed to put the request on the wire.
    ClientSendError = 0x0008,

    /// Encoding or decoding of a command frame failed.
    CodecException = 0x0009,

    /// The connection was closed before a response arrived.
    ConnectionClosed = 0x0010,

    /// Server-side serialization of the response payload failed.
    ServerSerialException = 0x0011,

    /// Server-side deserialization of the request payload failed.
    ServerDeserialException = 0x0012,
}

impl ResponseStatus {
    /// Protocol-level numeric value.
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Decode a protocol value back into a status, if it is a known one.
    pub fn from_value(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::Success),
            0x0001 => Some(Self::Error),
            0x0002 => Some(Self::ServerException),
            0x0003 => Some(Self::Unknown),
            0x0004 => Some(Self::ServerThreadpoolBusy),
            0x0005 => Some(Self::ErrorComm),
            0x0006 => Some(Self::NoProcessor),
            0x0007 => Some(Self::Timeout),
            0x0008 => Some(Self::ClientSendError),
            0x0009 => Some(Self::CodecException),
            0x0010 => Some(Self::ConnectionClosed),
            0x0011 => Some(Self::ServerSerialException),
            0x0012 => Some(Self::ServerDeserialException),
            _ => None,
        }
    }

    /// Whether this status reports a transport-observed failure rather than
    /// an application-level outcome. Such responses carry a peer address and
    /// timestamp instead of a payload.
    pub fn is_transport_failure(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ClientSendError | Self::ConnectionClosed
        )
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_values() {
        assert_eq!(ResponseStatus::Success.value(), 0x0000);
        assert_eq!(ResponseStatus::ServerThreadpoolBusy.value(), 0x0004);
        assert_eq!(ResponseStatus::NoProcessor.value(), 0x0006);
        assert_eq!(ResponseStatus::ConnectionClosed.value(), 0x0010);
    }

    #[test]
    fn test_from_value_roundtrip() {
        for status in [
            ResponseStatus::Success,
            ResponseStatus::ServerException,
            ResponseStatus::Timeout,
            ResponseStatus::ClientSendError,
            ResponseStatus::ServerDeserialException,
        ] {
            assert_eq!(ResponseStatus::from_value(status.value()), Some(status));
        }
    }

    #[test]
    fn test_from_value_unknown() {
        assert_eq!(ResponseStatus::from_value(0x7fff), None);
    }

    #[test]
    fn test_transport_failure_classification() {
        assert!(ResponseStatus::Timeout.is_transport_failure());
        assert!(ResponseStatus::ClientSendError.is_transport_failure());
        assert!(ResponseStatus::ConnectionClosed.is_transport_failure());
        assert!(!ResponseStatus::ServerException.is_transport_failure());
        assert!(!ResponseStatus::Success.is_transport_failure());
    }
}
