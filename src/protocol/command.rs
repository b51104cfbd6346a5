//! Command Value Types
//!
//! In-memory representation of decoded wire commands. Framing and byte-level
//! encoding live in the transport layer; payload serialization is pluggable
//! and happens after these structures are handed over for encoding.

use std::any::Any;
use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::protocol::exception::ServerException;
use crate::protocol::status::ResponseStatus;

/// Serializer identifier used when none is negotiated explicitly.
pub const DEFAULT_SERIALIZER: u8 = 1;

/// Protocol-level type tag identifying what kind of command a message is.
///
/// An opaque dispatch key: equality and hashing are value-based, no behavior
/// is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandCode(u16);

impl CommandCode {
    /// Heartbeat exchanged to keep idle connections alive.
    pub const HEARTBEAT: CommandCode = CommandCode(0);

    /// Application request.
    pub const RPC_REQUEST: CommandCode = CommandCode(1);

    /// Application response.
    pub const RPC_RESPONSE: CommandCode = CommandCode(2);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bitset of negotiated optional protocol features.
///
/// Propagated from request to response unchanged. Bit 0 is reserved for
/// frame CRC checking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSwitch(u8);

impl ProtocolSwitch {
    /// Bit index of the CRC-check feature flag.
    pub const CRC_SWITCH_INDEX: u8 = 0;

    /// All features off.
    pub fn off() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn turn_on(&mut self, index: u8) {
        self.0 |= 1 << index;
    }

    pub fn is_on(self, index: u8) -> bool {
        self.0 & (1 << index) != 0
    }
}

/// Application-level payload prior to encoding.
///
/// The serialization codec is a transport-layer concern, so the payload is
/// held as an opaque value. The concrete type name is recorded at
/// construction so responses can advertise their `response_class` without
/// the core ever inspecting payload bytes.
pub struct Payload {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Concrete type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast<T: Any>(self) -> Result<Box<T>, Payload> {
        let type_name = self.type_name;
        self.value
            .downcast::<T>()
            .map_err(|value| Payload { type_name, value })
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Base fields shared by request and response commands.
pub trait RemotingCommand {
    /// Correlation identifier pairing a request with its response.
    fn id(&self) -> u32;

    /// Identifier of the codec used for the payload.
    fn serializer(&self) -> u8;

    /// Negotiated protocol feature flags.
    fn protocol_switch(&self) -> ProtocolSwitch;
}

/// A decoded inbound request.
#[derive(Debug)]
pub struct RequestCommand {
    /// Dispatch key resolving the responsible processor.
    pub code: CommandCode,

    /// Correlation identifier, unique per in-flight request on a connection.
    pub id: u32,

    /// Payload codec identifier, echoed into the response.
    pub serializer: u8,

    /// Negotiated feature flags, echoed into the response.
    pub protocol_switch: ProtocolSwitch,

    /// Application request object, present until encoding.
    pub payload: Option<Payload>,

    /// Caller-side deadline, if one was set. The core only transports the
    /// value; deadline enforcement belongs to the caller's timer.
    pub timeout_ms: Option<u64>,
}

impl RemotingCommand for RequestCommand {
    fn id(&self) -> u32 {
        self.id
    }

    fn serializer(&self) -> u8 {
        self.serializer
    }

    fn protocol_switch(&self) -> ProtocolSwitch {
        self.protocol_switch
    }
}

/// A response command for exactly one terminal outcome.
///
/// Only the command factory constructs responses, which guarantees a status
/// is always present. Transport-synthesized failures (timeout, send error,
/// connection closed) carry `id = 0` and are keyed to `response_host`
/// instead; the caller holding the original correlation matches them back.
#[derive(Debug)]
pub struct ResponseCommand {
    /// Correlation identifier copied from the originating request.
    pub id: u32,

    /// Payload codec identifier.
    pub serializer: u8,

    /// Negotiated feature flags.
    pub protocol_switch: ProtocolSwitch,

    status: ResponseStatus,

    /// Concrete type name of the returned value; absent for void or error
    /// outcomes.
    pub response_class: Option<String>,

    /// Application response object, present until encoding.
    pub payload: Option<Payload>,

    /// Error detail for exception-carrying outcomes.
    pub cause: Option<ServerException>,

    /// Epoch milliseconds at which a transport failure was observed.
    pub response_time_ms: Option<i64>,

    /// Peer address, populated for transport-observed failures.
    pub response_host: Option<SocketAddr>,
}

impl ResponseCommand {
    pub(crate) fn new(id: u32, status: ResponseStatus) -> Self {
        Self {
            id,
            serializer: DEFAULT_SERIALIZER,
            protocol_switch: ProtocolSwitch::off(),
            status,
            response_class: None,
            payload: None,
            cause: None,
            response_time_ms: None,
            response_host: None,
        }
    }

    /// Terminal outcome of this response. Set once at construction.
    pub fn status(&self) -> ResponseStatus {
        self.status
    }
}

impl RemotingCommand for ResponseCommand {
    fn id(&self) -> u32 {
        self.id
    }

    fn serializer(&self) -> u8 {
        self.serializer
    }

    fn protocol_switch(&self) -> ProtocolSwitch {
        self.protocol_switch
    }
}
