//! Command Factory
//!
//! Single source of truth for turning every terminal outcome of a request
//! into a well-formed response command. Each constructor populates the
//! documented fields and leaves everything else at safe defaults, so
//! downstream encoding never needs null-checks beyond what an outcome class
//! owns.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use tracing::debug;

use crate::protocol::command::{
    CommandCode, Payload, ProtocolSwitch, RequestCommand, ResponseCommand, DEFAULT_SERIALIZER,
};
use crate::protocol::exception::{ProcessorError, ServerException};
use crate::protocol::status::ResponseStatus;

/// Builds request and response commands.
///
/// Owns the correlation-id counter for requests it creates; construct one
/// per transport instance rather than sharing a process-wide singleton.
///
/// # Examples
///
/// ```rust
/// use remoting_core::protocol::{CommandCode, CommandFactory, Payload, ResponseStatus};
///
/// let factory = CommandFactory::new();
/// let request = factory.create_request_command(CommandCode::RPC_REQUEST, None);
/// let response = factory.create_response(Some(Payload::new("pong".to_string())), &request);
///
/// assert_eq!(response.id, request.id);
/// assert_eq!(response.status(), ResponseStatus::Success);
/// ```
pub struct CommandFactory {
    next_id: AtomicU32,
}

impl CommandFactory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
        }
    }

    /// Wrap an application payload into a request command with a fresh
    /// correlation id. Requests carry no status.
    pub fn create_request_command(
        &self,
        code: CommandCode,
        payload: Option<Payload>,
    ) -> RequestCommand {
        RequestCommand {
            code,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            serializer: DEFAULT_SERIALIZER,
            protocol_switch: ProtocolSwitch::off(),
            payload,
            timeout_ms: None,
        }
    }

    /// Success path. The response echoes the request's id, serializer and
    /// protocol switch; `response_class` is the payload's concrete type name
    /// when a payload is present.
    pub fn create_response(
        &self,
        payload: Option<Payload>,
        request: &RequestCommand,
    ) -> ResponseCommand {
        let mut response = ResponseCommand::new(request.id, ResponseStatus::Success);
        response.serializer = request.serializer;
        response.protocol_switch = request.protocol_switch;
        response.response_class = payload.as_ref().map(|p| p.type_name().to_string());
        response.payload = payload;
        response
    }

    /// Server-side failure with no originating error.
    pub fn create_exception_response(&self, id: u32, err_msg: &str) -> ResponseCommand {
        self.exception_response(id, ServerException::new(err_msg))
    }

    /// Server-side failure wrapping an originating error. The composed
    /// message concatenates the cause's type name, the cause's message and
    /// `err_msg` as the additional-error suffix; the captured stack frames
    /// ride along unchanged.
    pub fn create_exception_response_with_cause(
        &self,
        id: u32,
        cause: &ProcessorError,
        err_msg: &str,
    ) -> ResponseCommand {
        let exception = ServerException::with_cause(
            cause.kind(),
            cause.message(),
            cause.stack_frames().to_vec(),
            err_msg,
        );
        self.exception_response(id, exception)
    }

    /// Categorical failure carrying only an id and a status, e.g.
    /// `NoProcessor` or `ServerThreadpoolBusy`.
    pub fn create_status_response(&self, id: u32, status: ResponseStatus) -> ResponseCommand {
        ResponseCommand::new(id, status)
    }

    /// Synthetic response for an overdue request. Not bound to an in-flight
    /// id at this layer; the caller holding the original correlation matches
    /// it back by address.
    pub fn create_timeout_response(&self, address: SocketAddr) -> ResponseCommand {
        self.transport_failure_response(ResponseStatus::Timeout, address)
    }

    /// Synthetic response for a request that never made it onto the wire.
    pub fn create_send_failed_response<E: std::error::Error>(
        &self,
        address: SocketAddr,
        cause: &E,
    ) -> ResponseCommand {
        let mut response = self.transport_failure_response(ResponseStatus::ClientSendError, address);
        response.cause = Some(ServerException::from_error(cause));
        response
    }

    /// Synthetic response for a connection that closed with requests still
    /// in flight. `message` is logging context only and is not embedded in
    /// the response.
    pub fn create_connection_closed_response(
        &self,
        address: SocketAddr,
        message: &str,
    ) -> ResponseCommand {
        debug!("connection to {} closed: {}", address, message);
        self.transport_failure_response(ResponseStatus::ConnectionClosed, address)
    }

    fn exception_response(&self, id: u32, exception: ServerException) -> ResponseCommand {
        let mut response = ResponseCommand::new(id, ResponseStatus::ServerException);
        response.response_class = Some(std::any::type_name::<ServerException>().to_string());
        response.cause = Some(exception);
        response
    }

    fn transport_failure_response(
        &self,
        status: ResponseStatus,
        address: SocketAddr,
    ) -> ResponseCommand {
        let mut response = ResponseCommand::new(0, status);
        response.response_time_ms = Some(Utc::now().timestamp_millis());
        response.response_host = Some(address);
        response
    }
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new()
    }
}
