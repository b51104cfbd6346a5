//! Protocol Value Types
//!
//! Command representations, the response status taxonomy and the command
//! factory that materializes a response for every terminal outcome.

pub mod command;
pub mod command_factory;
pub mod exception;
pub mod status;

pub use command::{
    CommandCode, Payload, ProtocolSwitch, RemotingCommand, RequestCommand, ResponseCommand,
    DEFAULT_SERIALIZER,
};
pub use command_factory::CommandFactory;
pub use exception::{ProcessorError, ServerException};
pub use status::ResponseStatus;
