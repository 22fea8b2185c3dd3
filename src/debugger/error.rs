use crate::debugger::address::GlobalAddress;
use thiserror::Error;

/// Errors produced by the debugger core.
///
/// Every fallible operation in [`crate::debugger`] returns this type. The REPL
/// layer converts it into `anyhow::Error` at its own boundary, since it has
/// nothing more specific to do with it than print it and read the next line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown register: {0}")]
    UnknownRegister(String),

    #[error("no function found at address {0}")]
    FunctionNotFound(GlobalAddress),

    #[error("no source line found at address {0}")]
    PlaceNotFound(GlobalAddress),

    #[error("no address found for {0}:{1}")]
    SourceLineNotFound(String, u64),

    #[error("no function named {0}")]
    FunctionNameNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tracee is not stopped")]
    TraceePrecondition,

    #[error("no debug information loaded")]
    NoDebugInformation,

    #[error("ptrace call failed: {0}")]
    Ptrace(#[source] nix::Error),

    #[error("waitpid call failed: {0}")]
    Waitpid(#[source] nix::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] object::Error),

    #[error(transparent)]
    Dwarf(#[from] gimli::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
