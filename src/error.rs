//! Error taxonomy for binding and calling functions.

use crate::flag::FlagKind;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error accepted as the failure half of a function's return value.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    // ── Construction ─────────────────────────────────────────────

    /// The value carries no declaration identity (fn pointer, closure, ...).
    #[error("not function: {0}")]
    NotAFunction(String),

    #[error("source not found: {name} (searched {})", display_paths(.searched))]
    SourceNotFound { name: String, searched: Vec<PathBuf> },

    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot cut func decl: {} line {line}: {reason}", .file.display())]
    CannotCutDeclaration {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid func info: {0}")]
    InvalidFunctionInfo(String),

    #[error("duplicate flag: {0}")]
    DuplicateFlag(String),

    #[error("bad target function: {name}: {reason}")]
    BadTargetFunction {
        name: String,
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },

    // ── Retrieval ────────────────────────────────────────────────

    #[error("value out of range: -{flag} {value} does not fit {kind}")]
    ValueOutOfRange {
        flag: String,
        value: String,
        kind: FlagKind,
    },

    #[error("cannot unmarshal custom flag: -{flag} {value}: {source}")]
    CannotUnmarshalCustomFlag {
        flag: String,
        value: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("flag lookup: {0}")]
    FlagLookup(String),

    // ── Invocation ───────────────────────────────────────────────

    #[error("call failure: {command}: {cause}")]
    CallFailure {
        command: String,
        #[source]
        cause: CallFault,
    },

    /// Error returned by the bound function itself, passed through untouched.
    #[error(transparent)]
    Returned(anyhow::Error),

    // ── Dispatch ─────────────────────────────────────────────────

    #[error("not enough arguments")]
    NotEnoughArguments,

    #[error("command not found {0}")]
    CommandNotFound(String),
}

/// What went wrong while a bound function was being called.
#[derive(Debug, Error)]
pub enum CallFault {
    #[error("parse arguments: {0}")]
    Parse(#[source] clap::Error),

    #[error("unwrap {position} th arg {name}: {source}")]
    Retrieve {
        position: usize,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("argument {position} is not a {expected}")]
    ArgumentType {
        position: usize,
        expected: &'static str,
    },

    #[error("missing argument {0}")]
    MissingArgument(usize),

    #[error("recover {0}")]
    Panic(String),

    #[error("unexpected returned value {0}")]
    UnexpectedReturn(&'static str),
}

impl Error {
    pub(crate) fn bad_target(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::BadTargetFunction {
            name: name.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn bad_target_from(
        name: impl Into<String>,
        reason: impl Into<String>,
        source: Error,
    ) -> Self {
        Error::BadTargetFunction {
            name: name.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn call_failure(command: impl Into<String>, cause: CallFault) -> Self {
        Error::CallFailure {
            command: command.into(),
            cause,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
