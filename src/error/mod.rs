//! Error types for snmp-poller.
//!
//! This module provides [`Error`], the single error type shared by every
//! layer of the crate, and the boxed [`Result`] alias.
//!
//! Errors fall into a few families that determine how far they travel:
//!
//! - Setup errors ([`Error::Config`], [`Error::UnknownName`], [`Error::InvalidOid`],
//!   transport connect failures) are returned synchronously when a session
//!   is started.
//! - Resolution errors ([`Error::Unresolved`]) abort the current retrieval
//!   cycle and are handed to the session's error callback.
//! - Decode errors ([`Error::Decode`]) are logged and the sample is skipped.
//! - Pipeline errors ([`Error::MissingTag`], [`Error::Split`]) are returned to
//!   whoever called the sender stage.
//!
//! # Example
//!
//! ```rust
//! use snmp_poller::{Error, Result};
//!
//! fn handle(result: Result<()>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(e) => match &*e {
//!             Error::Unresolved { oid } => println!("no MIB entry for {}", oid),
//!             other => println!("error: {}", other),
//!         },
//!     }
//! }
//! ```

use std::time::Duration;

/// Result type alias using the library's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for all snmp-poller operations.
///
/// Errors are boxed (via [`Result`]) to keep the size small on the stack.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid profile or criteria.
    #[error("configuration error: {0}")]
    Config(Box<str>),

    /// Identifier is not a valid dotted numeric string.
    #[error("invalid OID: {0}")]
    InvalidOid(Box<str>),

    /// Symbolic name has no registered identifier.
    #[error("no OID found for {0}")]
    UnknownName(Box<str>),

    /// Identifier has no registered ancestor in the identifier table.
    #[error("cannot find name for OID: {oid}")]
    Unresolved { oid: Box<str> },

    /// Value does not match the representation expected for its type.
    #[error("cannot decode {name}: {reason}")]
    Decode { name: Box<str>, reason: Box<str> },

    /// Request failure reported by the transport collaborator.
    #[error("transport error communicating with {target}: {message}")]
    Transport { target: Box<str>, message: Box<str> },

    /// Request timed out after retries.
    #[error("timeout after {elapsed:?} waiting for {target} ({retries} retries)")]
    Timeout {
        target: Box<str>,
        elapsed: Duration,
        retries: u32,
    },

    /// A sender stage needs a tag the sample does not carry.
    #[error("no {tag} tag saved for calculation on: {name}")]
    MissingTag { name: Box<str>, tag: &'static str },

    /// Name filter pattern failed to compile.
    #[error("pattern: {pattern}: {source}")]
    Pattern {
        pattern: Box<str>,
        #[source]
        source: regex::Error,
    },

    /// Both branches of a split sender failed.
    #[error("{second}: {first}")]
    Split { first: Box<Error>, second: Box<Error> },

    /// Malformed schema feed record.
    #[error("schema feed line {line}: {message}")]
    Schema { line: usize, message: Box<str> },

    /// I/O failure while reading a schema feed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON schema feed could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background poll session ended abnormally.
    #[error("poll session task failed: {0}")]
    Task(Box<str>),
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Construct a decode error for the named object.
    pub fn decode(name: impl Into<Box<str>>, reason: impl std::fmt::Display) -> Box<Self> {
        Error::Decode {
            name: name.into(),
            reason: reason.to_string().into(),
        }
        .boxed()
    }

    /// Construct a configuration error.
    pub fn config(message: impl std::fmt::Display) -> Box<Self> {
        Error::Config(message.to_string().into()).boxed()
    }

    /// Whether this error only affects a single sample.
    ///
    /// Decode errors are contained to the record they came from; everything
    /// else stops the operation that produced it.
    pub fn is_sample_local(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

impl From<std::io::Error> for Box<Error> {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e).boxed()
    }
}

impl From<serde_json::Error> for Box<Error> {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e).boxed()
    }
}
