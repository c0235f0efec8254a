//! Transport collaborator abstraction.
//!
//! The poller never encodes requests itself. It talks to a black-box client
//! through two traits: a [`Connector`] opens a [`Session`] from a
//! [`Profile`], and the session answers bulk walks and plain gets with raw
//! [`VarBind`] pairs. Timeout and retry policy live inside the
//! implementation, configured from the profile.
//!
//! A programmable in-memory implementation ([`MockConnector`]) is available
//! for tests behind the `testing` feature.

#[cfg(any(test, feature = "testing"))]
mod mock;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::error::Result;
use crate::oid::Oid;
use crate::profile::Profile;
use crate::varbind::VarBind;
use std::future::Future;

/// Opens sessions against remote agents.
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Establish a session. Failure is a setup error.
    fn connect(&self, profile: &Profile) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// An established request/response session with one agent.
///
/// Sessions are shared between a poll loop and its metadata refresh task,
/// so methods take `&self`.
pub trait Session: Send + Sync + 'static {
    /// Retrieve every value in the subtree rooted at `oid`, in order.
    fn bulk_walk(&self, oid: &Oid) -> impl Future<Output = Result<Vec<VarBind>>> + Send;

    /// Retrieve specific values.
    fn get(&self, oids: &[Oid]) -> impl Future<Output = Result<Vec<VarBind>>> + Send;

    /// Release the session.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Remote endpoint, for diagnostics.
    fn peer(&self) -> &str;
}
