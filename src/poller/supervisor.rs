//! Session lifecycle.
//!
//! The [`Supervisor`] owns the identifier registry and the shutdown token
//! shared by every session it starts, and tracks their tasks so shutdown
//! can wait for them to close.

use super::{ErrorHandler, Pacer, PollSession};
use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::sender::Sender;
use crate::table::Registry;
use crate::transport::Connector;
use crate::util::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Composition root for poll sessions.
///
/// Owns the identifier [`Registry`], a shutdown signal shared by every
/// session it starts, and a tracker for their tasks.
///
/// # Example
///
/// ```rust,no_run
/// use snmp_poller::poller::Supervisor;
/// use snmp_poller::transport::MockConnector;
/// use snmp_poller::{Criteria, IdentifierTable, Profile, Registry};
///
/// # async fn example() -> snmp_poller::Result<()> {
/// let table = IdentifierTable::from_flat_file("oids.txt")?;
/// let supervisor = Supervisor::new(Registry::new(table));
/// let agent = MockConnector::new();
///
/// let handle = supervisor
///     .start(&agent, &Profile::new("192.0.2.1"), &Criteria::new("ifXTable"), None, None)
///     .await?;
/// println!("polling {}", handle.peer());
///
/// supervisor.shutdown();
/// supervisor.wait().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    registry: Registry,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Supervisor {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set up a session and poll it in the background.
    ///
    /// Setup runs before this returns, so invalid profiles, unknown names,
    /// connect failures and a failed initial metadata build are reported
    /// here. Later cycle errors go to `on_error`, or the debug log without
    /// one. Without a `sender`, samples are written by a terminal
    /// [`DebugSender`](crate::sender::DebugSender).
    ///
    /// The session task runs inside the caller's current span.
    pub async fn start<C: Connector>(
        &self,
        connector: &C,
        profile: &Profile,
        criteria: &Criteria,
        sender: Option<Box<dyn Sender>>,
        on_error: Option<ErrorHandler>,
    ) -> Result<SessionHandle> {
        if self.token.is_cancelled() {
            return Err(Error::config("supervisor is shut down"));
        }
        criteria.validate_schedule()?;
        let poll = PollSession::setup(connector, &self.registry, profile, criteria, sender)
            .await?
            .with_error_handler(on_error);

        let token = self.token.child_token();
        let peer = poll.peer().to_string();
        let pacer = poll.pacer();
        let task = self
            .tracker
            .spawn(poll.run(token.clone()).instrument(tracing::Span::current()));

        tracing::info!(target: "snmp_poller::poller", { snmp.target = %peer }, "poll session started");
        Ok(SessionHandle {
            peer,
            pacer,
            token,
            task,
        })
    }

    /// Walk once with the same setup as [`start`](Self::start) and return
    /// the walk's result.
    pub async fn sample<C: Connector>(
        &self,
        connector: &C,
        profile: &Profile,
        criteria: &Criteria,
        sender: Option<Box<dyn Sender>>,
    ) -> Result<()> {
        let mut poll =
            PollSession::setup(connector, &self.registry, profile, criteria, sender).await?;
        let result = poll.cycle().await.map(|_| ());
        poll.close().await;
        result
    }

    /// Signal every session to stop. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::info!(target: "snmp_poller::poller", { sessions = self.tracker.len() }, "shutting down poll sessions");
        }
        self.token.cancel();
        self.tracker.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of session tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every started session to finish.
    ///
    /// Sessions with no repetition count only finish after
    /// [`shutdown`](Self::shutdown).
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Handle on one background session.
#[derive(Debug)]
pub struct SessionHandle {
    peer: String,
    pacer: Arc<Mutex<Pacer>>,
    token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl SessionHandle {
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Current adaptive delay.
    pub fn delay(&self) -> Duration {
        lock(&self.pacer).delay()
    }

    /// Stop this session only.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end and return its outcome.
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Task(e.to_string().into()).boxed()),
        }
    }
}
