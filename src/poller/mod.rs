//! Poll sessions.
//!
//! A [`PollSession`] owns everything one target needs: the transport
//! session, the column cache, the [`Walker`] and the output pipeline. It is
//! built synchronously by [`PollSession::setup`], so configuration,
//! resolution and connect failures surface to the caller, and then either
//! walked once ([`PollSession::cycle`]) or driven on a schedule
//! ([`PollSession::run`]) until cancelled or its repetition count runs out.
//!
//! Most callers go through the [`Supervisor`], which owns the identifier
//! registry and the shared shutdown signal.

mod pacer;
mod supervisor;
mod walker;

pub use pacer::{Adjustment, LatencyWindow, Pacer, STEP, WINDOW_CAPACITY};
pub use supervisor::{SessionHandle, Supervisor};
pub use walker::Walker;

use crate::cache::ColumnCache;
use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::profile::Profile;
use crate::sender::{DebugSender, Sender};
use crate::table::Registry;
use crate::transport::{Connector, Session};
use crate::util::lock;
use crate::varbind::VarBind;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Callback receiving every failed cycle's error.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// One configured poll target.
pub struct PollSession<S: Session> {
    session: Arc<S>,
    root: Oid,
    walker: Walker,
    cache: Arc<ColumnCache>,
    sender: Box<dyn Sender>,
    pacer: Arc<Mutex<Pacer>>,
    count: u32,
    refresh: Duration,
    on_error: Option<ErrorHandler>,
}

impl<S: Session> PollSession<S> {
    /// Validate, resolve, connect and build the initial column cache.
    ///
    /// Without a `sender`, samples go to a terminal [`DebugSender`].
    pub async fn setup<C>(
        connector: &C,
        registry: &Registry,
        profile: &Profile,
        criteria: &Criteria,
        sender: Option<Box<dyn Sender>>,
    ) -> Result<Self>
    where
        C: Connector<Session = S>,
    {
        profile.validate()?;
        let table = registry.snapshot();
        let target = criteria.resolve(&table)?;
        let cache = Arc::new(ColumnCache::new(&target, criteria.aliases.clone()));
        let walker = Walker::new(table, criteria, &profile.host, cache.clone())?;

        let session = connector.connect(profile).await?;
        if let Err(e) = cache.refresh(&session).await {
            session.close().await;
            return Err(e);
        }

        tracing::debug!(target: "snmp_poller::poller", {
            snmp.target = session.peer(),
            snmp.oid = %target.oid
        }, "poll session ready");

        Ok(Self {
            session: Arc::new(session),
            root: target.oid,
            walker,
            cache,
            sender: sender.unwrap_or_else(|| Box::new(DebugSender::terminal())),
            pacer: Arc::new(Mutex::new(Pacer::new(criteria.freq))),
            count: criteria.count,
            refresh: criteria.refresh,
            on_error: None,
        })
    }

    /// Report cycle errors to `handler` instead of the debug log.
    pub fn with_error_handler(mut self, handler: Option<ErrorHandler>) -> Self {
        self.on_error = handler;
        self
    }

    pub fn peer(&self) -> &str {
        self.session.peer()
    }

    /// Root of the walked subtree.
    pub fn root(&self) -> &Oid {
        &self.root
    }

    /// Shared handle on the adaptive delay state.
    pub fn pacer(&self) -> Arc<Mutex<Pacer>> {
        self.pacer.clone()
    }

    /// Walk the target once and push every sample through the pipeline.
    ///
    /// A walk that returns nothing is retried as a plain get of the root, so
    /// scalar instances (`sysName.0`) can be polled directly.
    pub async fn cycle(&mut self) -> Result<usize> {
        let mut varbinds = self.session.bulk_walk(&self.root).await?;
        if varbinds.is_empty() {
            varbinds = self.session.get(std::slice::from_ref(&self.root)).await?;
            varbinds.retain(|vb: &VarBind| !vb.value.is_exception());
        }
        self.walker.process(&varbinds, &mut self.sender)
    }

    /// Release the transport session.
    pub async fn close(self) {
        self.session.close().await;
    }

    fn report(&self, e: &Error) {
        match &self.on_error {
            Some(handler) => handler(e),
            None => {
                tracing::debug!(target: "snmp_poller::poller", { snmp.target = self.peer(), error = %e }, "poll cycle failed")
            }
        }
    }

    fn spawn_refresh(&self, token: CancellationToken) -> Option<JoinHandle<()>> {
        if self.refresh.is_zero() {
            return None;
        }
        let period = self.refresh;
        let session = self.session.clone();
        let cache = self.cache.clone();
        Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        if let Err(e) = cache.refresh(&*session).await {
                            tracing::warn!(target: "snmp_poller::poller", { snmp.target = session.peer(), error = %e }, "column refresh failed");
                        }
                    }
                }
            }
        }))
    }

    /// Poll on schedule until `token` is cancelled or the repetition count
    /// is used up.
    ///
    /// Cycle errors go to the error handler and never stop the schedule.
    /// With a count, the result of the final cycle is returned.
    #[instrument(skip_all, fields(snmp.target = %self.session.peer(), snmp.oid = %self.root))]
    pub async fn run(mut self, token: CancellationToken) -> Result<()> {
        let refresh_token = token.child_token();
        let refresh = self.spawn_refresh(refresh_token.clone());

        let mut remaining = self.count;
        let mut outcome = Ok(());
        let mut next = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(target: "snmp_poller::poller", "poll session shutdown requested");
                    break;
                }
                _ = tokio::time::sleep_until(next) => {}
            }

            let tick = next;
            let started = Instant::now();
            let result = self.cycle().await.map(|sent| {
                tracing::trace!(target: "snmp_poller::poller", { sent = sent }, "poll cycle complete");
            });
            if let Err(e) = &result {
                self.report(e);
            }

            let (adjustment, delay) = {
                let mut pacer = lock(&self.pacer);
                (pacer.record(started.elapsed()), pacer.delay())
            };
            match adjustment {
                Adjustment::Raised { from, to } | Adjustment::Lowered { from, to } => {
                    tracing::info!(target: "snmp_poller::poller", {
                        snmp.delay_s = to.as_secs(),
                        previous_s = from.as_secs()
                    }, "poll delay adjusted");
                }
                Adjustment::Unchanged => {}
            }
            // a raised delay pushes the next tick out by the difference
            next = tick + delay;

            if remaining > 0 {
                remaining -= 1;
                if remaining == 0 {
                    outcome = result;
                    break;
                }
            }
        }

        refresh_token.cancel();
        if let Some(handle) = refresh {
            let _ = handle.await;
        }
        self.close().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoder;
    use crate::oid;
    use crate::sender::Collect;
    use crate::table::{Entry, IdentifierTable};
    use crate::transport::{MockConnector, RecordedRequest};
    use crate::value::Value;

    fn registry() -> Registry {
        let mut t = IdentifierTable::new();
        t.insert(
            &oid!(1, 3, 6, 1, 2, 1, 1, 5),
            Entry::new("sysName", 0, Decoder::OctetString),
        );
        Registry::new(t)
    }

    fn agent() -> MockConnector {
        MockConnector::with_data([(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core"))])
    }

    #[tokio::test]
    async fn scalar_instance_falls_back_to_get() {
        let sink = Collect::new();
        let agent = agent();
        let mut poll = PollSession::setup(
            &agent,
            &registry(),
            &Profile::new("r1"),
            &Criteria::new(".1.3.6.1.2.1.1.5.0"),
            Some(Box::new(sink.clone())),
        )
        .await
        .unwrap();
        assert_eq!(poll.cycle().await.unwrap(), 1);
        assert_eq!(sink.records()[0].name, "sysName");
        assert!(agent
            .requests()
            .contains(&RecordedRequest::Get(vec![oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)])));
        poll.close().await;
        assert_eq!(agent.close_count(), 1);
    }

    #[tokio::test]
    async fn failed_initial_cache_build_closes_session() {
        let agent = agent();
        agent.queue_error("busy");
        let result = PollSession::setup(
            &agent,
            &registry(),
            &Profile::new("r1"),
            &Criteria::new(".1.3.6.1.2.1.2"),
            None,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(agent.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn count_bounds_the_schedule() {
        let sink = Collect::new();
        let agent = agent();
        let criteria = Criteria::new(".1.3.6.1.2.1.1").with_count(3);
        let poll = PollSession::setup(
            &agent,
            &registry(),
            &Profile::new("r1"),
            &criteria,
            Some(Box::new(sink.clone())),
        )
        .await
        .unwrap();
        poll.run(CancellationToken::new()).await.unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(agent.close_count(), 1);
    }
}
