//! Mock transport for testing.
//!
//! Provides a programmable agent that can simulate various scenarios
//! without needing an actual network connection.

use super::{Connector, Session};
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::profile::Profile;
use crate::util::lock;
use crate::value::Value;
use crate::varbind::VarBind;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted failure for the next request.
#[derive(Clone, Debug)]
pub enum MockFailure {
    /// Simulate a timeout after retries
    Timeout,
    /// Simulate a transport error
    Error(String),
}

/// A request received by the mock agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedRequest {
    Walk(Oid),
    Get(Vec<Oid>),
}

/// Mock state shared between the connector and its sessions.
#[derive(Default)]
struct MockAgentInner {
    /// Agent data, walked in identifier order
    data: BTreeMap<Oid, Value>,
    /// Failures consumed by the next requests
    failures: VecDeque<MockFailure>,
    /// Failure for the next connect attempt
    connect_failure: Option<String>,
    /// Recorded requests
    requests: Vec<RecordedRequest>,
    /// Delay applied before every response
    latency: Duration,
    connects: usize,
    closes: usize,
}

/// Programmable in-memory agent implementing [`Connector`].
///
/// Clones share state, so a test can keep a handle for assertions while
/// the poller owns another.
///
/// # Example
///
/// ```rust
/// use snmp_poller::transport::MockConnector;
/// use snmp_poller::{Value, oid};
///
/// let agent = MockConnector::new();
/// agent.set(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("router1"));
///
/// // Fail the next request
/// agent.queue_timeout();
/// ```
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<MockAgentInner>>,
}

impl MockConnector {
    /// Create an agent with no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an agent serving `data`.
    pub fn with_data(data: impl IntoIterator<Item = (Oid, Value)>) -> Self {
        let agent = Self::new();
        lock(&agent.inner).data.extend(data);
        agent
    }

    /// Set one value.
    pub fn set(&self, oid: Oid, value: Value) {
        lock(&self.inner).data.insert(oid, value);
    }

    /// Remove one value.
    pub fn remove(&self, oid: &Oid) -> Option<Value> {
        lock(&self.inner).data.remove(oid)
    }

    /// Fail the next request with a timeout.
    pub fn queue_timeout(&self) {
        lock(&self.inner).failures.push_back(MockFailure::Timeout);
    }

    /// Fail the next request with a transport error.
    pub fn queue_error(&self, msg: impl Into<String>) {
        lock(&self.inner)
            .failures
            .push_back(MockFailure::Error(msg.into()));
    }

    /// Fail the next connect attempt.
    pub fn fail_connect(&self, msg: impl Into<String>) {
        lock(&self.inner).connect_failure = Some(msg.into());
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.inner).latency = latency;
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner).requests.clone()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.inner).requests.clear();
    }

    /// Number of walks requested for exactly `root`.
    pub fn walk_count(&self, root: &Oid) -> usize {
        lock(&self.inner)
            .requests
            .iter()
            .filter(|r| matches!(r, RecordedRequest::Walk(o) if o == root))
            .count()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        lock(&self.inner).connects
    }

    /// Number of session closes.
    pub fn close_count(&self) -> usize {
        lock(&self.inner).closes
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    fn connect(&self, profile: &Profile) -> impl Future<Output = Result<MockSession>> + Send {
        let endpoint = profile.endpoint();
        let result = {
            let mut inner = lock(&self.inner);
            match inner.connect_failure.take() {
                Some(message) => Err(Error::Transport {
                    target: endpoint.clone().into(),
                    message: message.into(),
                }
                .boxed()),
                None => {
                    inner.connects += 1;
                    Ok(MockSession {
                        inner: self.inner.clone(),
                        endpoint,
                        timeout: profile.timeout,
                        retries: profile.retries,
                        closed: Arc::new(Mutex::new(false)),
                    })
                }
            }
        };
        async move { result }
    }
}

/// Session handed out by [`MockConnector`].
pub struct MockSession {
    inner: Arc<Mutex<MockAgentInner>>,
    endpoint: String,
    timeout: Duration,
    retries: u32,
    closed: Arc<Mutex<bool>>,
}

impl MockSession {
    /// Record the request, then either fail it or answer with `respond`.
    async fn serve(
        &self,
        request: RecordedRequest,
        respond: impl FnOnce(&BTreeMap<Oid, Value>) -> Vec<VarBind>,
    ) -> Result<Vec<VarBind>> {
        if *lock(&self.closed) {
            return Err(self.transport_error("session closed"));
        }
        let (latency, failure) = {
            let mut inner = lock(&self.inner);
            inner.requests.push(request);
            (inner.latency, inner.failures.pop_front())
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(MockFailure::Timeout) => Err(Error::Timeout {
                target: self.endpoint.as_str().into(),
                elapsed: self.timeout,
                retries: self.retries,
            }
            .boxed()),
            Some(MockFailure::Error(msg)) => Err(self.transport_error(&msg)),
            None => Ok(respond(&lock(&self.inner).data)),
        }
    }

    fn transport_error(&self, message: &str) -> Box<Error> {
        Error::Transport {
            target: self.endpoint.as_str().into(),
            message: message.into(),
        }
        .boxed()
    }
}

impl Session for MockSession {
    fn bulk_walk(&self, oid: &Oid) -> impl Future<Output = Result<Vec<VarBind>>> + Send {
        let root = oid.clone();
        async move {
            self.serve(RecordedRequest::Walk(root.clone()), |data| {
                data.range((Bound::Excluded(root.clone()), Bound::Unbounded))
                    .take_while(|(o, _)| o.starts_with(&root))
                    .map(|(o, v)| VarBind::new(o.clone(), v.clone()))
                    .collect()
            })
            .await
        }
    }

    fn get(&self, oids: &[Oid]) -> impl Future<Output = Result<Vec<VarBind>>> + Send {
        let oids = oids.to_vec();
        async move {
            self.serve(RecordedRequest::Get(oids.clone()), |data| {
                oids.iter()
                    .map(|o| {
                        let value = data.get(o).cloned().unwrap_or(Value::NoSuchObject);
                        VarBind::new(o.clone(), value)
                    })
                    .collect()
            })
            .await
        }
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        let mut closed = lock(&self.closed);
        if !*closed {
            *closed = true;
            lock(&self.inner).closes += 1;
        }
        async {}
    }

    fn peer(&self) -> &str {
        &self.endpoint
    }
}
