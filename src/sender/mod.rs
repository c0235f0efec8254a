//! Output pipeline.
//!
//! Every decoded sample leaves the poller as a `(name, tags, value,
//! timestamp)` record handed to a [`Sender`]. Stages in this module
//! implement the same trait and wrap an inner sender, so a pipeline is
//! built by nesting:
//!
//! ```rust
//! use snmp_poller::sender::{CalcSender, DebugSender, FnSender, Recipe, Sender, StripSender};
//! use std::collections::BTreeMap;
//!
//! let terminal = FnSender::new(|name: &str, _tags, value, _ts| {
//!     println!("{} {}", name, value);
//!     Ok(())
//! });
//! let recipes = BTreeMap::from([("ifHCInOctets".to_string(), Recipe::rate("octets_per_second"))]);
//! let pipeline = CalcSender::new(StripSender::new(terminal, ["oid"]), recipes);
//! let _pipeline = DebugSender::new(pipeline);
//! ```
//!
//! Stages are stateful objects constructed once per session. They run on
//! the session's own task, so they need `Send` but not `Sync`.

mod calc;
mod debug;
mod filter;
mod normal;
mod split;
mod strip;

pub use calc::{CalcSender, Recipe};
pub use debug::DebugSender;
pub use filter::{FilterSender, NameFilter};
pub use normal::NormalSender;
pub use split::SplitSender;
pub use strip::StripSender;

use crate::error::Result;
use crate::reading::Reading;
use crate::tags::Tags;
use std::time::Duration;
use tokio::time::Instant;

/// Instants bounding the decode-and-send of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStamp {
    pub start: Instant,
    pub stop: Instant,
}

impl TimeStamp {
    pub fn new(start: Instant, stop: Instant) -> Self {
        Self { start, stop }
    }

    /// A zero-length stamp at `at`.
    pub fn at(at: Instant) -> Self {
        Self { start: at, stop: at }
    }

    pub fn now() -> Self {
        Self::at(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.stop.saturating_duration_since(self.start)
    }
}

/// Consumer of decoded samples.
pub trait Sender: Send {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()>;
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        (**self).send(name, tags, value, ts)
    }
}

impl<S: Sender + ?Sized> Sender for &mut S {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        (**self).send(name, tags, value, ts)
    }
}

/// Adapts a closure into a [`Sender`].
pub struct FnSender<F>(F);

impl<F> FnSender<F> {
    pub fn new(f: F) -> Self
    where
        F: FnMut(&str, Tags, Reading, TimeStamp) -> Result<()> + Send,
    {
        Self(f)
    }
}

impl<F> Sender for FnSender<F>
where
    F: FnMut(&str, Tags, Reading, TimeStamp) -> Result<()> + Send,
{
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        (self.0)(name, tags, value, ts)
    }
}

/// Terminal sender that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Sender for Discard {
    fn send(&mut self, _: &str, _: Tags, _: Reading, _: TimeStamp) -> Result<()> {
        Ok(())
    }
}

/// One record captured by a [`Collect`] sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub tags: Tags,
    pub value: Reading,
    pub ts: TimeStamp,
}

/// Terminal sender that stores every record in a shared buffer.
///
/// Clones share the buffer, so one clone can be handed to a session and
/// another kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct Collect {
    records: std::sync::Arc<std::sync::Mutex<Vec<Record>>>,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records received so far.
    pub fn records(&self) -> Vec<Record> {
        crate::util::lock(&self.records).clone()
    }

    /// Remove and return all records received so far.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *crate::util::lock(&self.records))
    }

    pub fn len(&self) -> usize {
        crate::util::lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sender for Collect {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        crate::util::lock(&self.records).push(Record {
            name: name.to_string(),
            tags,
            value,
            ts,
        });
        Ok(())
    }
}
