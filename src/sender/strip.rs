//! Tag removal.

use super::{Sender, TimeStamp};
use crate::error::Result;
use crate::reading::Reading;
use crate::tags::Tags;

/// Removes a fixed set of tag keys before forwarding.
///
/// Typically placed after a [`CalcSender`](super::CalcSender) to drop the
/// `oid` tag it needed for bookkeeping.
pub struct StripSender<S> {
    inner: S,
    keys: Vec<String>,
}

impl<S: Sender> StripSender<S> {
    pub fn new<I, K>(inner: S, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            inner,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Sender> Sender for StripSender<S> {
    fn send(&mut self, name: &str, mut tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        for key in &self.keys {
            tags.remove(key);
        }
        self.inner.send(name, tags, value, ts)
    }
}
