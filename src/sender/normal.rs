//! Integer normalization.

use super::{Sender, TimeStamp};
use crate::error::Result;
use crate::reading::Reading;
use crate::tags::Tags;

/// Converts every integral reading to [`Reading::Integer`].
///
/// Unsigned values above `i64::MAX` wrap. Non-integral readings pass
/// through unchanged.
pub struct NormalSender<S> {
    inner: S,
}

impl<S: Sender> NormalSender<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Sender> Sender for NormalSender<S> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        let value = match value.as_i64() {
            Some(v) => Reading::Integer(v),
            None => value,
        };
        self.inner.send(name, tags, value, ts)
    }
}
