//! Name filtering by regular expression.

use super::{Sender, TimeStamp};
use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::tags::Tags;
use regex::Regex;

/// Compiled list of name patterns with a keep/discard polarity.
///
/// With `keep` set, a name is allowed only if at least one pattern matches.
/// Otherwise a name is allowed only if no pattern matches.
#[derive(Debug, Clone)]
pub struct NameFilter {
    patterns: Vec<Regex>,
    keep: bool,
}

impl NameFilter {
    /// Compile `patterns`. The first invalid pattern fails the whole filter.
    pub fn new<I, P>(patterns: I, keep: bool) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| {
                    Error::Pattern {
                        pattern: p.into(),
                        source,
                    }
                    .boxed()
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns, keep })
    }

    pub fn allows(&self, name: &str) -> bool {
        let matched = self.patterns.iter().any(|re| re.is_match(name));
        matched == self.keep
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Forwards only samples whose name the [`NameFilter`] allows.
pub struct FilterSender<S> {
    inner: S,
    filter: NameFilter,
}

impl<S: Sender> FilterSender<S> {
    pub fn new(inner: S, filter: NameFilter) -> Self {
        Self { inner, filter }
    }
}

impl<S: Sender> Sender for FilterSender<S> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        if !self.filter.allows(name) {
            return Ok(());
        }
        self.inner.send(name, tags, value, ts)
    }
}
