//! Counter delta and rate calculation.
//!
//! [`CalcSender`] keeps the last observation of every identifier it has a
//! [`Recipe`] for and emits the difference on the next one.

use super::{Sender, TimeStamp};
use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::tags::{TAG_OID, Tags};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::time::Instant;

/// How to derive a value from a counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    /// Name to emit the derived value under; the original name when unset.
    pub rename: Option<String>,
    /// Also forward the untouched original sample.
    pub orig: bool,
    /// Emit delta per second instead of the raw delta.
    pub rate: bool,
}

impl Recipe {
    /// Emit the raw delta under the original name.
    pub fn delta() -> Self {
        Self::default()
    }

    /// Emit a per-second rate under `rename`.
    pub fn rate(rename: impl Into<String>) -> Self {
        Self {
            rename: Some(rename.into()),
            orig: false,
            rate: true,
        }
    }

    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn with_orig(mut self, orig: bool) -> Self {
        self.orig = orig;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct DataPoint {
    value: u64,
    at: Instant,
}

/// Turns counters into deltas or rates.
///
/// Samples whose name has a [`Recipe`] must carry the `oid` tag, which
/// keys the previous observation. The first observation of an identifier
/// emits nothing. A value lower than the previous one is treated as a
/// counter reset: the delta is the new raw value.
///
/// Names without a recipe pass through unchanged.
pub struct CalcSender<S> {
    inner: S,
    recipes: HashMap<String, Recipe>,
    saved: HashMap<String, DataPoint>,
}

impl<S: Sender> CalcSender<S> {
    pub fn new(inner: S, recipes: BTreeMap<String, Recipe>) -> Self {
        Self {
            inner,
            recipes: recipes.into_iter().collect(),
            saved: HashMap::new(),
        }
    }

    /// Number of identifiers with a stored observation.
    pub fn tracked(&self) -> usize {
        self.saved.len()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sender> Sender for CalcSender<S> {
    fn send(&mut self, name: &str, tags: Tags, value: Reading, ts: TimeStamp) -> Result<()> {
        let Some(recipe) = self.recipes.get(name) else {
            return self.inner.send(name, tags, value, ts);
        };
        let Some(oid) = tags.get(TAG_OID).cloned() else {
            return Err(Error::MissingTag {
                name: name.into(),
                tag: TAG_OID,
            }
            .boxed());
        };
        let Some(this) = value.as_counter() else {
            return Err(Error::decode(
                name,
                format_args!("invalid cooked data type: {}", value.kind()),
            ));
        };

        let prior = self.saved.insert(
            oid,
            DataPoint {
                value: this,
                at: ts.stop,
            },
        );

        let mut result = Ok(());
        if let Some(prior) = prior {
            // a decrease is a wrap or a device reset; either way start over
            let delta = if this >= prior.value {
                this - prior.value
            } else {
                this
            };
            let aka = recipe
                .rename
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(name);
            if recipe.rate {
                let since = ts.stop.saturating_duration_since(prior.at).as_secs_f64();
                if since > 0.0 {
                    let rate = delta as f64 / since;
                    result = self.inner.send(aka, tags.clone(), Reading::Float(rate), ts);
                }
            } else {
                result = self.inner.send(aka, tags.clone(), Reading::Unsigned(delta), ts);
            }
        }

        if recipe.orig {
            let orig = self.inner.send(name, tags, value, ts);
            return result.and(orig);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Collect;
    use std::time::Duration;

    fn tagged(oid: &str) -> Tags {
        Tags::from([(TAG_OID.to_string(), oid.to_string())])
    }

    fn calc(recipe: Recipe) -> (CalcSender<Collect>, Collect) {
        let sink = Collect::new();
        let recipes = BTreeMap::from([("octets".to_string(), recipe)]);
        (CalcSender::new(sink.clone(), recipes), sink)
    }

    #[test]
    fn rate_scenario() {
        let (mut s, sink) = calc(Recipe::rate("rate"));
        let t0 = Instant::now();
        let t10 = t0 + Duration::from_secs(10);

        s.send("octets", tagged(".1.2.3"), Reading::Counter64(1000), TimeStamp::at(t0))
            .unwrap();
        assert!(sink.is_empty());

        s.send("octets", tagged(".1.2.3"), Reading::Counter64(1500), TimeStamp::at(t10))
            .unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "rate");
        assert_eq!(records[0].value, Reading::Float(50.0));
    }

    #[test]
    fn delta_and_reset() {
        let (mut s, sink) = calc(Recipe::delta());
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Counter32(100), TimeStamp::at(t)).unwrap();
        s.send("octets", tagged("a"), Reading::Counter32(160), TimeStamp::at(t)).unwrap();
        // lower follow-on value: the new raw value, never a negative delta
        s.send("octets", tagged("a"), Reading::Counter32(40), TimeStamp::at(t)).unwrap();

        let values: Vec<_> = sink.records().into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Reading::Unsigned(60), Reading::Unsigned(40)]);
        assert_eq!(sink.records()[0].name, "octets");
    }

    #[test]
    fn counter32_wrap_is_under_reported() {
        // Known limitation: a true 32-bit wrap is reported as a reset.
        let (mut s, sink) = calc(Recipe::delta());
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Counter32(u32::MAX - 9), TimeStamp::at(t))
            .unwrap();
        s.send("octets", tagged("a"), Reading::Counter32(5), TimeStamp::at(t)).unwrap();
        assert_eq!(sink.records()[0].value, Reading::Unsigned(5));
    }

    #[test]
    fn rate_needs_positive_elapsed() {
        let (mut s, sink) = calc(Recipe::rate("rate"));
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Counter64(1), TimeStamp::at(t)).unwrap();
        s.send("octets", tagged("a"), Reading::Counter64(9), TimeStamp::at(t)).unwrap();
        assert!(sink.is_empty());
        // the stored point was still updated
        s.send(
            "octets",
            tagged("a"),
            Reading::Counter64(19),
            TimeStamp::at(t + Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(sink.records()[0].value, Reading::Float(2.0));
    }

    #[test]
    fn identifiers_tracked_separately() {
        let (mut s, sink) = calc(Recipe::delta());
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Counter64(10), TimeStamp::at(t)).unwrap();
        s.send("octets", tagged("b"), Reading::Counter64(500), TimeStamp::at(t)).unwrap();
        s.send("octets", tagged("a"), Reading::Counter64(15), TimeStamp::at(t)).unwrap();
        assert_eq!(s.tracked(), 2);
        assert_eq!(sink.records()[0].value, Reading::Unsigned(5));
    }

    #[test]
    fn orig_reforwards_original() {
        let (mut s, sink) = calc(Recipe::delta().with_rename("octets_delta").with_orig(true));
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Counter64(10), TimeStamp::at(t)).unwrap();
        s.send("octets", tagged("a"), Reading::Counter64(12), TimeStamp::at(t)).unwrap();
        let names: Vec<_> = sink.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["octets", "octets_delta", "octets"]);
    }

    #[test]
    fn missing_oid_tag_is_error() {
        let (mut s, _) = calc(Recipe::delta());
        let err = s
            .send("octets", Tags::new(), Reading::Counter64(1), TimeStamp::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "no oid tag saved for calculation on: octets");
    }

    #[test]
    fn non_counter_is_error_and_other_names_pass() {
        let (mut s, sink) = calc(Recipe::delta());
        assert!(s
            .send("octets", tagged("a"), Reading::Text("x".into()), TimeStamp::now())
            .is_err());
        s.send("sysName", Tags::new(), Reading::Text("r1".into()), TimeStamp::now())
            .unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn negative_integer_wraps_like_a_counter() {
        let (mut s, sink) = calc(Recipe::delta());
        let t = Instant::now();
        s.send("octets", tagged("a"), Reading::Integer(-3), TimeStamp::at(t))
            .unwrap();
        s.send("octets", tagged("a"), Reading::Integer(-1), TimeStamp::at(t))
            .unwrap();
        assert_eq!(sink.records()[0].value, Reading::Unsigned(2));
    }
}
