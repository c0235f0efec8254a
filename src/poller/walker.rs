//! Per-pair processing of one bulk walk.

use crate::cache::ColumnCache;
use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::sender::{NameFilter, Sender, TimeStamp};
use crate::table::IdentifierTable;
use crate::tags::TagComposer;
use crate::varbind::VarBind;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;

/// Turns raw pairs into named, tagged, decoded samples.
///
/// For each pair: longest-prefix lookup, rename, name filter, tag
/// composition (which may suppress the sample), decode, send. A pair with
/// no table entry fails the whole walk; a pair that fails to decode, or
/// that a sender stage rejects with a decode error, is logged and skipped.
pub struct Walker {
    table: Arc<IdentifierTable>,
    composer: TagComposer,
    cache: Arc<ColumnCache>,
    renames: BTreeMap<String, String>,
    filter: Option<NameFilter>,
}

impl Walker {
    pub fn new(
        table: Arc<IdentifierTable>,
        criteria: &Criteria,
        host: &str,
        cache: Arc<ColumnCache>,
    ) -> Result<Self> {
        let filter = if criteria.regexps.is_empty() {
            None
        } else {
            Some(NameFilter::new(&criteria.regexps, criteria.keep)?)
        };
        Ok(Self {
            table,
            composer: TagComposer::new(
                host,
                criteria.tags.clone(),
                criteria.oid_tag,
                criteria.suffix_tag,
            ),
            cache,
            renames: criteria.renames.clone(),
            filter,
        })
    }

    /// Process one pair. Returns whether a sample was sent.
    pub fn handle<S: Sender + ?Sized>(&self, vb: &VarBind, sender: &mut S) -> Result<bool> {
        let start = Instant::now();
        let Some((entry, suffix)) = self.table.lookup(&vb.oid) else {
            return Err(Error::Unresolved {
                oid: vb.oid.dotted().into(),
            }
            .boxed());
        };
        let name = self
            .renames
            .get(entry.name())
            .map(String::as_str)
            .unwrap_or(entry.name());

        if let Some(filter) = &self.filter
            && !filter.allows(name)
        {
            return Ok(false);
        }

        let Some(tags) = self
            .composer
            .compose(entry.name(), &vb.oid, suffix, Some(&self.cache))
        else {
            return Ok(false);
        };

        let value = match entry.decoder().decode(name, &vb.value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(target: "snmp_poller::poller", { snmp.oid = %vb.oid, name = name, error = %e }, "skipping undecodable value");
                return Ok(false);
            }
        };

        match sender.send(name, tags, value, TimeStamp::new(start, Instant::now())) {
            Ok(()) => Ok(true),
            Err(e) if e.is_sample_local() => {
                tracing::warn!(target: "snmp_poller::poller", { snmp.oid = %vb.oid, name = name, error = %e }, "sender rejected value");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Process a whole walk result, stopping at the first hard error.
    ///
    /// Returns the number of samples sent.
    pub fn process<S: Sender + ?Sized>(&self, varbinds: &[VarBind], sender: &mut S) -> Result<usize> {
        let mut sent = 0;
        for vb in varbinds {
            if self.handle(vb, sender)? {
                sent += 1;
            }
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IF_OPER_STATUS;
    use crate::criteria::Target;
    use crate::decode::Decoder;
    use crate::oid;
    use crate::oid::Oid;
    use crate::reading::Reading;
    use crate::sender::{CalcSender, Collect, Recipe};
    use crate::table::Entry;
    use crate::value::Value;

    fn table() -> Arc<IdentifierTable> {
        let mut t = IdentifierTable::new();
        t.insert(
            &oid!(1, 3, 6, 1, 2, 1, 1, 5),
            Entry::new("sysName", 0, Decoder::OctetString),
        );
        t.insert(
            &oid!(1, 3, 6, 1, 2, 1, 1, 3),
            Entry::new("sysUpTime", 0, Decoder::Native),
        );
        t.insert(
            &oid!(1, 3, 6, 1, 2, 1, 1, 7),
            Entry::new("sysServices", 0, Decoder::Integer),
        );
        Arc::new(t)
    }

    fn walker(criteria: &Criteria) -> Walker {
        let target = Target {
            oid: oid!(1, 3, 6, 1, 4, 1),
            index: None,
        };
        let cache = Arc::new(ColumnCache::new(&target, BTreeMap::new()));
        Walker::new(table(), criteria, "r1", cache).unwrap()
    }

    #[test]
    fn sends_named_tagged_samples() {
        let sink = Collect::new();
        let vbs = [
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(42)),
        ];
        let sent = walker(&Criteria::new(".1.3.6.1.2.1.1").with_oid_tag(true))
            .process(&vbs, &mut sink.clone())
            .unwrap();
        assert_eq!(sent, 2);

        let records = sink.records();
        assert_eq!(records[0].name, "sysName");
        assert_eq!(records[0].value, Reading::Text("core".into()));
        assert_eq!(records[0].tags.get("host").map(String::as_str), Some("r1"));
        assert_eq!(
            records[0].tags.get("oid").map(String::as_str),
            Some(".1.3.6.1.2.1.1.5.0")
        );
        assert_eq!(records[1].value, Reading::Unsigned(42));
    }

    #[test]
    fn unresolved_pair_aborts_walk() {
        let sink = Collect::new();
        let vbs = [
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 9, 1, 3, 6), Value::Integer(1)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(42)),
        ];
        let err = walker(&Criteria::default())
            .process(&vbs, &mut sink.clone())
            .unwrap_err();
        assert!(matches!(&*err, Error::Unresolved { oid } if &**oid == ".1.3.6.1.2.1.1.9.1.3.6"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn decode_failure_skips_only_that_pair() {
        let sink = Collect::new();
        let vbs = [
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 7, 0), Value::from("not a number")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 7, 1), Value::Integer(72)),
        ];
        let sent = walker(&Criteria::default())
            .process(&vbs, &mut sink.clone())
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(sink.records()[0].value, Reading::Integer(72));
    }

    #[test]
    fn rename_then_filter() {
        let sink = Collect::new();
        let criteria = Criteria::default()
            .with_rename("sysName", "hostname")
            .with_filter(["^host"], true);
        let vbs = [
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(42)),
        ];
        walker(&criteria).process(&vbs, &mut sink.clone()).unwrap();
        let names: Vec<_> = sink.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["hostname"]);
    }

    #[test]
    fn bad_pattern_fails_construction() {
        let target = Target {
            oid: Oid::from_slice(IF_OPER_STATUS),
            index: None,
        };
        let cache = Arc::new(ColumnCache::new(&target, BTreeMap::new()));
        let criteria = Criteria::default().with_filter(["[oops"], false);
        assert!(Walker::new(table(), &criteria, "r1", cache).is_err());
    }

    #[test]
    fn sender_rejection_skips_only_that_pair() {
        let sink = Collect::new();
        let recipes = BTreeMap::from([
            ("sysName".to_string(), Recipe::delta().with_orig(true)),
            ("sysServices".to_string(), Recipe::delta().with_orig(true)),
        ]);
        let mut calc = CalcSender::new(sink.clone(), recipes);
        let vbs = [
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 7, 0), Value::Integer(72)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 7, 1), Value::Integer(-3)),
        ];
        let sent = walker(&Criteria::default().with_oid_tag(true))
            .process(&vbs, &mut calc)
            .unwrap();
        assert_eq!(sent, 2);

        let values: Vec<_> = sink.records().into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Reading::Integer(72), Reading::Integer(-3)]);
    }
}
