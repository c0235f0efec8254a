//! Column metadata cache.
//!
//! Samples from interface tables are more useful with the interface's name
//! and alias attached, and samples from inactive interfaces are noise. The
//! [`ColumnCache`] walks a few auxiliary columns once at session setup (and
//! again on every refresh) and keeps suffix-keyed maps for the tag composer.
//!
//! Two scopes exist:
//!
//! - interface scope, when the walked subtree is under MIB-2: `ifName`,
//!   `ifAlias` and `ifOperStatus` are walked;
//! - table scope, when the criteria name an index table: that table's
//!   values become row descriptions.

use crate::criteria::Target;
use crate::decode::clean_string;
use crate::error::Result;
use crate::oid::{Oid, join_arcs};
use crate::tags::{TAG_ALIAS, TAG_COLUMN, TAG_DESCR, Tags};
use crate::transport::Session;
use crate::util::lock;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// MIB-2 subtree.
pub const MIB2: &[u32] = &[1, 3, 6, 1, 2, 1];
/// IF-MIB::ifName
pub const IF_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];
/// IF-MIB::ifAlias
pub const IF_ALIAS: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 18];
/// IF-MIB::ifOperStatus
pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];

const OPER_STATUS_UP: i32 = 1;

/// Whether a resolved object name belongs to the interface namespace.
pub fn is_interface_name(name: &str) -> bool {
    name.starts_with("if")
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Columns {
    names: HashMap<String, String>,
    aliases: HashMap<String, String>,
    descriptions: HashMap<String, String>,
    enabled: HashSet<String>,
}

/// Per-session cache of interface names, aliases, descriptions and
/// operational state, keyed by index suffix (`"3"`, `"2.1"`).
#[derive(Debug)]
pub struct ColumnCache {
    interface_scoped: bool,
    index: Option<Oid>,
    overrides: BTreeMap<String, String>,
    columns: Mutex<Columns>,
}

impl ColumnCache {
    /// Create an empty cache for a resolved target.
    ///
    /// `overrides` are manual aliases keyed by interface name or suffix.
    pub fn new(target: &Target, overrides: BTreeMap<String, String>) -> Self {
        Self {
            interface_scoped: target.oid.arcs().starts_with(MIB2),
            index: target.index.clone(),
            overrides,
            columns: Mutex::new(Columns::default()),
        }
    }

    /// Whether interface columns are tracked.
    pub fn is_interface_scoped(&self) -> bool {
        self.interface_scoped
    }

    /// Re-read all auxiliary columns and swap them in.
    ///
    /// On error the previous contents stay in place.
    pub async fn refresh<S: Session>(&self, session: &S) -> Result<()> {
        let mut fresh = Columns::default();
        if self.interface_scoped {
            let status = Oid::from_slice(IF_OPER_STATUS);
            for vb in session.bulk_walk(&status).await? {
                if let (Some(suffix), Value::Integer(v)) = (vb.oid.suffix_after(&status), &vb.value)
                    && *v == OPER_STATUS_UP
                {
                    fresh.enabled.insert(join_arcs(suffix));
                }
            }
            fresh.names = walk_strings(session, &Oid::from_slice(IF_NAME)).await?;
            fresh.aliases = walk_strings(session, &Oid::from_slice(IF_ALIAS)).await?;
        } else if let Some(index) = &self.index {
            fresh.descriptions = walk_strings(session, index).await?;
        }

        for (key, alias) in &self.overrides {
            let suffix = fresh
                .names
                .iter()
                .find(|(_, name)| *name == key)
                .map(|(suffix, _)| suffix.clone())
                .unwrap_or_else(|| key.clone());
            fresh.aliases.insert(suffix, alias.clone());
        }

        tracing::debug!(target: "snmp_poller::cache", {
            snmp.peer = session.peer(),
            names = fresh.names.len(),
            aliases = fresh.aliases.len(),
            descriptions = fresh.descriptions.len(),
            enabled = fresh.enabled.len()
        }, "column metadata refreshed");

        *lock(&self.columns) = fresh;
        Ok(())
    }

    /// Add cached row tags for a sample.
    ///
    /// Returns `false` when the sample should be suppressed: an interface
    /// column row whose interface is not operationally up.
    pub fn annotate(&self, name: &str, suffix: &str, tags: &mut Tags) -> bool {
        if suffix.is_empty() {
            return true;
        }
        let columns = lock(&self.columns);
        if self.interface_scoped && is_interface_name(name) {
            if !columns.enabled.contains(suffix) {
                return false;
            }
            insert_non_empty(tags, TAG_COLUMN, columns.names.get(suffix));
            insert_non_empty(tags, TAG_ALIAS, columns.aliases.get(suffix));
        }
        if self.index.is_some() {
            insert_non_empty(tags, TAG_DESCR, columns.descriptions.get(suffix));
        }
        true
    }

    /// Cached interface name for a suffix.
    pub fn name(&self, suffix: &str) -> Option<String> {
        lock(&self.columns).names.get(suffix).cloned()
    }

    /// Cached alias for a suffix.
    pub fn alias(&self, suffix: &str) -> Option<String> {
        lock(&self.columns).aliases.get(suffix).cloned()
    }

    /// Whether the interface at `suffix` was up at the last refresh.
    pub fn is_enabled(&self, suffix: &str) -> bool {
        lock(&self.columns).enabled.contains(suffix)
    }
}

fn insert_non_empty(tags: &mut Tags, key: &str, value: Option<&String>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        tags.insert(key.to_string(), v.clone());
    }
}

/// Walk a string column into a suffix-keyed map.
///
/// Exception values are skipped; non-string values keep their display form.
async fn walk_strings<S: Session>(session: &S, column: &Oid) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for vb in session.bulk_walk(column).await? {
        let Some(suffix) = vb.oid.suffix_after(column) else {
            continue;
        };
        let text = match &vb.value {
            Value::OctetString(data) => clean_string(data),
            v if v.is_exception() => continue,
            v => v.to_string(),
        };
        out.insert(join_arcs(suffix), text);
    }
    Ok(out)
}
