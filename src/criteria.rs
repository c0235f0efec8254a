//! Query criteria.
//!
//! [`Criteria`] describes what one poll session retrieves and how its
//! samples are named, filtered and tagged. Identifiers may be given in
//! dotted form or as symbolic names; [`Criteria::resolve`] normalizes both
//! against an [`IdentifierTable`] at session setup.

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::table::IdentifierTable;
use crate::util::secs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default poll frequency.
pub const DEFAULT_FREQ: Duration = Duration::from_secs(60);

/// What to query and what to keep.
///
/// ```rust
/// use snmp_poller::Criteria;
/// use std::time::Duration;
///
/// let crit = Criteria::new("ifXTable")
///     .with_tag("site", "lab")
///     .with_filter(["^ifHC"], true)
///     .with_oid_tag(true)
///     .with_freq(Duration::from_secs(30));
/// assert_eq!(crit.count, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Subtree to walk, dotted or symbolic.
    pub oid: String,
    /// Table whose string values describe the rows of `oid`.
    pub index: Option<String>,
    /// Static tags added to every sample; these win over computed tags.
    pub tags: BTreeMap<String, String>,
    /// Manual alias overrides, keyed by interface column name or by suffix.
    pub aliases: BTreeMap<String, String>,
    /// Replacement names for resolved object names.
    pub renames: BTreeMap<String, String>,
    /// Name filter patterns.
    pub regexps: Vec<String>,
    /// Keep matching names when true, drop them when false.
    pub keep: bool,
    /// Attach the source identifier as tag `oid`.
    pub oid_tag: bool,
    /// Attach the raw index suffix as tag `suffix` instead of decomposing it.
    pub suffix_tag: bool,
    /// Number of cycles to run; 0 repeats until shutdown.
    pub count: u32,
    /// Poll period, and the floor for the adaptive delay.
    #[serde(with = "secs")]
    pub freq: Duration,
    /// Column metadata refresh period; zero disables refreshing.
    #[serde(with = "secs")]
    pub refresh: Duration,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            oid: String::new(),
            index: None,
            tags: BTreeMap::new(),
            aliases: BTreeMap::new(),
            renames: BTreeMap::new(),
            regexps: Vec::new(),
            keep: false,
            oid_tag: false,
            suffix_tag: false,
            count: 0,
            freq: DEFAULT_FREQ,
            refresh: Duration::ZERO,
        }
    }
}

/// Criteria identifiers resolved to dotted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub oid: Oid,
    pub index: Option<Oid>,
}

impl Criteria {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_alias(mut self, key: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(key.into(), alias.into());
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    /// Set the name filter patterns and their polarity.
    pub fn with_filter<I, S>(mut self, regexps: I, keep: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regexps = regexps.into_iter().map(Into::into).collect();
        self.keep = keep;
        self
    }

    pub fn with_oid_tag(mut self, enabled: bool) -> Self {
        self.oid_tag = enabled;
        self
    }

    pub fn with_suffix_tag(mut self, enabled: bool) -> Self {
        self.suffix_tag = enabled;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_freq(mut self, freq: Duration) -> Self {
        self.freq = freq;
        self
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Resolve the walk and index identifiers.
    pub fn resolve(&self, table: &IdentifierTable) -> Result<Target> {
        if self.oid.trim().is_empty() {
            return Err(Error::config("no OID specified"));
        }
        let oid = table.resolve(&self.oid)?;
        let index = match self.index.as_deref() {
            Some(index) if !index.is_empty() => Some(table.resolve(index)?),
            _ => None,
        };
        Ok(Target { oid, index })
    }

    /// Check settings that only matter for repeating sessions.
    pub fn validate_schedule(&self) -> Result<()> {
        if self.freq.is_zero() {
            return Err(Error::config("poll frequency must be positive"));
        }
        Ok(())
    }
}
