//! Identifier table.
//!
//! [`IdentifierTable`] maps registered identifiers to their [`Entry`] and
//! answers longest-prefix queries: given the full identifier of a returned
//! value (column plus row index) it finds the most specific registered
//! ancestor and hands back the unmatched suffix.
//!
//! Matching is per arc, never per character, so `.1.3.6.1.2.1.1.1` is not
//! mistaken for an ancestor of `.1.3.6.1.2.1.1.10.0`.
//!
//! Tables are built with `&mut self` and then frozen behind an `Arc`. The
//! [`Registry`] owns the current table and swaps in a freshly built one
//! when definitions are reloaded, so lookups always see a complete
//! snapshot.

use crate::decode::Decoder;
use crate::error::{Error, Result};
use crate::mib::{self, FlatEntry, MibInfo};
use crate::oid::Oid;
use std::collections::{BTreeMap, HashMap};
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Metadata registered for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    name: Box<str>,
    offset: usize,
    decoder: Decoder,
}

impl Entry {
    /// Create an entry whose canonical name is `name[offset..]`.
    ///
    /// An offset outside `name` or not on a character boundary falls back
    /// to the whole name.
    pub fn new(name: impl Into<Box<str>>, offset: usize, decoder: Decoder) -> Self {
        let name = name.into();
        let offset = if name.is_char_boundary(offset) { offset } else { 0 };
        Self {
            name,
            offset,
            decoder,
        }
    }

    /// Canonical (usually module-less) name.
    pub fn name(&self) -> &str {
        &self.name[self.offset..]
    }

    /// Fully qualified name as registered.
    pub fn qualified_name(&self) -> &str {
        &self.name
    }

    /// Byte offset of [`Entry::name`] within [`Entry::qualified_name`].
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    entry: Option<Entry>,
    children: BTreeMap<u32, Node>,
}

/// Longest-prefix map from identifiers to [`Entry`] metadata, plus the
/// reverse name-to-identifier map used to resolve symbolic names.
#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    root: Node,
    names: HashMap<String, Oid>,
    len: usize,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a flat `name oid` file.
    pub fn from_flat_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut table = Self::new();
        table.extend_flat(mib::parse_flat(BufReader::new(file))?);
        Ok(table)
    }

    /// Build a table from a JSON [`MibInfo`] stream file.
    pub fn from_mib_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut table = Self::new();
        for info in mib::parse_json_stream(BufReader::new(file))? {
            table.register(&info)?;
        }
        Ok(table)
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register `entry` at `oid`, returning any entry it replaced.
    pub fn insert(&mut self, oid: &Oid, entry: Entry) -> Option<Entry> {
        let mut node = &mut self.root;
        for arc in oid.arcs() {
            node = node.children.entry(*arc).or_default();
        }
        let previous = node.entry.replace(entry);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Find the most specific registered ancestor of `oid` (inclusive).
    ///
    /// Returns the entry and the arcs of `oid` beyond the matched prefix.
    ///
    /// ```
    /// use snmp_poller::decode::Decoder;
    /// use snmp_poller::oid;
    /// use snmp_poller::table::{Entry, IdentifierTable};
    ///
    /// let mut table = IdentifierTable::new();
    /// table.insert(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2), Entry::new("ifDescr", 0, Decoder::Native));
    ///
    /// let row = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 7);
    /// let (entry, suffix) = table.lookup(&row).unwrap();
    /// assert_eq!(entry.name(), "ifDescr");
    /// assert_eq!(suffix, &[7]);
    /// assert!(table.lookup(&oid!(1, 3, 6, 1, 4)).is_none());
    /// ```
    pub fn lookup<'t, 'o>(&'t self, oid: &'o Oid) -> Option<(&'t Entry, &'o [u32])> {
        let arcs = oid.arcs();
        let mut node = &self.root;
        let mut best = node.entry.as_ref().map(|e| (e, 0));
        for (depth, arc) in arcs.iter().enumerate() {
            match node.children.get(arc) {
                Some(child) => {
                    node = child;
                    if let Some(e) = &node.entry {
                        best = Some((e, depth + 1));
                    }
                }
                None => break,
            }
        }
        best.map(|(e, matched)| (e, &arcs[matched..]))
    }

    /// Identifier registered under a symbolic name.
    pub fn oid_for(&self, name: &str) -> Option<&Oid> {
        self.names.get(name)
    }

    /// Resolve a dotted or symbolic identifier.
    ///
    /// Strings starting with a dot or digit are parsed as dotted; anything
    /// else must be a registered name.
    pub fn resolve(&self, name: &str) -> Result<Oid> {
        if Oid::is_dotted(name) {
            return Oid::parse(name);
        }
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownName(name.into()).boxed())
    }

    /// Register a structured schema record.
    ///
    /// The module qualifier is dropped from the canonical name unless the
    /// short name is already taken, in which case the qualified name is
    /// used. The decoder is selected from the record's syntax and hint.
    pub fn register(&mut self, info: &MibInfo) -> Result<()> {
        let oid = Oid::parse(&info.oid)?;
        let short = info.short_name();
        let mut offset = info.short_offset();
        if self.names.contains_key(short) {
            tracing::debug!(target: "snmp_poller::table", { name = short, qualified = %info.name }, "duplicate short name, using qualified name");
            offset = 0;
        } else {
            self.names.insert(short.to_string(), oid.clone());
        }
        if offset > 0 {
            self.names.entry(info.name.clone()).or_insert_with(|| oid.clone());
        }
        let decoder = Decoder::select(&info.syntax, &info.hint);
        self.insert(&oid, Entry::new(info.name.as_str(), offset, decoder));
        Ok(())
    }

    /// Register flat `name oid` pairs with native decoding.
    pub fn extend_flat(&mut self, entries: impl IntoIterator<Item = FlatEntry>) {
        for FlatEntry { name, oid } in entries {
            self.insert(&oid, Entry::new(name.as_str(), 0, Decoder::Native));
            self.names.insert(name, oid);
        }
    }
}

/// Owner of the current identifier table.
///
/// Cloning a `Registry` shares the same table. Each poll session takes a
/// [`snapshot`](Registry::snapshot) and keeps it for the session's
/// lifetime; [`replace`](Registry::replace) affects sessions started after
/// the swap.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    current: Arc<RwLock<Arc<IdentifierTable>>>,
}

impl Registry {
    pub fn new(table: IdentifierTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// The table as of now.
    pub fn snapshot(&self) -> Arc<IdentifierTable> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a complete new table, returning the previous one.
    pub fn replace(&self, table: IdentifierTable) -> Arc<IdentifierTable> {
        let entries = table.len();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, Arc::new(table));
        tracing::info!(target: "snmp_poller::table", { entries }, "identifier table replaced");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn info(name: &str, oid: &str, syntax: &str) -> MibInfo {
        MibInfo {
            name: name.into(),
            oid: oid.into(),
            syntax: syntax.into(),
            ..Default::default()
        }
    }

    fn system_table() -> IdentifierTable {
        let mut t = IdentifierTable::new();
        t.extend_flat([
            FlatEntry {
                name: "sysName".into(),
                oid: oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
            },
            FlatEntry {
                name: "sysUpTime".into(),
                oid: oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
            },
        ]);
        t
    }

    #[test]
    fn exact_match_has_empty_suffix() {
        let t = system_table();
        let target = Oid::parse(".1.3.6.1.2.1.1.5.0").unwrap();
        let (entry, suffix) = t.lookup(&target).unwrap();
        assert_eq!(entry.name(), "sysName");
        assert!(suffix.is_empty());
    }

    #[test]
    fn unregistered_branch_is_not_found() {
        let t = system_table();
        let target = Oid::parse(".1.3.6.1.2.1.1.9.1.3.6").unwrap();
        assert!(t.lookup(&target).is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let mut t = IdentifierTable::new();
        t.insert(&oid!(1, 3, 6, 1, 2, 1, 2), Entry::new("interfaces", 0, Decoder::Native));
        t.insert(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10), Entry::new("ifInOctets", 0, Decoder::Counter32));

        let deep = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 3);
        let (entry, suffix) = t.lookup(&deep).unwrap();
        assert_eq!(entry.name(), "ifInOctets");
        assert_eq!(suffix, &[3]);

        let sibling = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 11, 3);
        let (entry, suffix) = t.lookup(&sibling).unwrap();
        assert_eq!(entry.name(), "interfaces");
        assert_eq!(suffix, &[2, 1, 11, 3]);
    }

    #[test]
    fn matching_is_per_arc() {
        let mut t = IdentifierTable::new();
        t.insert(&oid!(1, 3, 6, 1, 2, 1, 1, 1), Entry::new("sysDescr", 0, Decoder::Native));
        assert!(t.lookup(&oid!(1, 3, 6, 1, 2, 1, 1, 10, 0)).is_none());
    }

    #[test]
    fn insert_replaces_and_counts_once() {
        let mut t = IdentifierTable::new();
        assert!(t.insert(&oid!(1, 2), Entry::new("a", 0, Decoder::Native)).is_none());
        let old = t.insert(&oid!(1, 2), Entry::new("b", 0, Decoder::Native));
        assert_eq!(old.map(|e| e.name().to_string()), Some("a".to_string()));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn register_strips_module_and_selects_decoder() {
        let mut t = IdentifierTable::new();
        t.register(&info("IF-MIB::ifHCInOctets", "1.3.6.1.2.1.31.1.1.1.6", "Counter64"))
            .unwrap();
        let target = oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6, 2);
        let (entry, _) = t.lookup(&target).unwrap();
        assert_eq!(entry.name(), "ifHCInOctets");
        assert_eq!(entry.qualified_name(), "IF-MIB::ifHCInOctets");
        assert_eq!(entry.decoder(), &Decoder::Counter64);
        assert_eq!(
            t.resolve("ifHCInOctets").unwrap(),
            oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6)
        );
        assert!(t.resolve("IF-MIB::ifHCInOctets").is_ok());
    }

    #[test]
    fn duplicate_short_name_uses_qualified_name() {
        let mut t = IdentifierTable::new();
        t.register(&info("A-MIB::status", ".1.3.6.1.4.1.1.1", "")).unwrap();
        t.register(&info("B-MIB::status", ".1.3.6.1.4.1.2.1", "")).unwrap();

        let (first, _) = t.lookup(&oid!(1, 3, 6, 1, 4, 1, 1, 1)).unwrap();
        let (second, _) = t.lookup(&oid!(1, 3, 6, 1, 4, 1, 2, 1)).unwrap();
        assert_eq!(first.name(), "status");
        assert_eq!(second.name(), "B-MIB::status");
        assert_eq!(t.resolve("status").unwrap(), oid!(1, 3, 6, 1, 4, 1, 1, 1));
    }

    #[test]
    fn resolve_dotted_and_unknown() {
        let t = system_table();
        assert_eq!(t.resolve(".1.3.6").unwrap(), oid!(1, 3, 6));
        assert_eq!(t.resolve("sysName").unwrap(), oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
        let err = t.resolve("sysBogus").unwrap_err();
        assert!(matches!(&*err, Error::UnknownName(n) if &**n == "sysBogus"));
        assert!(t.resolve("1.3.x").is_err());
    }

    #[test]
    fn registry_swap_keeps_old_snapshot() {
        let registry = Registry::new(system_table());
        let before = registry.snapshot();
        registry.replace(IdentifierTable::new());
        assert_eq!(before.len(), 2);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn entry_offset_out_of_range_falls_back() {
        let e = Entry::new("abc", 10, Decoder::Native);
        assert_eq!(e.name(), "abc");
        assert_eq!(e.offset(), 0);
    }

    #[test]
    fn entry_outlives_temporary_identifier() {
        let table = system_table();
        let entry = table
            .lookup(&Oid::parse(".1.3.6.1.2.1.1.5.0").unwrap())
            .map(|(entry, _)| entry)
            .unwrap();
        assert_eq!(entry.name(), "sysName");
    }
}
