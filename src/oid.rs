//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.
//! Management tooling conventionally writes them with a leading dot
//! (`.1.3.6.1.2.1.1.5.0`); both forms parse to the same value.

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Stored as a sequence of arc values (u32). Uses SmallVec to avoid
/// heap allocation for OIDs with 16 or fewer arcs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use snmp_poller::oid::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1]);
    /// assert_eq!(oid.len(), 4);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted notation.
    ///
    /// A single leading dot is accepted and ignored. Empty segments anywhere
    /// else, non-numeric arcs and OIDs longer than [`MAX_OID_LEN`] are rejected.
    ///
    /// ```
    /// use snmp_poller::oid::Oid;
    ///
    /// let a = Oid::parse(".1.3.6.1.2.1.1.5.0").unwrap();
    /// let b = Oid::parse("1.3.6.1.2.1.1.5.0").unwrap();
    /// assert_eq!(a, b);
    /// assert!(Oid::parse("1.3..6").is_err());
    /// assert!(Oid::parse("ifDescr").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            let arc: u32 = part
                .parse()
                .map_err(|_| Error::InvalidOid(s.into()).boxed())?;
            arcs.push(arc);
        }

        if arcs.len() > MAX_OID_LEN {
            return Err(Error::InvalidOid(
                format!("{} has {} arcs (max {})", s, arcs.len(), MAX_OID_LEN).into(),
            )
            .boxed());
        }

        Ok(Self { arcs })
    }

    /// Whether a string looks like a dotted numeric identifier rather than
    /// a symbolic name.
    pub fn is_dotted(s: &str) -> bool {
        s.starts_with('.') || s.starts_with(|c: char| c.is_ascii_digit())
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// Comparison is per arc, so `1.3.6.1.10` does not start with `1.3.6.1.1`.
    ///
    /// ```
    /// use snmp_poller::oid;
    ///
    /// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
    /// assert!(sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1)));
    /// assert!(!oid!(1, 3, 6, 1, 10).starts_with(&oid!(1, 3, 6, 1, 1)));
    /// ```
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// The arcs following `prefix`, or `None` when `prefix` is not an ancestor.
    pub fn suffix_after(&self, prefix: &Oid) -> Option<&[u32]> {
        if self.starts_with(prefix) {
            Some(&self.arcs[prefix.len()..])
        } else {
            None
        }
    }

    /// Get the parent OID (all arcs except the last).
    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(Oid::from_slice(&self.arcs[..self.arcs.len() - 1]))
        }
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Render with the conventional leading dot (`.1.3.6.1`).
    pub fn dotted(&self) -> String {
        format!(".{}", self)
    }
}

/// Join arcs with dots, without a leading dot (`1.2.3`).
///
/// This is the form used for table-index suffixes.
pub fn join_arcs(arcs: &[u32]) -> String {
    let mut out = String::with_capacity(arcs.len() * 3);
    for (i, arc) in arcs.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&arc.to_string());
    }
    out
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_arcs(&self.arcs))
    }
}

impl std::str::FromStr for Oid {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

impl serde::Serialize for Oid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.dotted())
    }
}

impl<'de> serde::Deserialize<'de> for Oid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Macro to create an OID at compile time.
///
/// ```
/// use snmp_poller::oid;
///
/// let sys_name = oid!(1, 3, 6, 1, 2, 1, 1, 5, 0);
/// assert_eq!(sys_name.dotted(), ".1.3.6.1.2.1.1.5.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn test_parse_leading_dot() {
        let oid = Oid::parse(".1.3.6.1.2.1.31.1.1.1.1").unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1));
        assert!(Oid::parse(".").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Oid::parse("1.3.abc.1").is_err());
        assert!(Oid::parse("1.3.-6.1").is_err());
        assert!(Oid::parse("..1.3").is_err());
        assert!(Oid::parse("1.3.").is_err());
    }

    #[test]
    fn test_parse_enforces_max_len() {
        let long = (0..=MAX_OID_LEN).map(|_| "1").collect::<Vec<_>>().join(".");
        assert!(Oid::parse(&long).is_err());
    }

    #[test]
    fn test_display_and_dotted() {
        let oid = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
        assert_eq!(oid.dotted(), ".1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn test_starts_with_is_arc_wise() {
        let oid = Oid::parse("1.3.6.1.2.1.1.10.0").unwrap();
        assert!(oid.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1)));
        assert!(!oid.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1, 1)));
    }

    #[test]
    fn test_suffix_after() {
        let oid = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 7);
        let column = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10);
        assert_eq!(oid.suffix_after(&column), Some(&[7u32][..]));
        assert_eq!(oid.suffix_after(&oid!(1, 3, 6, 1, 4)), None);
    }

    #[test]
    fn test_is_dotted() {
        assert!(Oid::is_dotted(".1.3.6"));
        assert!(Oid::is_dotted("1.3.6"));
        assert!(!Oid::is_dotted("ifEntry"));
        assert!(!Oid::is_dotted(""));
    }

    #[test]
    fn test_join_arcs() {
        assert_eq!(join_arcs(&[]), "");
        assert_eq!(join_arcs(&[4, 101, 116]), "4.101.116");
    }

    #[test]
    fn test_parent_child() {
        let system = oid!(1, 3, 6, 1, 2, 1, 1);
        assert_eq!(system.child(5).parent().unwrap(), system);
        assert!(Oid::empty().parent().is_none());
    }

    #[test]
    fn test_oid_fromstr_roundtrip() {
        let original = oid!(1, 3, 6, 1, 4, 1, 9, 9, 42);
        let parsed: Oid = original.dotted().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
