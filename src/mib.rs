//! Schema feed parsing.
//!
//! Two feeds populate the identifier table:
//!
//! - a flat text file of `name<whitespace>oid` lines, as produced by
//!   `snmptranslate -Tz -On`;
//! - a stream of concatenated JSON [`MibInfo`] objects carrying syntax and
//!   display hints, from which per-entry decoders are selected.
//!
//! Running the translation tool itself is out of scope; this module only
//! reads what it produced.

use crate::error::{Error, Result};
use crate::oid::Oid;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};

/// One schema record from the structured feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MibInfo {
    /// Qualified name, e.g. `IF-MIB::ifDescr`.
    pub name: String,
    /// Dotted identifier, with or without a leading dot.
    #[serde(rename = "OID")]
    pub oid: String,
    pub syntax: String,
    pub default: String,
    /// DISPLAY-HINT clause.
    pub hint: String,
    pub index: String,
    pub units: String,
    pub access: String,
    pub augments: String,
    pub status: String,
    pub description: String,
}

impl MibInfo {
    /// Byte offset of the short name within [`MibInfo::name`] (0 when unqualified).
    pub fn short_offset(&self) -> usize {
        match self.name.find("::") {
            Some(i) if i > 0 => i + 2,
            _ => 0,
        }
    }

    /// The name without its module qualifier.
    pub fn short_name(&self) -> &str {
        &self.name[self.short_offset()..]
    }

    /// Whether the record is marked obsolete.
    pub fn is_obsolete(&self) -> bool {
        self.status == "obsolete"
    }
}

/// A `name oid` pair from the flat feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub name: String,
    pub oid: Oid,
}

/// Parse the flat `name oid` feed.
///
/// Surrounding quotes are trimmed from both fields and lines with fewer
/// than two fields are skipped. A malformed identifier fails with
/// [`Error::Schema`] naming the 1-based line.
///
/// ```
/// use snmp_poller::mib::parse_flat;
///
/// let feed = "\"sysName\" \"1.3.6.1.2.1.1.5\"\n\nifDescr .1.3.6.1.2.1.2.2.1.2\n";
/// let entries = parse_flat(feed.as_bytes()).unwrap();
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].oid.dotted(), ".1.3.6.1.2.1.1.5");
/// ```
pub fn parse_flat(reader: impl BufRead) -> Result<Vec<FlatEntry>> {
    let mut entries = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let (Some(name), Some(oid)) = (fields.next(), fields.next()) else {
            continue;
        };
        let name = name.trim_matches('"');
        let oid = oid.trim_matches('"');
        let oid = Oid::parse(oid).map_err(|e| {
            Error::Schema {
                line: n + 1,
                message: e.to_string().into(),
            }
            .boxed()
        })?;
        entries.push(FlatEntry {
            name: name.to_string(),
            oid,
        });
    }
    tracing::debug!(target: "snmp_poller::mib", { entries = entries.len() }, "parsed flat OID feed");
    Ok(entries)
}

/// Parse a stream of concatenated JSON [`MibInfo`] objects.
///
/// Objects may be separated by any whitespace; pretty-printed output from
/// [`write_json_stream`] reads back unchanged.
pub fn parse_json_stream(reader: impl Read) -> Result<Vec<MibInfo>> {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<MibInfo>();
    let mut records = Vec::new();
    for record in stream {
        records.push(record?);
    }
    tracing::debug!(target: "snmp_poller::mib", { records = records.len() }, "parsed MIB info feed");
    Ok(records)
}

/// Write records as a pretty-printed JSON stream, skipping obsolete ones.
pub fn write_json_stream<'a>(
    mut writer: impl Write,
    records: impl IntoIterator<Item = &'a MibInfo>,
) -> Result<()> {
    for record in records.into_iter().filter(|r| !r.is_obsolete()) {
        serde_json::to_writer_pretty(&mut writer, record)?;
        writeln!(writer)?;
    }
    Ok(())
}
