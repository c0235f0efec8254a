//! Value decoders.
//!
//! Each identifier table entry carries a [`Decoder`] chosen once, when the
//! entry is built, from the schema's declared syntax and display hint. At
//! poll time the decoder turns a raw [`Value`] into a [`Reading`] without
//! any further inspection of the schema.
//!
//! This module also holds the helpers shared by the column cache and tag
//! composer: [`clean_string`] and [`index_words`].

use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, LazyLock};

/// Display hint identifying the SNMPv2-TC DateAndTime textual convention.
pub const DATE_AND_TIME_HINT: &str = "2d-1d-1d,1d:1d:1d.1d,1a1d:1d";

/// Enumeration / bit labels keyed by numeric value or bit position.
pub type Labels = BTreeMap<i64, Box<str>>;

static LABEL_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z]+)\s*\{(.*)\}").expect("label list pattern is valid")
});
static LABEL_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z][a-zA-Z0-9-]*)\((-?[0-9]+)\)").expect("label item pattern is valid")
});

/// How a raw value is turned into a [`Reading`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoder {
    /// Dispatch on the value's own protocol type.
    Native,
    /// INTEGER / Integer32.
    Integer,
    /// Counter32, normalized to unsigned regardless of transport signedness.
    Counter32,
    /// Counter64, normalized to unsigned regardless of transport signedness.
    Counter64,
    /// OCTET STRING: cleaned then sniffed for numbers.
    OctetString,
    /// IpAddress.
    IpAddress,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier,
    /// INTEGER with named values, rendered as the label.
    Enumerated(Arc<Labels>),
    /// BITS with named positions, rendered as a comma-separated label list.
    Bits(Arc<Labels>),
    /// SNMPv2-TC DateAndTime (8 or 11 octets).
    DateAndTime,
}

impl Decoder {
    /// Pick the decoder for a schema record.
    ///
    /// The DateAndTime hint wins over everything; labelled `INTEGER {..}` or
    /// `BITS {..}` syntaxes select label decoders; a bare base-type keyword
    /// selects that type's decoder; anything else dispatches natively.
    ///
    /// ```
    /// use snmp_poller::decode::Decoder;
    ///
    /// assert_eq!(Decoder::select("Counter64", ""), Decoder::Counter64);
    /// assert!(matches!(Decoder::select("INTEGER {up(1), down(2)}", ""), Decoder::Enumerated(_)));
    /// assert_eq!(Decoder::select("Gauge32", ""), Decoder::Native);
    /// ```
    pub fn select(syntax: &str, hint: &str) -> Self {
        if hint == DATE_AND_TIME_HINT {
            return Decoder::DateAndTime;
        }
        if let Some((kind, labels)) = parse_labels(syntax) {
            match kind.as_str() {
                "BITS" => return Decoder::Bits(Arc::new(labels)),
                "INTEGER" => return Decoder::Enumerated(Arc::new(labels)),
                _ => {}
            }
        }
        let syntax = syntax.trim();
        let keyword = |k: &str| {
            syntax == k
                || syntax
                    .strip_prefix(k)
                    .is_some_and(|rest| rest.starts_with([' ', '(']))
        };
        if keyword("Counter32") {
            Decoder::Counter32
        } else if keyword("Counter64") {
            Decoder::Counter64
        } else if keyword("INTEGER") || keyword("Integer32") {
            Decoder::Integer
        } else if keyword("OCTET STRING") || keyword("DisplayString") || keyword("SnmpAdminString")
        {
            Decoder::OctetString
        } else if keyword("IpAddress") {
            Decoder::IpAddress
        } else if keyword("OBJECT IDENTIFIER") {
            Decoder::ObjectIdentifier
        } else {
            Decoder::Native
        }
    }

    /// Decode a raw value for the named object.
    pub fn decode(&self, name: &str, value: &Value) -> Result<Reading> {
        match self {
            Decoder::Native => decode_native(name, value),
            Decoder::Integer => match value {
                Value::Integer(v) => Ok(Reading::Integer(i64::from(*v))),
                other => Err(mismatch(name, "Integer", other)),
            },
            Decoder::Counter32 => decode_counter32(name, value),
            Decoder::Counter64 => decode_counter64(name, value),
            Decoder::OctetString => match value {
                Value::OctetString(data) => Ok(sniff_octets(data)),
                other => Err(mismatch(name, "OctetString", other)),
            },
            Decoder::IpAddress => match value {
                Value::IpAddress(addr) => Ok(Reading::IpAddress(Ipv4Addr::from(*addr))),
                other => Err(mismatch(name, "IpAddress", other)),
            },
            Decoder::ObjectIdentifier => match value {
                Value::ObjectIdentifier(oid) => Ok(Reading::Oid(oid.clone())),
                other => Err(mismatch(name, "ObjectIdentifier", other)),
            },
            Decoder::Enumerated(labels) => match value {
                Value::Integer(v) => labels
                    .get(&i64::from(*v))
                    .map(|label| Reading::Text(label.to_string()))
                    .ok_or_else(|| Error::decode(name, format!("no label found for index:{}", v))),
                other => Err(mismatch(name, "Integer", other)),
            },
            Decoder::Bits(labels) => match value {
                Value::OctetString(data) => decode_bits(name, labels, data),
                other => Err(mismatch(name, "OctetString", other)),
            },
            Decoder::DateAndTime => match value {
                Value::OctetString(data) => decode_date_and_time(data)
                    .map(Reading::Time)
                    .ok_or_else(|| {
                        Error::decode(name, format!("invalid DateAndTime of {} octets", data.len()))
                    }),
                other => Err(mismatch(name, "OctetString", other)),
            },
        }
    }
}

fn mismatch(name: &str, expected: &str, got: &Value) -> Box<Error> {
    Error::decode(name, format!("expected {}, got {}", expected, got.type_name()))
}

fn decode_native(name: &str, value: &Value) -> Result<Reading> {
    match value {
        Value::Integer(v) => Ok(Reading::Integer(i64::from(*v))),
        Value::Gauge32(v) | Value::TimeTicks(v) => Ok(Reading::Unsigned(u64::from(*v))),
        Value::Counter32(v) => Ok(Reading::Counter32(*v)),
        Value::Counter64(v) => Ok(Reading::Counter64(*v)),
        Value::IpAddress(addr) => Ok(Reading::IpAddress(Ipv4Addr::from(*addr))),
        Value::ObjectIdentifier(oid) => Ok(Reading::Oid(oid.clone())),
        Value::OctetString(data) => Ok(sniff_octets(data)),
        other => Err(Error::decode(
            name,
            format!("unsupported type: {}", other.type_name()),
        )),
    }
}

fn decode_counter32(name: &str, value: &Value) -> Result<Reading> {
    match value {
        Value::Counter32(v) | Value::Gauge32(v) => Ok(Reading::Counter32(*v)),
        Value::Integer(v) => Ok(Reading::Counter32(*v as u32)),
        other => Err(mismatch(name, "Counter32", other)),
    }
}

fn decode_counter64(name: &str, value: &Value) -> Result<Reading> {
    match value {
        Value::Counter64(v) => Ok(Reading::Counter64(*v)),
        Value::Counter32(v) | Value::Gauge32(v) => Ok(Reading::Counter64(u64::from(*v))),
        Value::Integer(v) => Ok(Reading::Counter64(i64::from(*v) as u64)),
        other => Err(mismatch(name, "Counter64", other)),
    }
}

fn decode_bits(name: &str, labels: &Labels, data: &[u8]) -> Result<Reading> {
    let mut names = Vec::new();
    for (byte_idx, byte) in data.iter().enumerate() {
        for bit in 0..8 {
            if byte & (0x80 >> bit) != 0 {
                let position = (byte_idx * 8 + bit) as i64;
                match labels.get(&position) {
                    Some(label) => names.push(&**label),
                    None => {
                        return Err(Error::decode(
                            name,
                            format!("no label found for index:{}", position),
                        ));
                    }
                }
            }
        }
    }
    Ok(Reading::Text(names.join(",")))
}

/// Decode an 8 or 11 octet DateAndTime.
///
/// The 8 octet form carries no zone and is taken as UTC.
pub fn decode_date_and_time(data: &[u8]) -> Option<DateTime<FixedOffset>> {
    if data.len() != 8 && data.len() != 11 {
        return None;
    }
    let year = i32::from(u16::from_be_bytes([data[0], data[1]]));
    let date = NaiveDate::from_ymd_opt(year, u32::from(data[2]), u32::from(data[3]))?;
    let naive = date.and_hms_milli_opt(
        u32::from(data[4]),
        u32::from(data[5]),
        u32::from(data[6]),
        u32::from(data[7]) * 100,
    )?;

    let offset_secs = if data.len() == 11 {
        let magnitude = i32::from(data[9]) * 3600 + i32::from(data[10]) * 60;
        match data[8] {
            b'+' => magnitude,
            b'-' => -magnitude,
            _ => return None,
        }
    } else {
        0
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    naive.and_local_timezone(offset).single()
}

/// Reduce raw octets to their printable characters.
///
/// Invalid UTF-8 sequences become U+FFFD, which is kept; control and
/// non-space whitespace characters are dropped.
///
/// ```
/// use snmp_poller::decode::clean_string;
///
/// assert_eq!(clean_string(b"eth0\0\r\n"), "eth0");
/// assert_eq!(clean_string(b"Gi 0/1"), "Gi 0/1");
/// ```
pub fn clean_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .chars()
        .filter(|c| *c == ' ' || !(c.is_control() || c.is_whitespace()))
        .collect()
}

/// Clean an octet string and reinterpret it as a number when it is one.
///
/// Floats are tried first, then integers with a `0x`/`0o`/`0b` or leading
/// zero radix prefix; anything else stays text.
pub fn sniff_octets(data: &[u8]) -> Reading {
    let s = clean_string(data);
    if let Ok(f) = s.parse::<f64>() {
        return Reading::Float(f);
    }
    if let Some(i) = parse_prefixed_int(&s) {
        return Reading::Integer(i);
    }
    Reading::Text(s)
}

fn parse_prefixed_int(s: &str) -> Option<i64> {
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d, true)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d, true)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..], true)
    } else {
        (10, lower.as_str(), false)
    };
    // a single underscore may follow a radix prefix or sit between digits
    let digits = if prefixed {
        digits.strip_prefix('_').unwrap_or(digits)
    } else {
        digits
    };
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i128::from_str_radix(&digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

/// Parse a labelled syntax such as `BITS {sunday(0), monday(1)}`.
///
/// Returns the base kind and its labels, or `None` when the syntax carries
/// no label list.
pub fn parse_labels(syntax: &str) -> Option<(String, Labels)> {
    let caps = LABEL_LIST.captures(syntax)?;
    let kind = caps.get(1)?.as_str().to_string();
    let body = caps.get(2)?.as_str();
    let labels = LABEL_ITEM
        .captures_iter(body)
        .filter_map(|c| {
            let value = c.get(2)?.as_str().parse().ok()?;
            Some((value, c.get(1)?.as_str().into()))
        })
        .collect();
    Some((kind, labels))
}

/// Split a table index suffix into length-prefixed words.
///
/// Each arc `n` is a length prefix for the following `n` arcs, which are
/// read as octets of one word. A length that runs past the end of the
/// suffix yields a truncated final word.
///
/// ```
/// use snmp_poller::decode::index_words;
///
/// // "ab" then "c"
/// assert_eq!(index_words(&[2, 97, 98, 1, 99]), vec!["ab", "c"]);
/// ```
pub fn index_words(suffix: &[u32]) -> Vec<String> {
    let mut words = Vec::new();
    let mut i = 0usize;
    while i < suffix.len() {
        let count = suffix[i] as usize;
        let end = i.saturating_add(count).saturating_add(1).min(suffix.len());
        let octets: Vec<u8> = suffix[i + 1..end].iter().map(|arc| *arc as u8).collect();
        words.push(clean_string(&octets));
        i = i.saturating_add(count).saturating_add(1);
    }
    words
}
