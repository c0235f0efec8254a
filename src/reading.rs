//! Decoded sample values.
//!
//! A [`Reading`] is what a [`Decoder`](crate::decode::Decoder) produces from a
//! raw [`Value`](crate::Value) and what every [`Sender`](crate::sender::Sender)
//! stage receives.

use crate::oid::Oid;
use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::net::Ipv4Addr;

/// A typed, decoded sample value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// Signed integer (INTEGER, or a number sniffed out of an octet string).
    Integer(i64),
    /// Non-wrapping unsigned value (Gauge32, Unsigned32, TimeTicks).
    Unsigned(u64),
    /// Wrapping 32-bit counter.
    Counter32(u32),
    /// Wrapping 64-bit counter.
    Counter64(u64),
    /// Floating point value (rates, or numbers sniffed out of octet strings).
    Float(f64),
    /// Printable text, or an enumeration label.
    Text(String),
    /// IPv4 address.
    IpAddress(Ipv4Addr),
    /// Object identifier value.
    Oid(Oid),
    /// Calendar timestamp (DateAndTime).
    Time(DateTime<FixedOffset>),
}

impl Reading {
    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Reading::Integer(_) => "integer",
            Reading::Unsigned(_) => "unsigned",
            Reading::Counter32(_) => "counter32",
            Reading::Counter64(_) => "counter64",
            Reading::Float(_) => "float",
            Reading::Text(_) => "text",
            Reading::IpAddress(_) => "ipaddress",
            Reading::Oid(_) => "oid",
            Reading::Time(_) => "time",
        }
    }

    /// Normalize to an unsigned 64-bit counter value.
    ///
    /// Negative integers wrap as a two's complement cast. Returns `None`
    /// for readings that are not integral.
    ///
    /// ```
    /// use snmp_poller::Reading;
    ///
    /// assert_eq!(Reading::Counter32(7).as_counter(), Some(7));
    /// assert_eq!(Reading::Integer(-1).as_counter(), Some(u64::MAX));
    /// assert_eq!(Reading::Text("x".into()).as_counter(), None);
    /// ```
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            Reading::Integer(v) => Some(*v as u64),
            Reading::Unsigned(v) | Reading::Counter64(v) => Some(*v),
            Reading::Counter32(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    /// Convert any integral reading to a signed 64-bit integer.
    ///
    /// Unsigned values above `i64::MAX` wrap, matching a plain two's
    /// complement cast.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Reading::Integer(v) => Some(*v),
            Reading::Unsigned(v) | Reading::Counter64(v) => Some(*v as i64),
            Reading::Counter32(v) => Some(i64::from(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Integer(v) => write!(f, "{}", v),
            Reading::Unsigned(v) | Reading::Counter64(v) => write!(f, "{}", v),
            Reading::Counter32(v) => write!(f, "{}", v),
            Reading::Float(v) => write!(f, "{}", v),
            Reading::Text(s) => f.write_str(s),
            Reading::IpAddress(ip) => write!(f, "{}", ip),
            Reading::Oid(oid) => f.write_str(&oid.dotted()),
            Reading::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<i64> for Reading {
    fn from(v: i64) -> Self {
        Reading::Integer(v)
    }
}

impl From<f64> for Reading {
    fn from(v: f64) -> Self {
        Reading::Float(v)
    }
}

impl From<&str> for Reading {
    fn from(s: &str) -> Self {
        Reading::Text(s.to_string())
    }
}
