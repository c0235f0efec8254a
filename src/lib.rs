//! # snmp-poller
//!
//! Adaptive SNMP table poller. Walks subtrees on a schedule, resolves every
//! returned identifier to a symbolic name, decodes and tags each value, and
//! pushes the samples through a composable output pipeline.
//!
//! ## Features
//!
//! - Longest-prefix identifier table built from flat `name oid` files or a
//!   JSON schema feed, with per-entry decoders chosen at build time
//! - Interface name, alias and operational state tagging, refreshed on a
//!   schedule
//! - Poll delay that backs off in whole minutes for slow devices
//! - Output stages for rates and deltas, tag stripping, name filtering,
//!   fan-out and diagnostics
//! - Transport-agnostic: bring any client that implements
//!   [`transport::Connector`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_poller::poller::Supervisor;
//! use snmp_poller::sender::{CalcSender, Collect, Recipe, StripSender};
//! use snmp_poller::transport::MockConnector;
//! use snmp_poller::{Criteria, IdentifierTable, Profile, Registry};
//! use std::collections::BTreeMap;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> snmp_poller::Result<()> {
//!     let table = IdentifierTable::from_mib_file("mibs.json")?;
//!     let supervisor = Supervisor::new(Registry::new(table));
//!
//!     let recipes = BTreeMap::from([(
//!         "ifHCInOctets".to_string(),
//!         Recipe::rate("ifInBytesPerSecond"),
//!     )]);
//!     let sender = CalcSender::new(StripSender::new(Collect::new(), ["oid"]), recipes);
//!
//!     let criteria = Criteria::new("ifXTable")
//!         .with_oid_tag(true)
//!         .with_freq(Duration::from_secs(60))
//!         .with_refresh(Duration::from_secs(3600));
//!     let agent = MockConnector::new();
//!     supervisor
//!         .start(&agent, &Profile::new("192.0.2.1"), &criteria, Some(Box::new(sender)), None)
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     supervisor.shutdown();
//!     supervisor.wait().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod criteria;
pub mod decode;
pub mod error;
pub mod mib;
pub mod oid;
pub mod poller;
pub mod profile;
pub mod reading;
pub mod sender;
pub mod table;
pub mod tags;
pub mod transport;
pub mod value;
pub mod varbind;

pub(crate) mod util;

// Re-exports for convenience
pub use criteria::{Criteria, Target};
pub use decode::Decoder;
pub use error::{Error, Result};
pub use mib::{FlatEntry, MibInfo};
pub use oid::Oid;
pub use poller::{ErrorHandler, PollSession, SessionHandle, Supervisor};
pub use profile::{
    Auth, AuthProtocol, CommunityVersion, ParseProtocolError, PrivProtocol, Profile,
    SecurityLevel, UsmAuth, UsmBuilder, Version,
};
pub use reading::Reading;
pub use sender::{Sender, TimeStamp};
pub use table::{Entry, IdentifierTable, Registry};
pub use tags::Tags;
pub use transport::{Connector, Session};
pub use value::Value;
pub use varbind::VarBind;
