//! Shared test infrastructure for snmp-poller.
//!
//! Provides agent data fixtures, a populated identifier table, and tracing
//! setup.

// Allow dead code and unused imports since not all test files use all utilities
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;

pub use fixtures::{
    identifier_table, if_hc_in_octets, if_name, interface_agent, interface_table, registry,
    sys_name, sys_uptime, system_mib,
};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
