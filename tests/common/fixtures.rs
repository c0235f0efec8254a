//! Standard test fixtures with realistic MIB data.

use snmp_poller::mib::MibInfo;
use snmp_poller::transport::MockConnector;
use snmp_poller::{IdentifierTable, Oid, Registry, Value, oid};
use std::collections::BTreeMap;

// =============================================================================
// OID helpers
// =============================================================================

pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}

pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}

/// IF-MIB::ifName column.
pub fn if_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1)
}

/// IF-MIB::ifHCInOctets column.
pub fn if_hc_in_octets() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6)
}

fn if_alias() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 18)
}

fn if_oper_status() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8)
}

// =============================================================================
// Agent data fixtures (for MockConnector)
// =============================================================================

/// System group scalars (1.3.6.1.2.1.1).
pub fn system_mib() -> BTreeMap<Oid, Value> {
    let mut data = BTreeMap::new();
    data.insert(
        oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        Value::OctetString("Test SNMP Agent".into()),
    );
    data.insert(sys_uptime(), Value::TimeTicks(123456));
    data.insert(sys_name(), Value::OctetString("test-agent".into()));
    data
}

/// Interface rows: (index, name, alias, oper status, in octets).
///
/// Interface 3 is operationally down.
pub fn interface_table() -> BTreeMap<Oid, Value> {
    let rows = [
        (1, "lo", "", 1, 1_000u64),
        (2, "eth0", "uplink", 1, 50_000),
        (3, "eth1", "spare", 2, 0),
    ];
    let mut data = BTreeMap::new();
    for (idx, name, alias, status, octets) in rows {
        data.insert(if_name().child(idx), Value::OctetString(name.into()));
        data.insert(if_alias().child(idx), Value::OctetString(alias.into()));
        data.insert(if_oper_status().child(idx), Value::Integer(status));
        data.insert(if_hc_in_octets().child(idx), Value::Counter64(octets));
    }
    data
}

/// Agent serving both the system group and the interface rows.
pub fn interface_agent() -> MockConnector {
    MockConnector::with_data(system_mib().into_iter().chain(interface_table()))
}

// =============================================================================
// Identifier table fixtures
// =============================================================================

fn record(name: &str, oid: &str, syntax: &str) -> MibInfo {
    MibInfo {
        name: name.into(),
        oid: oid.into(),
        syntax: syntax.into(),
        ..Default::default()
    }
}

/// Table covering the system group and the ifXTable columns used above.
pub fn identifier_table() -> IdentifierTable {
    let mut table = IdentifierTable::new();
    for info in [
        record("SNMPv2-MIB::sysDescr", ".1.3.6.1.2.1.1.1", "DisplayString"),
        record("SNMPv2-MIB::sysUpTime", ".1.3.6.1.2.1.1.3", "TimeTicks"),
        record("SNMPv2-MIB::sysName", ".1.3.6.1.2.1.1.5", "DisplayString"),
        record("IF-MIB::ifXTable", ".1.3.6.1.2.1.31.1.1", "SEQUENCE OF IfXEntry"),
        record("IF-MIB::ifName", ".1.3.6.1.2.1.31.1.1.1.1", "DisplayString"),
        record("IF-MIB::ifHCInOctets", ".1.3.6.1.2.1.31.1.1.1.6", "Counter64"),
        record("IF-MIB::ifAlias", ".1.3.6.1.2.1.31.1.1.1.18", "DisplayString"),
        record(
            "IF-MIB::ifOperStatus",
            ".1.3.6.1.2.1.2.2.1.8",
            "INTEGER {up(1), down(2), testing(3)}",
        ),
    ] {
        table.register(&info).unwrap();
    }
    table
}

pub fn registry() -> Registry {
    Registry::new(identifier_table())
}
