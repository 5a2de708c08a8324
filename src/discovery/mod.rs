//! Discovery-side plumbing: per-query guardrails, the SNMP OID namespace
//! collectors walk, and walk-row normalization into tables the topology
//! correlator understands.

pub mod guardrails;
pub mod oids;
pub mod snmp;
