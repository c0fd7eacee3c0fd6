//! ipam: hierarchical IPv4 address management
//!
//! Domains are trees of CIDR allocations whose levels follow a named schema
//! template (e.g. Region > City). The [`domain`] layer enforces the tree's
//! structural rules, [`application`] services persist schemas and domains in
//! a key-value store with optimistic versioning, and [`cli`] is the command
//! line front end.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
