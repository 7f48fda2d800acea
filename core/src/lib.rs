#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Canonical in-memory entities shared by every stage of the
//! reconcile→translate→publish→status pipeline. Types here carry
//! `PartialEq`/`Eq` over every field that affects translation output, used
//! by the collections runtime to suppress redundant recomputation (spec
//! §4.1, §4.2).

pub mod backend;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod network;
pub mod policy;
pub mod resource;
pub mod route;
pub mod route_match;
pub mod secret;
pub mod snapshot;

pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};
