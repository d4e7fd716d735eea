// src/probe/mod.rs
mod connectivity;

pub use connectivity::{ConnectivityProber, ProbeResult};
