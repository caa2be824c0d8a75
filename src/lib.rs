//! `mailvault` — normalize MSG/EML/PST email containers into one
//! canonical model and export combined text, JSON and hash artifacts.
//!
//! This crate provides the core library: format adapters, the canonical
//! message model, the batch pipeline and the exporters. The binary wires
//! these to a CLI and a line-delimited JSON-RPC service.

pub mod adapter;
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod hash;
pub mod model;
pub mod progress;
pub mod readpst;
pub mod rpc;
