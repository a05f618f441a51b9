//! Doctext - document text-extraction pipeline.
//!
//! Turns raw document bytes (principally PDF) into plain text through a
//! three-tier chain: persistent cache, remote OCR provider, local fallback
//! extraction. Only remote-provider results are ever cached; low-confidence
//! local output is returned to the caller but never persisted.

pub mod analyzer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod identity;
pub mod local;
pub mod models;
pub mod remote;
