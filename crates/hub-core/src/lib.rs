//! # Personal Hub Core
//!
//! Runtime-free logic for Personal Hub: data models, the rule-based intent
//! classifier, the fuzzy name matcher, source adapter contracts, and the
//! context/briefing model used to prime the language model.
//!
//! This crate contains no tokio, reqwest, or filesystem I/O. Concrete
//! adapters, the concurrent aggregator, and the dispatcher live in the
//! `personal-hub` application crate.

pub mod context;
pub mod intent;
pub mod matcher;
pub mod models;
pub mod source;
pub mod summary;
