//! Media compression queue.
//!
//! Files discovered under an input tree become durable pending jobs; a
//! single background worker compresses each with an external tool and
//! broadcasts every state change to registered observers.

pub mod broadcast;
pub mod compressor;
pub mod config;
pub mod error;
pub mod media;
pub mod query;
pub mod queue;
pub mod store;
pub mod utils;
