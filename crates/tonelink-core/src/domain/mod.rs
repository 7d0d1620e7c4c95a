//! Transport-free domain types.
//!
//! # Sub-modules
//!
//! - **`state`** – The four-state connection machine and the atomic snapshot
//!   cell the service publishes it through.
//!
//! - **`peer`** – Identity of a remote peer as reported by the transport.
//!
//! - **`tones`** – The byte → note tables and the PCM tone synthesizer used
//!   by the downstream sound collaborator.

pub mod peer;
pub mod state;
pub mod tones;
