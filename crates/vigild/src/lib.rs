//! vigild: the security monitoring daemon.
//!
//! Wires the reconciliation core to its external collaborators: a frame
//! source, a detection provider, the roster/environment/assignment
//! backend and an event sink.

pub mod acks;
pub mod config;
pub mod engine;
pub mod local;
pub mod roster;
pub mod sources;
