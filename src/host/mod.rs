//! Host-Facing Collaborators
//!
//! The engine never talks to the hypervisor directly; it appends deltas to a
//! window tracker batch, and a separate collection pass serializes the batch
//! and pushes it through the transport.

pub mod proto;
pub mod tracker;
pub mod transport;
