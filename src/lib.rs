//! llmbox - sandboxed file access and LLM call brokering for a command-line
//! assistant.
//!
//! Three subsystems compose, leaves first: the VFS [`server`] daemon that
//! owns all filesystem access behind path allowlists, the VFS [`client`]
//! proxy that maps logical names to opaque handles, and the LLM [`broker`]
//! that serializes provider calls under a shared quota.

pub mod broker;
pub mod client;
pub mod config;
pub mod proto;
pub mod server;
pub mod session;
