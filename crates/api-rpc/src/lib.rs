//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server exposing job creation, inspection, manual advance
//! and the testing-service pingback.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
