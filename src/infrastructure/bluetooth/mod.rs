//! Bluetooth Module
//!
//! Peer discovery, link management and coordinate sync between the two
//! devices.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SessionService                        │
//! │  (state machine - SessionHandle is the game loop's API)  │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┬──────────────┐
//!         │             │             │              │
//!         ▼             ▼             ▼              ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐  ┌───────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │  │  Remote   │
//! │           │  │            │  │          │  │           │
//! │ - filter  │  │ - service  │  │ - UUIDs  │  │ - atomic  │
//! │ - timeout │  │ - attrs    │  │ - codec  │  │   axes    │
//! └─────┬─────┘  └─────┬──────┘  └──────────┘  └───────────┘
//!       │              │
//!       ▼              ▼
//! ┌─────────────────────────────┐
//! │     Transport (trait)       │
//! │  LoopbackRadio endpoints    │
//! └─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`transport`] - Radio capability trait shared by both roles
//! - [`loopback`] - In-memory radio implementing the trait
//! - [`protocol`] - Attribute layout and payload codec
//! - [`scanner`] - Peer discovery
//! - [`connection`] - Service and attribute resolution on a new link
//! - [`remote`] - Last decoded peer coordinate
//! - [`service`] - Session state machine

pub mod connection;
pub mod loopback;
pub mod protocol;
pub mod remote;
pub mod scanner;
pub mod service;
pub mod transport;

pub use loopback::{LoopbackRadio, LoopbackTransport};
pub use service::{PeerLink, SessionHandle, SessionService};
pub use transport::Transport;
