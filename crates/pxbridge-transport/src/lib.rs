//! Local transport for the pxbridge control channel.
//!
//! The host application listens on a Unix domain socket; the plugin side
//! opens one short-lived connection per request. This crate provides the
//! [`IpcStream`] type (a connected, timeout-capable byte stream) and
//! [`UnixDomainSocket`] for bind/accept (host or mock-host side) and
//! connect with a bounded wait (plugin side).

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
