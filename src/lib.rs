//! SNMP v1/v2c protocol stack.
//!
//! - [`oid`] and [`ber`]: OID and BER/X.690 codecs
//! - [`value`], [`varbind`], [`pdu`], [`message`]: typed protocol data units
//! - [`Session`]: one peer, one outstanding request, retry on timeout
//! - [`Dispatcher`]: many peers driven concurrently over one readiness wait
//! - [`Walk`] / [`BulkWalk`]: lazy subtree enumeration with GETNEXT / GETBULK
//!
//! # Example
//!
//! ```rust,no_run
//! use snmp_session::{Session, oid};
//! use std::time::Duration;
//!
//! # async fn example() -> snmp_session::Result<()> {
//! let session = Session::v2c("192.0.2.1")
//!     .community(b"public")
//!     .timeout(Duration::from_secs(2))
//!     .connect()
//!     .await?;
//!
//! let descr = session.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await?;
//! println!("{descr}");
//!
//! let mut walk = session.walk(oid!(1, 3, 6, 1, 2, 1, 1));
//! while let Some(vb) = walk.next().await {
//!     println!("{}", vb?);
//! }
//! # Ok(())
//! # }
//! ```

// The Error enum carries OIDs inline for context.
#![allow(clippy::result_large_err)]

pub mod ber;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod transport;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::{
    BulkWalk, DEFAULT_PORT, DEFAULT_TRAP_PORT, Session, SessionBuilder, SessionConfig, Walk,
    WalkEnd,
};
pub use dispatch::{Dispatcher, DispatcherConfig, Handle};
pub use error::{DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use oid::Oid;
pub use pdu::{GenericTrap, Pdu, PduType, TrapV1Pdu};
pub use transport::{SocketId, Transport, UdpTransport};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;

/// Session over a dedicated UDP socket.
pub type UdpSession = Session<UdpTransport>;
