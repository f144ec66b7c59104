//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use snmp_session::prelude::*;
//! ```
//!
//! This imports:
//! - Core types: [`Session`], [`Dispatcher`], [`Oid`], [`Value`], [`VarBind`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro for compile-time OID construction

pub use crate::client::{Session, WalkEnd};
pub use crate::dispatch::{Dispatcher, DispatcherConfig};
pub use crate::error::{Error, Result};
pub use crate::oid::Oid;
pub use crate::value::Value;
pub use crate::varbind::VarBind;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
