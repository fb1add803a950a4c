//! In-situ serial configuration protocol for typed non-volatile variables
//! on embedded targets.
//!
//! An [`engine::Engine`] watches a background byte stream for a fixed
//! activation key; once seen, it accepts 9-byte framed commands to set a
//! flash address, read or write a typed scalar at it, report the current
//! address, or drop back out of configuration mode. See
//! [`engine`]/[`wire`] for the wire format and [`codec`] for the scalar
//! encodings.
#![cfg_attr(not(test), no_std)]

pub mod codec;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod fifo;
pub mod wire;

#[cfg(feature = "singleton")]
pub mod singleton;

pub use codec::{FlashScalar, Scalar};
pub use cursor::Cursor;
pub use engine::{CallbackSet, Engine, Mode};
pub use error::FifoError;
pub use fifo::{ByteFifo, DrainMode};
pub use wire::{Command, TypeTag};
