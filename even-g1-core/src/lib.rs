//! Wire protocol for Even Realities G1 smart glasses.
//!
//! This crate is the pure half of the client: it encodes high-level
//! operations into the framed packets the firmware expects and decodes raw
//! response bytes into typed results. It performs no I/O and has no opinion
//! about the transport or async runtime; the `even-g1` crate builds the
//! dual-side protocol engine on top of it.
//!
//! ## Example
//!
//! ```
//! use even_g1_core::ops;
//!
//! let cmd = ops::set_brightness(50, true);
//! assert_eq!(cmd.packets()[0], vec![0x01, 0x1F, 0x01]);
//! assert_eq!(cmd.decode(&[0x01, 0xC9]).unwrap(), true);
//! ```

pub mod chunk;
pub mod command;
pub mod error;
pub mod event;
pub mod ops;
pub mod side;

pub use command::{Command, DEFAULT_DEADLINE, TRANSPORT_MTU};
pub use error::CodecError;
pub use side::{Side, Target};
