//! Async client for Even Realities G1 smart glasses.
//!
//! The G1 is a pair of wearable displays; each arm exposes its own byte
//! pipe and speaks a compact binary command protocol over it. This crate
//! implements the protocol engine on top of any such pipe: request framing,
//! response correlation by prefix, chunked bulk transfers with a CRC
//! handshake, and dispatch of unsolicited frames (taps, case and battery
//! events) to listeners. The wire encoding itself lives in `even-g1-core`.
//!
//! The transport is pluggable: implement [`Transport`] per side (on Linux a
//! BLE UART via your stack of choice), feed received frames into
//! [`Engine::on_bytes`], and drive everything through [`Glasses`].
//!
//! ## Example
//!
//! ```no_run
//! use even_g1::{Glasses, Side};
//!
//! # async fn example(left: std::sync::Arc<dyn even_g1::Transport>,
//! #                  right: std::sync::Arc<dyn even_g1::Transport>)
//! #     -> even_g1::Result<()> {
//! let glasses = Glasses::new(left, right);
//! glasses.connect().await?;
//!
//! glasses.on_double_tap(|_, side| println!("double tap on the {side} arm"));
//! let level = glasses.battery(Side::Left).await?;
//! println!("left battery: {level}%");
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod engine;
pub mod error;
mod listener;
mod registry;
pub mod transport;

pub use device::Glasses;
pub use engine::{CommandHandle, Engine};
pub use error::{Error, Result};
pub use transport::{SideState, Transport, TransportError, TransportEvent};

// Protocol re-exports from the core crate.
pub use even_g1_core::{event, ops, CodecError, Command, Side, Target};
