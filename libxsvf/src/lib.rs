//! Stand-alone XSVF player.
//!
//! Plays an XSVF sequence compiled into the firmware image against a
//! JTAG Test Access Port. The byte stream is decoded command by
//! command and turned into TMS/TDI/TCK activity on a physical
//! interface, optionally verifying the TDO bits shifted back out.

pub mod interface;
pub mod xsvf;

#[cfg(feature = "ftdi")]
pub use crate::interface::ftdi_bitbang;
