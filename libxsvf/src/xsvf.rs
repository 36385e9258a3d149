use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

pub mod player;
pub mod reader;
pub mod tap;

/// Maximum number of bits to shift in/out in a single command.
pub const MAX_BITS: usize = 2048;

/// Maximum number of bytes to shift in/out in a single command.
pub const MAX_BYTES: usize = (MAX_BITS + 7) / 8;

/// Maximum stored length of an XCOMMENT string.
pub const MAX_STRING: usize = 100;

/// XSVF command codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    Xcomplete = 0x00,
    Xtdomask = 0x01,
    Xsir = 0x02,
    Xsdr = 0x03,
    Xruntest = 0x04,
    Xrepeat = 0x07,
    Xsdrsize = 0x08,
    Xsdrtdo = 0x09,
    Xsetsdrmasks = 0x0a,
    Xsdrinc = 0x0b,
    Xsdrb = 0x0c,
    Xsdrc = 0x0d,
    Xsdre = 0x0e,
    Xsdrtdob = 0x0f,
    Xsdrtdoc = 0x10,
    Xsdrtdoe = 0x11,
    Xstate = 0x12,
    Xendir = 0x13,
    Xenddr = 0x14,
    Xsir2 = 0x15,
    Xcomment = 0x16,
    Xwait = 0x17,
}

/// Errors that terminate playback of a vector stream.
///
/// Offsets count bytes consumed from the start of the stream when the
/// error was raised. Internal-consistency faults (a shift requested
/// outside a Shift state) are panics, not variants here; they indicate
/// a broken player rather than a bad vector.
#[derive(Error, Debug)]
pub enum XsvfError {
    #[error("malformed vector stream at byte {offset}: {reason}")]
    Format { offset: usize, reason: String },
    #[error("TDO mismatch at byte {offset} of the vector stream")]
    Verification { offset: usize },
}
