//! Demo vector compiled into the image, standing in for the real
//! programming sequence exported by the device tools. Shifts a BYPASS
//! instruction, clocks one byte through the data register and parks
//! the TAP in Reset.
//!
//! Layout: XCOMMENT, XSIR(8, 0xff), XSDRSIZE(8), XSDR(0xa5),
//! XSTATE(Reset), XCOMPLETE.

#[rustfmt::skip]
pub const DEMO_VECTOR: &[u8] = &[
    0x16, b'b', b'y', b'p', b'a', b's', b's', b' ',
          b'c', b'h', b'e', b'c', b'k', 0x00,
    0x02, 0x08, 0xff,
    0x08, 0x00, 0x00, 0x00, 0x08,
    0x03, 0xa5,
    0x12, 0x00,
    0x00,
];
