//! FTDI synchronous bit-bang backend. Drives TMS/TDI/TCK and samples
//! TDO through the read-back of each written pin image.

use std::{thread, time};

use anyhow::Context;
use bitflags::bitflags;
use log::debug;
use safe_ftdi;

use crate::interface::JtagInterface;

bitflags! {
    /// Pin image for the bit-bang port; the JTAG lines sit on the low
    /// nibble, matching the tester wiring.
    #[derive(Default)]
    struct Pins: u8 {
        const TMS = 0b0001;
        const TDI = 0b0010;
        const TDO = 0b0100;
        const TCK = 0b1000;
    }
}

pub struct FtdiBitBang {
    device: safe_ftdi::Context,
    // Current TMS/TDI/TCK output image
    output: Pins,
    // TDO level read back on the last rising TCK edge
    sampled: bool,
}

impl FtdiBitBang {
    pub fn new(vid: u16, pid: u16) -> Self {
        let mut device = safe_ftdi::Context::new().unwrap();
        device
            .open(vid, pid)
            .with_context(|| format!("failed to open {:#06x}:{:#06x}", vid, pid))
            .unwrap();
        device.set_baudrate(10_000).unwrap();

        FtdiBitBang {
            device,
            output: Pins::TMS | Pins::TDI | Pins::TCK,
            sampled: false,
        }
    }

    fn outputs_mask() -> u8 {
        (Pins::TMS | Pins::TDI | Pins::TCK).bits()
    }
}

impl JtagInterface for FtdiBitBang {
    fn enable(&mut self) {
        debug!("enabling JTAG pins");
        self.device
            .set_bitmode(Self::outputs_mask(), safe_ftdi::mpsse::MpsseMode::BITMODE_SYNCBB)
            .unwrap();
        self.output = Pins::TMS | Pins::TDI | Pins::TCK;
        self.device.write_data(&[self.output.bits()]).unwrap();
    }

    fn disable(&mut self) {
        debug!("releasing JTAG pins");
        // All pins back to inputs; external pull-ups hold the TAP
        self.device
            .set_bitmode(0x00, safe_ftdi::mpsse::MpsseMode::BITMODE_SYNCBB)
            .unwrap();
    }

    fn set_tdi(&mut self, value: bool) {
        self.output.set(Pins::TDI, value);
    }

    fn set_tms(&mut self, value: bool) {
        self.output.set(Pins::TMS, value);
    }

    fn clock_tck(&mut self) {
        let low = self.output - Pins::TCK;
        let high = self.output | Pins::TCK;
        let mut buf = [low.bits(), high.bits()];
        self.device.write_data(&buf).unwrap();
        self.device.read_data(&mut buf).unwrap();
        self.sampled = Pins::from_bits_truncate(buf[1]).contains(Pins::TDO);
        // TCK rests high between pulses
        self.output = high;
    }

    fn get_tdo(&self) -> bool {
        self.sampled
    }

    fn wait_us(&mut self, microseconds: u32) {
        thread::sleep(time::Duration::from_micros(u64::from(microseconds)));
    }
}
