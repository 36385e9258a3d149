//! The XSVF command interpreter: decodes one command at a time and
//! turns it into TAP moves and serial shifts on the physical
//! interface.

use std::convert::TryFrom;

use log::{debug, error, info};
use rust_fsm::*;

use crate::interface::JtagInterface;
use crate::xsvf::reader::Reader;
use crate::xsvf::tap::{route_tms, TapState, TapStateMachine};
use crate::xsvf::{Command, XsvfError, MAX_BYTES, MAX_STRING};

/// Non-terminal outcome of a single `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// More commands follow.
    Running,
    /// The completion opcode was reached.
    Completed,
}

/// Which comparison to run against sampled TDO bits during a shift.
enum Check<'b> {
    /// Shift only, always succeeds.
    None,
    /// Compare bits where the mask bit is set.
    Masked {
        expected: &'b [u8; MAX_BYTES],
        mask: &'b [u8; MAX_BYTES],
    },
    /// Compare every bit.
    All { expected: &'b [u8; MAX_BYTES] },
}

/// Serialize `size` bits of `tdi` onto the interface, most significant
/// bit of the value first, sampling TDO after each clock. On the last
/// bit TMS carries `exit` so the same edge that finishes the shift
/// leaves the Shift state.
///
/// Returns false on the first mismatching compared bit; the remaining
/// bits are not shifted.
fn shift_bits<I: JtagInterface>(
    interface: &mut I,
    machine: &mut StateMachine<TapStateMachine>,
    size: u32,
    tdi: &[u8; MAX_BYTES],
    check: Check<'_>,
    exit: bool,
) -> bool {
    let state = *machine.state();
    assert!(
        state == TapState::ShiftIR || state == TapState::ShiftDR,
        "shift requested in {:?}",
        state
    );
    if size == 0 {
        return true;
    }
    let byte_count = (size as usize + 7) / 8;

    interface.set_tms(false);
    for b in 0..size {
        // Value bit index: the first bit clocked out is the MSB of a
        // big-endian field of `size` bits.
        let k = (size - 1 - b) as usize;
        let byte = byte_count - 1 - k / 8;
        let bit = 1u8 << (k % 8);
        let last = b == size - 1;

        if last {
            interface.set_tms(exit);
        }
        interface.set_tdi(tdi[byte] & bit != 0);
        interface.clock_tck();
        if last {
            machine.consume(&exit).unwrap();
        }

        let sampled = interface.get_tdo();
        let matched = match check {
            Check::None => true,
            Check::Masked { expected, mask } => {
                mask[byte] & bit == 0 || sampled == (expected[byte] & bit != 0)
            }
            Check::All { expected } => sampled == (expected[byte] & bit != 0),
        };
        if !matched {
            return false;
        }
    }
    true
}

/// XSVF playback session. Owns the TAP state, the session settings and
/// the shift buffers; borrows the vector stream for its lifetime.
pub struct Xsvf<'a, I: JtagInterface> {
    pub interface: I,
    reader: Reader<'a>,
    machine: StateMachine<TapStateMachine>,

    // State to rest in after XSIR/XSIR2 (Idle or Pause-IR)
    endir_state: TapState,
    // State to rest in after XSDR/XSDRE/XSDRTDO/XSDRTDOE (Idle or Pause-DR)
    enddr_state: TapState,
    // TCK cycles to dwell in Run-Test/Idle after IR/DR shifts
    run_test_time: u32,
    // Verification retry budget; accepted but not consulted
    repeat_count: u32,
    // Bit length of size-implicit data-register commands
    xsdr_size: u32,

    // Data to shift in, overwritten per command
    tdi_value: [u8; MAX_BYTES],
    // Expected TDO, persists across XSDR commands
    tdo_value: [u8; MAX_BYTES],
    // Mask applied when checking TDO, persists until the next XTDOMASK
    tdo_mask: [u8; MAX_BYTES],

    string_buffer: [u8; MAX_STRING],
}

impl<'a, I: JtagInterface> Xsvf<'a, I> {
    pub fn new(data: &'a [u8], interface: I) -> Self {
        Xsvf {
            interface,
            reader: Reader::new(data),
            machine: StateMachine::new(),
            endir_state: TapState::Idle,
            enddr_state: TapState::Idle,
            run_test_time: 0,
            repeat_count: 32,
            xsdr_size: 0,
            tdi_value: [0; MAX_BYTES],
            tdo_value: [0; MAX_BYTES],
            tdo_mask: [0; MAX_BYTES],
            string_buffer: [0; MAX_STRING],
        }
    }

    /// Count of stream bytes consumed so far.
    pub fn bytes_processed(&self) -> usize {
        self.reader.bytes_processed()
    }

    /// TAP state as tracked by the player.
    pub fn state(&self) -> TapState {
        *self.machine.state()
    }

    /// Stored XREPEAT budget. Never consulted on a mismatch; kept so
    /// the policy is visible and testable.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    fn format_error(&self, reason: String) -> XsvfError {
        XsvfError::Format {
            offset: self.reader.bytes_processed(),
            reason,
        }
    }

    fn verification_error(&self) -> XsvfError {
        XsvfError::Verification {
            offset: self.reader.bytes_processed(),
        }
    }

    /// Move the TAP to `to`, clocking TMS along a shortest route.
    ///
    /// Reset is special-cased with the guaranteed idiom: TMS held high
    /// for five clocks reaches Reset from any state.
    pub fn move_to(&mut self, to: TapState) {
        debug!("move_to({:?})", to);
        if to == TapState::Reset {
            self.interface.set_tms(true);
            for _ in 0..5 {
                self.interface.clock_tck();
                self.machine.consume(&true).unwrap();
            }
            return;
        }
        while self.state() != to {
            let tms = route_tms(self.state(), to);
            self.interface.set_tms(tms);
            self.interface.clock_tck();
            self.machine.consume(&tms).unwrap();
        }
    }

    /// Post-shift landing: dwell in Run-Test/Idle when an XRUNTEST
    /// time is active, otherwise rest in the given end state.
    fn dwell_or_move(&mut self, rest: TapState) {
        if self.run_test_time != 0 {
            self.move_to(TapState::Idle);
            self.interface.set_tms(false);
            for _ in 0..self.run_test_time {
                self.interface.clock_tck();
            }
        } else {
            self.move_to(rest);
        }
    }

    fn shift_ir(&mut self, bits: u32) -> Result<(), XsvfError> {
        self.reader.get_bits(bits, &mut self.tdi_value)?;
        self.move_to(TapState::ShiftIR);
        shift_bits(
            &mut self.interface,
            &mut self.machine,
            bits,
            &self.tdi_value,
            Check::None,
            true,
        );
        self.dwell_or_move(self.endir_state);
        Ok(())
    }

    /// Decode and execute one command.
    pub fn step(&mut self) -> Result<Status, XsvfError> {
        let opcode = self.reader.get();
        let command = Command::try_from(opcode)
            .map_err(|_| self.format_error(format!("unknown opcode {:#04x}", opcode)))?;

        match command {
            Command::Xcomplete => {
                debug!("XCOMPLETE");
                return Ok(Status::Completed);
            }

            Command::Xrepeat => {
                // Retry budget for TDO tests. Parsed for stream
                // compatibility; mismatches fail without retrying.
                self.repeat_count = self.reader.get_u8();
                debug!("XREPEAT({})", self.repeat_count);
            }

            Command::Xsetsdrmasks => {
                return Err(self.format_error("XSETSDRMASKS not supported".to_string()));
            }

            Command::Xsdrinc => {
                return Err(self.format_error("XSDRINC not supported".to_string()));
            }

            Command::Xruntest => {
                self.run_test_time = self.reader.get_u32();
                debug!("XRUNTEST({} cycles/us)", self.run_test_time);
            }

            Command::Xsdrsize => {
                let size = self.reader.get_u32();
                if size as usize > crate::xsvf::MAX_BITS {
                    return Err(self.format_error(format!(
                        "XSDRSIZE of {} bits exceeds the {}-bit limit",
                        size,
                        crate::xsvf::MAX_BITS
                    )));
                }
                self.xsdr_size = size;
                debug!("XSDRSIZE({})", self.xsdr_size);
            }

            Command::Xtdomask => {
                debug!("XTDOMASK({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdo_mask)?;
            }

            Command::Xstate => {
                let code = self.reader.get();
                let target = TapState::try_from(code)
                    .map_err(|_| self.format_error(format!("illegal state code {:#04x}", code)))?;
                debug!("XSTATE({:?})", target);
                self.move_to(target);
            }

            Command::Xendir => {
                self.endir_state = if self.reader.get_u8() != 0 {
                    TapState::PauseIR
                } else {
                    TapState::Idle
                };
                debug!("XENDIR({:?})", self.endir_state);
            }

            Command::Xenddr => {
                self.enddr_state = if self.reader.get_u8() != 0 {
                    TapState::PauseDR
                } else {
                    TapState::Idle
                };
                debug!("XENDDR({:?})", self.enddr_state);
            }

            Command::Xcomment => {
                let stored = self.reader.get_string(&mut self.string_buffer);
                info!(
                    "XCOMMENT({})",
                    String::from_utf8_lossy(&self.string_buffer[..stored])
                );
            }

            Command::Xwait => {
                let wait_code = self.reader.get();
                let wait_state = TapState::try_from(wait_code).map_err(|_| {
                    self.format_error(format!("illegal wait state {:#04x}", wait_code))
                })?;
                let end_code = self.reader.get();
                let end_state = TapState::try_from(end_code).map_err(|_| {
                    self.format_error(format!("illegal end state {:#04x}", end_code))
                })?;
                let wait_time = self.reader.get_u32();
                debug!("XWAIT({:?}, {:?}, {})", wait_state, end_state, wait_time);
                self.move_to(wait_state);
                self.interface.wait_us(wait_time);
                self.move_to(end_state);
            }

            Command::Xsir => {
                let bits = self.reader.get_u8();
                debug!("XSIR({}) -> {:?}", bits, self.endir_state);
                self.shift_ir(bits)?;
            }

            Command::Xsir2 => {
                let bits = self.reader.get_u16();
                debug!("XSIR2({}) -> {:?}", bits, self.endir_state);
                self.shift_ir(bits)?;
            }

            Command::Xsdr => {
                debug!("XSDR({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.move_to(TapState::ShiftDR);
                let matched = shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::Masked {
                        expected: &self.tdo_value,
                        mask: &self.tdo_mask,
                    },
                    true,
                );
                if !matched {
                    return Err(self.verification_error());
                }
                self.dwell_or_move(self.enddr_state);
            }

            Command::Xsdrtdo => {
                debug!("XSDRTDO({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.reader.get_bits(size, &mut self.tdo_value)?;
                self.move_to(TapState::ShiftDR);
                let matched = shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::Masked {
                        expected: &self.tdo_value,
                        mask: &self.tdo_mask,
                    },
                    true,
                );
                if !matched {
                    return Err(self.verification_error());
                }
                self.dwell_or_move(self.enddr_state);
            }

            Command::Xsdrb => {
                debug!("XSDRB({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.move_to(TapState::ShiftDR);
                shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::None,
                    false,
                );
            }

            Command::Xsdrc => {
                debug!("XSDRC({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::None,
                    false,
                );
            }

            Command::Xsdre => {
                debug!("XSDRE({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::None,
                    true,
                );
                self.move_to(self.enddr_state);
            }

            Command::Xsdrtdob => {
                debug!("XSDRTDOB({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.reader.get_bits(size, &mut self.tdo_value)?;
                self.move_to(TapState::ShiftDR);
                let matched = shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::All {
                        expected: &self.tdo_value,
                    },
                    false,
                );
                if !matched {
                    return Err(self.verification_error());
                }
            }

            Command::Xsdrtdoc => {
                debug!("XSDRTDOC({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.reader.get_bits(size, &mut self.tdo_value)?;
                let matched = shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::All {
                        expected: &self.tdo_value,
                    },
                    false,
                );
                if !matched {
                    return Err(self.verification_error());
                }
            }

            Command::Xsdrtdoe => {
                debug!("XSDRTDOE({})", self.xsdr_size);
                let size = self.xsdr_size;
                self.reader.get_bits(size, &mut self.tdi_value)?;
                self.reader.get_bits(size, &mut self.tdo_value)?;
                let matched = shift_bits(
                    &mut self.interface,
                    &mut self.machine,
                    size,
                    &self.tdi_value,
                    Check::All {
                        expected: &self.tdo_value,
                    },
                    true,
                );
                if !matched {
                    return Err(self.verification_error());
                }
                self.move_to(self.enddr_state);
            }
        }
        Ok(Status::Running)
    }

    /// Play the whole sequence. The interface is enabled before the
    /// first command and disabled once the run terminates, whatever
    /// the outcome.
    pub fn run_to_completion(&mut self) -> Result<(), XsvfError> {
        self.interface.enable();
        self.move_to(TapState::Reset);
        let result = loop {
            match self.step() {
                Ok(Status::Running) => continue,
                Ok(Status::Completed) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.interface.disable();
        info!("processed {} bytes", self.reader.bytes_processed());
        if let Err(e) = &result {
            error!("playback failed: {}", e);
        }
        result
    }
}
