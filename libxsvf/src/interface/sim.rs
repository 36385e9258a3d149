//! In-memory TAP simulator. Tracks the real TAP transition graph on
//! every clock pulse, plays back scripted TDO responses while in a
//! Shift state and records everything the player does, so the whole
//! interpreter can be exercised without hardware.

use std::collections::VecDeque;

use rust_fsm::*;

use crate::interface::JtagInterface;
use crate::xsvf::tap::{TapState, TapStateMachine};

pub struct SimTap {
    machine: StateMachine<TapStateMachine>,
    tms: bool,
    tdi: bool,
    sampled: bool,
    tdo_script: VecDeque<bool>,
    shifted_in: Vec<bool>,
    clocks: u64,
    waited_us: u64,
    enabled: bool,
    enable_calls: u32,
    disable_calls: u32,
}

impl SimTap {
    pub fn new() -> Self {
        SimTap {
            machine: StateMachine::new(),
            tms: false,
            tdi: false,
            sampled: false,
            tdo_script: VecDeque::new(),
            shifted_in: Vec::new(),
            clocks: 0,
            waited_us: 0,
            enabled: false,
            enable_calls: 0,
            disable_calls: 0,
        }
    }

    /// Queue TDO bits to be presented while in Shift-DR/Shift-IR, in
    /// the player's shift order: most significant bit of the value
    /// first, `value` packed big-endian over `ceil(bits / 8)` bytes.
    /// Once the script runs dry the simulator shifts out zeros.
    pub fn load_tdo_response(&mut self, value: &[u8], bits: usize) {
        let byte_count = (bits + 7) / 8;
        for b in 0..bits {
            let k = bits - 1 - b;
            let byte = byte_count - 1 - k / 8;
            self.tdo_script.push_back(value[byte] & (1 << (k % 8)) != 0);
        }
    }

    /// Current state of the simulated TAP controller.
    pub fn state(&self) -> TapState {
        *self.machine.state()
    }

    /// TDI bits captured while the TAP was in a Shift state, in the
    /// order they were clocked.
    pub fn shifted_in(&self) -> &[bool] {
        &self.shifted_in
    }

    pub fn clocks(&self) -> u64 {
        self.clocks
    }

    pub fn waited_us(&self) -> u64 {
        self.waited_us
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable_calls(&self) -> u32 {
        self.enable_calls
    }

    pub fn disable_calls(&self) -> u32 {
        self.disable_calls
    }
}

impl Default for SimTap {
    fn default() -> Self {
        Self::new()
    }
}

impl JtagInterface for SimTap {
    fn enable(&mut self) {
        self.enabled = true;
        self.enable_calls += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disable_calls += 1;
    }

    fn set_tdi(&mut self, value: bool) {
        self.tdi = value;
    }

    fn set_tms(&mut self, value: bool) {
        self.tms = value;
    }

    fn clock_tck(&mut self) {
        // Sample before the state advances, as real TAP timing does.
        self.sampled = match self.state() {
            TapState::ShiftDR | TapState::ShiftIR => {
                self.shifted_in.push(self.tdi);
                self.tdo_script.pop_front().unwrap_or(false)
            }
            _ => false,
        };
        self.machine.consume(&self.tms).unwrap();
        self.clocks += 1;
    }

    fn get_tdo(&self) -> bool {
        self.sampled
    }

    fn wait_us(&mut self, microseconds: u32) {
        self.waited_us += u64::from(microseconds);
    }
}
