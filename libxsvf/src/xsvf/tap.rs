//! The 16-state JTAG TAP controller model: the transition function
//! driven by TMS, and a route table giving the next TMS bit to apply
//! when moving from any state toward any other.

use log::debug;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rust_fsm::*;

/// TAP controller states, numbered per the XSVF XSTATE encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TapState {
    Reset = 0,
    Idle = 1,
    SelectDR = 2,
    CaptureDR = 3,
    ShiftDR = 4,
    Exit1DR = 5,
    PauseDR = 6,
    Exit2DR = 7,
    UpdateDR = 8,
    SelectIR = 9,
    CaptureIR = 10,
    ShiftIR = 11,
    Exit1IR = 12,
    PauseIR = 13,
    Exit2IR = 14,
    UpdateIR = 15,
}

/// All 16 states in XSTATE order. Handy for exhaustive tests.
pub const ALL_STATES: [TapState; 16] = [
    TapState::Reset,
    TapState::Idle,
    TapState::SelectDR,
    TapState::CaptureDR,
    TapState::ShiftDR,
    TapState::Exit1DR,
    TapState::PauseDR,
    TapState::Exit2DR,
    TapState::UpdateDR,
    TapState::SelectIR,
    TapState::CaptureIR,
    TapState::ShiftIR,
    TapState::Exit1IR,
    TapState::PauseIR,
    TapState::Exit2IR,
    TapState::UpdateIR,
];

/// State reached from `state` when TMS is `tms` on the next TCK edge.
pub fn next(state: TapState, tms: bool) -> TapState {
    use TapState::*;
    match (state, tms) {
        (Reset, true) => Reset,
        (Reset, false) => Idle,

        (Idle, true) => SelectDR,
        (Idle, false) => Idle,

        (SelectDR, true) => SelectIR,
        (SelectDR, false) => CaptureDR,
        (CaptureDR, true) => Exit1DR,
        (CaptureDR, false) => ShiftDR,
        (ShiftDR, true) => Exit1DR,
        (ShiftDR, false) => ShiftDR,
        (Exit1DR, true) => UpdateDR,
        (Exit1DR, false) => PauseDR,
        (PauseDR, true) => Exit2DR,
        (PauseDR, false) => PauseDR,
        (Exit2DR, true) => UpdateDR,
        (Exit2DR, false) => ShiftDR,
        (UpdateDR, true) => SelectDR,
        (UpdateDR, false) => Idle,

        (SelectIR, true) => Reset,
        (SelectIR, false) => CaptureIR,
        (CaptureIR, true) => Exit1IR,
        (CaptureIR, false) => ShiftIR,
        (ShiftIR, true) => Exit1IR,
        (ShiftIR, false) => ShiftIR,
        (Exit1IR, true) => UpdateIR,
        (Exit1IR, false) => PauseIR,
        (PauseIR, true) => Exit2IR,
        (PauseIR, false) => PauseIR,
        (Exit2IR, true) => UpdateIR,
        (Exit2IR, false) => ShiftIR,
        (UpdateIR, true) => SelectDR,
        (UpdateIR, false) => Idle,
    }
}

#[derive(Debug)]
pub struct TapStateMachine;

impl StateMachineImpl for TapStateMachine {
    type Input = bool;
    type State = TapState;
    type Output = ();

    const INITIAL_STATE: Self::State = TapState::Reset;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        let to = next(*state, *input);
        debug!("tap state change: {:?} -({})-> {:?}", state, *input as u8, to);
        Some(to)
    }

    fn output(_state: &Self::State, _input: &Self::Input) -> Option<Self::Output> {
        None
    }
}

// First TMS bit of a shortest route from the row state to the column
// state. Derived by breadth-first search over the transition graph;
// diagonal entries take the shortest nonempty cycle back to the state.
#[rustfmt::skip]
const ROUTE_TMS: [[u8; 16]; 16] = [
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], // Reset
    [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1], // Idle
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1], // SelectDR
    [1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1], // CaptureDR
    [1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1], // ShiftDR
    [1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1], // Exit1DR
    [1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1], // PauseDR
    [1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1], // Exit2DR
    [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1], // UpdateDR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0], // SelectIR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1], // CaptureIR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1], // ShiftIR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 1], // Exit1IR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1], // PauseIR
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 1], // Exit2IR
    [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1], // UpdateIR
];

/// TMS value for the next hop of a shortest route from `from` toward
/// `to`. The table is total; every pair is reachable.
pub fn route_tms(from: TapState, to: TapState) -> bool {
    ROUTE_TMS[from as usize][to as usize] != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    // TMS sequence reaching each state from Reset.
    fn path_from_reset(to: TapState) -> &'static [bool] {
        match to {
            TapState::Reset => &[true],
            TapState::Idle => &[false],
            TapState::SelectDR => &[false, true],
            TapState::CaptureDR => &[false, true, false],
            TapState::ShiftDR => &[false, true, false, false],
            TapState::Exit1DR => &[false, true, false, true],
            TapState::PauseDR => &[false, true, false, true, false],
            TapState::Exit2DR => &[false, true, false, true, false, true],
            TapState::UpdateDR => &[false, true, false, true, true],
            TapState::SelectIR => &[false, true, true],
            TapState::CaptureIR => &[false, true, true, false],
            TapState::ShiftIR => &[false, true, true, false, false],
            TapState::Exit1IR => &[false, true, true, false, true],
            TapState::PauseIR => &[false, true, true, false, true, false],
            TapState::Exit2IR => &[false, true, true, false, true, false, true],
            TapState::UpdateIR => &[false, true, true, false, true, true],
        }
    }

    fn state_at(s: TapState) -> TapState {
        let mut state = TapState::Reset;
        for tms in path_from_reset(s) {
            state = next(state, *tms);
        }
        state
    }

    #[test]
    fn reset_paths_reach_their_states() {
        for s in ALL_STATES {
            assert_eq!(state_at(s), s);
        }
    }

    #[test]
    fn state_codes_round_trip() {
        for (code, s) in ALL_STATES.iter().enumerate() {
            assert_eq!(u8::from(*s) as usize, code);
            assert_eq!(TapState::try_from(code as u8).unwrap(), *s);
        }
        assert!(TapState::try_from(16u8).is_err());
    }

    #[test]
    fn five_tms_ones_reach_reset_from_anywhere() {
        for from in ALL_STATES {
            let mut state = from;
            for _ in 0..5 {
                state = next(state, true);
            }
            assert_eq!(state, TapState::Reset, "stuck coming from {:?}", from);
        }
    }

    #[test]
    fn state_machine_follows_transition_function() {
        let mut machine: StateMachine<TapStateMachine> = StateMachine::new();
        assert_eq!(*machine.state(), TapState::Reset);
        for tms in path_from_reset(TapState::PauseIR) {
            machine.consume(tms).unwrap();
        }
        assert_eq!(*machine.state(), TapState::PauseIR);
    }

    #[test]
    fn route_table_reaches_every_pair_within_fifteen_hops() {
        for from in ALL_STATES {
            for to in ALL_STATES {
                let mut state = from;
                let mut hops = 0;
                loop {
                    state = next(state, route_tms(state, to));
                    hops += 1;
                    if state == to {
                        break;
                    }
                    assert!(hops <= 15, "no route {:?} -> {:?}", from, to);
                }
            }
        }
    }
}
