//! The physical JTAG interface consumed by the player, and its
//! implementations: an in-memory TAP simulator and an FTDI bit-bang
//! backend for real pins.

pub mod sim;

#[cfg(feature = "ftdi")]
pub mod ftdi_bitbang;

/// Primitive pin operations the player drives.
///
/// Timing correctness (minimum pulse width, setup/hold of TMS and TDI
/// relative to TCK) is entirely the implementation's responsibility;
/// the player only sequences the operations.
pub trait JtagInterface {
    /// Claim the pins and drive them to their idle levels.
    fn enable(&mut self);

    /// Release the pins to a safe state. Pull-ups are expected to keep
    /// the TAP quiescent afterwards.
    fn disable(&mut self);

    /// Set the TDI pin level.
    fn set_tdi(&mut self, value: bool);

    /// Set the TMS pin level.
    fn set_tms(&mut self, value: bool);

    /// Cycle TCK low then high. TDO is sampled on the rising edge,
    /// before the TAP state changes.
    fn clock_tck(&mut self);

    /// TDO level sampled by the last `clock_tck`.
    fn get_tdo(&self) -> bool;

    /// Busy-wait for at least `microseconds`.
    fn wait_us(&mut self, microseconds: u32);
}
