//! Wire protocol of the co2mini family of USB CO2 monitors.
//!
//! The device streams fixed-size HID input reports once it has been unlocked
//! with a vendor feature report. Each report carries one measurement frame:
//!
//! ```text
//! byte:  0       1        2        3         4
//!        opcode  value_hi value_lo checksum  0x0D
//! ```
//!
//! Nothing in this crate performs I/O.

pub mod protocol;

pub use protocol::{
    DecodedFrame, FrameError, FrameResult, RawReport, Reading, decode, unlock_report,
};
