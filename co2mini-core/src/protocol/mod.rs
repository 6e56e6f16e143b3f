mod error;
mod frame;
mod reading;

pub use error::{FrameError, FrameResult};
pub use frame::{DecodedFrame, RawReport, decode};
pub use reading::Reading;

/// USB vendor id of the sensor (Holtek).
pub const VENDOR_ID: u16 = 0x04D9;
/// USB product id of the sensor.
pub const PRODUCT_ID: u16 = 0xA052;

/// Report id prefixed to the unlock feature report.
pub const UNLOCK_REPORT_ID: u8 = 0x00;
/// Key the device expects before it starts streaming frames.
pub const MAGIC_KEY: [u8; 8] = [0x86, 0x41, 0xC9, 0xA8, 0x7F, 0x41, 0x3C, 0xCA];
pub const UNLOCK_REPORT_SIZE: usize = 1 + MAGIC_KEY.len();

/// Size of every input report the device produces.
pub const REPORT_SIZE: usize = 8;
/// Bytes of a report that carry frame payload: opcode, value (2), checksum, terminator.
pub const FRAME_SIZE: usize = 5;
pub const FRAME_TERMINATOR: u8 = 0x0D;

pub const OP_CO2: u8 = 0x50;
pub const OP_TEMPERATURE: u8 = 0x42;

/// Builds the feature report that unlocks the device: report id followed by [`MAGIC_KEY`].
pub fn unlock_report() -> [u8; UNLOCK_REPORT_SIZE] {
    let mut bytes = [0u8; UNLOCK_REPORT_SIZE];
    bytes[0] = UNLOCK_REPORT_ID;
    bytes[1..].copy_from_slice(&MAGIC_KEY);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_report_layout() {
        assert_eq!(
            unlock_report(),
            [0x00, 0x86, 0x41, 0xC9, 0xA8, 0x7F, 0x41, 0x3C, 0xCA]
        );
    }
}
