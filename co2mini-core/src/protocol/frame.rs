use super::{FRAME_SIZE, FRAME_TERMINATOR, REPORT_SIZE, Reading, error::FrameError, error::FrameResult};

// frame structure : opcode(1) + value(2, big endian) + checksum(1) + terminator(1)
// the remaining bytes of a report are padding.

/// One input report as read from the device. Carries no validity guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReport {
    bytes: [u8; REPORT_SIZE],
    len: usize,
}

impl RawReport {
    /// Copies up to [`REPORT_SIZE`] bytes out of `bytes`.
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(REPORT_SIZE);
        let mut buf = [0u8; REPORT_SIZE];
        buf[..len].copy_from_slice(&bytes[..len]);

        Self { bytes: buf, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl From<[u8; REPORT_SIZE]> for RawReport {
    fn from(bytes: [u8; REPORT_SIZE]) -> Self {
        Self {
            bytes,
            len: REPORT_SIZE,
        }
    }
}

/// A frame that passed the length, checksum and terminator checks.
///
/// Only [`DecodedFrame::parse`] can build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    opcode: u8,
    value: u16,
}

impl DecodedFrame {
    pub fn parse(bytes: &[u8]) -> FrameResult<Self> {
        let &[opcode, hi, lo, checksum, terminator, ..] = bytes else {
            return Err(FrameError::TooShort {
                needed: FRAME_SIZE,
                available: bytes.len(),
            });
        };

        let expected = opcode.wrapping_add(hi).wrapping_add(lo);
        if expected != checksum {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: checksum,
            });
        }

        if terminator != FRAME_TERMINATOR {
            return Err(FrameError::InvalidTerminator(terminator));
        }

        Ok(Self {
            opcode,
            value: u16::from_be_bytes([hi, lo]),
        })
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

/// Decodes a raw report into a reading.
///
/// Returns `None` for malformed frames and for opcodes the exporter does not
/// publish. Both are routine: the device emits several opcodes nobody reads.
pub fn decode(bytes: &[u8]) -> Option<Reading> {
    DecodedFrame::parse(bytes).ok().and_then(Reading::from_frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OP_CO2, OP_TEMPERATURE};

    fn frame(opcode: u8, hi: u8, lo: u8) -> [u8; FRAME_SIZE] {
        [
            opcode,
            hi,
            lo,
            opcode.wrapping_add(hi).wrapping_add(lo),
            FRAME_TERMINATOR,
        ]
    }

    #[test]
    fn test_co2_frame() {
        assert_eq!(decode(&[0x50, 0x01, 0x90, 0xE1, 0x0D]), Some(Reading::Co2(400)));
    }

    #[test]
    fn test_temperature_frame() {
        let Some(Reading::Temperature(celsius)) = decode(&[0x42, 0x10, 0x67, 0xB9, 0x0D]) else {
            panic!("expected a temperature reading");
        };
        assert!((celsius - -10.7125).abs() < 1e-9, "got {celsius}");
    }

    #[test]
    fn test_bad_checksum_is_dropped() {
        assert_eq!(decode(&[0x50, 0x01, 0x90, 0x00, 0x0D]), None);
        assert_eq!(
            DecodedFrame::parse(&[0x50, 0x01, 0x90, 0x00, 0x0D]),
            Err(FrameError::ChecksumMismatch {
                expected: 0xE1,
                actual: 0x00
            })
        );
    }

    #[test]
    fn test_short_frames_are_dropped() {
        assert_eq!(decode(&[0x50, 0x01]), None);
        for len in 0..FRAME_SIZE {
            let bytes = [0x50, 0x01, 0x90, 0xE1, 0x0D];
            assert_eq!(decode(&bytes[..len]), None, "len {len}");
            assert_eq!(
                DecodedFrame::parse(&bytes[..len]),
                Err(FrameError::TooShort {
                    needed: FRAME_SIZE,
                    available: len
                })
            );
        }
    }

    #[test]
    fn test_unknown_opcode_is_dropped() {
        let bytes = [0x41, 0x00, 0x00, 0x41, 0x0D];
        assert!(DecodedFrame::parse(&bytes).is_ok());
        assert_eq!(decode(&bytes), None);
    }

    #[test]
    fn test_every_wrong_checksum_is_rejected() {
        for opcode in [OP_CO2, OP_TEMPERATURE, 0x41, 0xFF] {
            let valid = frame(opcode, 0xAB, 0xCD);
            for checksum in 0..=u8::MAX {
                if checksum == valid[3] {
                    continue;
                }
                let mut bytes = valid;
                bytes[3] = checksum;
                assert_eq!(decode(&bytes), None);
            }
        }
    }

    #[test]
    fn test_every_wrong_terminator_is_rejected() {
        let valid = frame(OP_CO2, 0x02, 0x58);
        for terminator in 0..=u8::MAX {
            let mut bytes = valid;
            bytes[4] = terminator;
            let decoded = decode(&bytes);
            if terminator == FRAME_TERMINATOR {
                assert_eq!(decoded, Some(Reading::Co2(600)));
            } else {
                assert_eq!(decoded, None);
            }
        }
    }

    #[test]
    fn test_co2_value_is_unmodified() {
        for (hi, lo) in [(0x00, 0x00), (0x01, 0x90), (0x13, 0x88), (0xFF, 0xFF)] {
            let expected = u16::from_be_bytes([hi, lo]);
            assert_eq!(decode(&frame(OP_CO2, hi, lo)), Some(Reading::Co2(expected)));
        }
    }

    #[test]
    fn test_temperature_conversion() {
        for (hi, lo) in [(0x00, 0x00), (0x12, 0x6A), (0x13, 0x00), (0xFF, 0xFF)] {
            let raw = u16::from_be_bytes([hi, lo]);
            let Some(Reading::Temperature(celsius)) = decode(&frame(OP_TEMPERATURE, hi, lo)) else {
                panic!("expected a temperature reading for {raw:#06X}");
            };
            let expected = f64::from(raw) / 16.0 - 273.15;
            assert!((celsius - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_other_opcodes_are_dropped() {
        for opcode in 0..=u8::MAX {
            if opcode == OP_CO2 || opcode == OP_TEMPERATURE {
                continue;
            }
            assert_eq!(decode(&frame(opcode, 0x01, 0x02)), None, "opcode {opcode:#04X}");
        }
    }

    #[test]
    fn test_full_report_with_padding() {
        let report = RawReport::from([0x50, 0x03, 0x20, 0x73, 0x0D, 0x00, 0x00, 0x00]);
        assert_eq!(decode(report.as_bytes()), Some(Reading::Co2(800)));
    }

    #[test]
    fn test_raw_report_truncates_to_report_size() {
        let report = RawReport::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(report.len(), REPORT_SIZE);
        assert_eq!(report.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        let short = RawReport::new(&[0x50, 0x01]);
        assert_eq!(short.as_bytes(), &[0x50, 0x01]);
        assert!(RawReport::new(&[]).is_empty());
    }
}
