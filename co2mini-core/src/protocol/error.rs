pub type FrameResult<T> = core::result::Result<T, FrameError>;

/// Reasons a report is not a valid measurement frame.
///
/// These never leave the decoding path as failures; a rejected frame is
/// simply dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short: needed {needed} bytes, got {available}")]
    TooShort { needed: usize, available: usize },

    #[error("checksum mismatch: expected {expected:#04X}, got {actual:#04X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("invalid frame terminator: {0:#04X}")]
    InvalidTerminator(u8),
}
