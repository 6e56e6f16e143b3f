use super::{DecodedFrame, OP_CO2, OP_TEMPERATURE};

const KELVIN_OFFSET: f64 = 273.15;
/// Temperature frames carry kelvin in 1/16 steps.
const TEMPERATURE_SCALE: f64 = 16.0;

/// A measurement published by the exporter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// CO2 concentration in parts per million, as sent by the device.
    Co2(u16),
    /// Ambient temperature in degrees Celsius.
    Temperature(f64),
}

impl Reading {
    /// Maps a validated frame to a reading. Opcodes other than CO2 and
    /// temperature yield `None`.
    pub fn from_frame(frame: DecodedFrame) -> Option<Self> {
        match frame.opcode() {
            OP_CO2 => Some(Reading::Co2(frame.value())),
            OP_TEMPERATURE => Some(Reading::Temperature(
                f64::from(frame.value()) / TEMPERATURE_SCALE - KELVIN_OFFSET,
            )),
            _ => None,
        }
    }
}
