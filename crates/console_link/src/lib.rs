//! # Console Link - Serial Line Formats
//!
//! Value types for the two serial links of the measuring station: the motor
//! controller, which accepts one G-code jog command per line, and the linear
//! sensor, which reports `x rotation z` readings one line at a time.
//! Nothing here opens a port.
//!
//! ## Example
//!
//! ```rust
//! use console_link::{Axis, Direction, MotorCommand, SensorReading, Speed};
//!
//! let command = MotorCommand::jog(Axis::X, Direction::Negative, Speed::default());
//! assert_eq!(command.to_string(), "G01 X-50");
//!
//! let reading: SensorReading = "1.5 90 -2".parse().unwrap();
//! assert_eq!(reading.to_string(), "X: 1.50, Z: -2.00, Rotation: 90.00");
//! ```

use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::warn;

/// Result type for console link operations
pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Speed must be between 1 and 100, got {value}")]
    SpeedOutOfRange { value: u32 },

    #[error("Unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    #[error("Serial port name is empty")]
    EmptyPortName,

    #[error("Malformed sensor line {line:?}: {reason}")]
    MalformedSensorLine { line: String, reason: String },
}

/// Motor axis; Y drives the rotation stage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display,
    EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Jog direction along an axis
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    Negative,
    Positive,
}

impl Direction {
    pub fn sign(self) -> i32 {
        match self {
            Direction::Negative => -1,
            Direction::Positive => 1,
        }
    }
}

/// Jog speed as set on the console slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "u32", into = "u32")]
pub struct Speed(u32);

impl Speed {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(LinkError::SpeedOutOfRange { value })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(50)
    }
}

impl TryFrom<u32> for Speed {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Speed> for u32 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

/// Linear move of one axis by a signed offset, sent as `G01 <axis><offset>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MotorCommand {
    pub axis: Axis,
    pub offset: i32,
}

impl MotorCommand {
    /// Command issued by one press of a jog button
    pub fn jog(axis: Axis, direction: Direction, speed: Speed) -> Self {
        Self {
            axis,
            offset: direction.sign() * speed.get() as i32,
        }
    }

    /// Command with its line terminator, ready to be written to the port
    pub fn to_line(&self) -> String {
        format!("{self}{}", SerialSettings::LINE_ENDING)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G01 {}{}", self.axis, self.offset)
    }
}

/// One line reported by the linear sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SensorReading {
    pub x: f64,
    /// Rotation stage position, reported in the Y field
    pub rotation: f64,
    pub z: f64,
}

impl SensorReading {
    /// Parse a line, falling back to all zeros when it cannot be read
    pub fn parse_or_zero(line: &str) -> Self {
        line.parse().unwrap_or_else(|err: LinkError| {
            warn!("{err}");
            Self::default()
        })
    }
}

impl FromStr for SensorReading {
    type Err = LinkError;

    fn from_str(line: &str) -> Result<Self> {
        let malformed = |reason: String| LinkError::MalformedSensorLine {
            line: line.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
        }

        let mut values = [0.0f64; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field
                .parse()
                .map_err(|_| malformed(format!("{field:?} is not a number")))?;
        }

        Ok(Self {
            x: values[0],
            rotation: values[1],
            z: values[2],
        })
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {:.2}, Z: {:.2}, Rotation: {:.2}",
            self.x, self.z, self.rotation
        )
    }
}

/// Port selection for either link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SerialSettings {
    /// Port name, e.g. `COM3` or `/dev/ttyUSB0`
    pub port: String,
    pub baud_rate: u32,
}

impl SerialSettings {
    pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

    /// Line terminator of both links
    pub const LINE_ENDING: &'static str = "\n";

    pub fn new(port: impl Into<String>, baud_rate: u32) -> Result<Self> {
        let settings = Self {
            port: port.into(),
            baud_rate,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(LinkError::EmptyPortName);
        }
        if !Self::BAUD_RATES.contains(&self.baud_rate) {
            return Err(LinkError::UnsupportedBaudRate(self.baud_rate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_jog_commands() {
        let speed = Speed::new(25).unwrap();
        assert_eq!(MotorCommand::jog(Axis::X, Direction::Positive, speed).to_string(), "G01 X25");
        assert_eq!(MotorCommand::jog(Axis::Z, Direction::Negative, speed).to_string(), "G01 Z-25");
        assert_eq!(
            MotorCommand::jog(Axis::Y, Direction::Negative, Speed::default()).to_line(),
            "G01 Y-50\n"
        );
    }

    #[test]
    fn test_every_axis_has_both_directions() {
        let lines: Vec<String> = Axis::iter()
            .flat_map(|axis| {
                Direction::iter().map(move |dir| MotorCommand::jog(axis, dir, Speed::default()).to_string())
            })
            .collect();
        assert_eq!(lines.len(), 6);
        assert!(lines.contains(&"G01 Y50".to_string()));
    }

    #[test]
    fn test_speed_bounds() {
        assert!(Speed::new(0).is_err());
        assert!(Speed::new(1).is_ok());
        assert!(Speed::new(100).is_ok());
        assert_eq!(Speed::new(101), Err(LinkError::SpeedOutOfRange { value: 101 }));
        assert_eq!(Speed::default().get(), 50);
    }

    #[test]
    fn test_speed_deserialization_is_checked() {
        assert!(serde_json::from_str::<Speed>("75").is_ok());
        assert!(serde_json::from_str::<Speed>("250").is_err());
    }

    #[test]
    fn test_axis_and_direction_parse() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("Negative".parse::<Direction>().unwrap(), Direction::Negative);
        assert!("w".parse::<Axis>().is_err());
    }

    #[test]
    fn test_sensor_line_parsing() {
        let reading: SensorReading = "12.5 -3.25 7".parse().unwrap();
        assert_eq!(
            reading,
            SensorReading {
                x: 12.5,
                rotation: -3.25,
                z: 7.0
            }
        );
        assert_eq!(reading.to_string(), "X: 12.50, Z: 7.00, Rotation: -3.25");
    }

    #[test]
    fn test_sensor_line_tolerates_extra_fields_and_line_ending() {
        let reading: SensorReading = "1 2 3 4\r\n".parse().unwrap();
        assert_eq!(reading.z, 3.0);
    }

    #[test]
    fn test_malformed_sensor_lines() {
        assert!("1 2".parse::<SensorReading>().is_err());
        assert!("1 two 3".parse::<SensorReading>().is_err());
        assert_eq!(SensorReading::parse_or_zero("garbage"), SensorReading::default());
        assert_eq!(SensorReading::parse_or_zero("1 2 3").rotation, 2.0);
        assert_eq!(
            SensorReading::parse_or_zero("").to_string(),
            "X: 0.00, Z: 0.00, Rotation: 0.00"
        );
    }

    #[test]
    fn test_serial_settings_validation() {
        assert!(SerialSettings::new("COM3", 115200).is_ok());
        assert_eq!(
            SerialSettings::new("COM3", 14400),
            Err(LinkError::UnsupportedBaudRate(14400))
        );
        assert_eq!(SerialSettings::new("  ", 9600), Err(LinkError::EmptyPortName));
    }
}
