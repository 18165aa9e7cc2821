//! Rendering a [`Reading`] into a message body
//!
//! The body is a flat mapping with three fixed keys. Two renderings exist:
//! the single-quoted mapping that deployed dashboards already parse, and plain
//! JSON for consumers that want a strict interchange format.

use core::fmt::{self, Write};

use heapless::String;

use crate::error::PayloadError;
use crate::model::Reading;
use crate::scaling::to_hundredths;

/// Capacity of a rendered payload
pub const PAYLOAD_CAPACITY: usize = 96;

/// Keys of every payload, in emission order
pub const KEYS: [&str; 3] = ["temperature", "ph", "dissolved_oxygen"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// `{'temperature': 23.5, 'ph': 7.12, 'dissolved_oxygen': 8.4}`
    #[default]
    Repr,
    /// `{"temperature":23.5,"ph":7.12,"dissolved_oxygen":8.4}`
    Json,
}

impl PayloadFormat {
    /// Parse the build-time setting, `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "repr" => Some(PayloadFormat::Repr),
            "json" => Some(PayloadFormat::Json),
            _ => None,
        }
    }

    fn quote(self) -> char {
        match self {
            PayloadFormat::Repr => '\'',
            PayloadFormat::Json => '"',
        }
    }

    fn separator(self) -> &'static str {
        match self {
            PayloadFormat::Repr => ": ",
            PayloadFormat::Json => ":",
        }
    }

    fn delimiter(self) -> &'static str {
        match self {
            PayloadFormat::Repr => ", ",
            PayloadFormat::Json => ",",
        }
    }
}

/// Render `reading` in the requested format
pub fn render(
    reading: &Reading,
    format: PayloadFormat,
) -> Result<String<PAYLOAD_CAPACITY>, PayloadError> {
    let mut out = String::new();
    write_payload(&mut out, reading, format).map_err(|_| PayloadError::Overflow {
        capacity: PAYLOAD_CAPACITY,
    })?;
    Ok(out)
}

fn write_payload<W: Write>(out: &mut W, reading: &Reading, format: PayloadFormat) -> fmt::Result {
    let values = [reading.temperature, reading.ph, reading.dissolved_oxygen];
    let quote = format.quote();

    out.write_char('{')?;
    for (index, (key, value)) in KEYS.iter().zip(values).enumerate() {
        if index > 0 {
            out.write_str(format.delimiter())?;
        }
        write!(out, "{quote}{key}{quote}{}", format.separator())?;
        write_decimal(out, value)?;
    }
    out.write_char('}')
}

/// Shortest of one or two decimals, always at least one: 25.0, 8.4, 7.12
fn write_decimal<W: Write>(out: &mut W, value: f32) -> fmt::Result {
    let centi = to_hundredths(value);
    let magnitude = centi.unsigned_abs();
    let whole = magnitude / 100;
    let frac = magnitude % 100;

    if centi < 0 {
        out.write_char('-')?;
    }
    if frac % 10 == 0 {
        write!(out, "{}.{}", whole, frac / 10)
    } else {
        write!(out, "{}.{:02}", whole, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_rendering() {
        let reading = Reading::new(23.5, 7.12, 8.4);
        let payload = render(&reading, PayloadFormat::Repr).unwrap();
        assert_eq!(
            payload.as_str(),
            "{'temperature': 23.5, 'ph': 7.12, 'dissolved_oxygen': 8.4}"
        );
    }

    #[test]
    fn test_json_rendering() {
        let reading = Reading::new(23.5, 7.12, 8.4);
        let payload = render(&reading, PayloadFormat::Json).unwrap();
        assert_eq!(
            payload.as_str(),
            "{\"temperature\":23.5,\"ph\":7.12,\"dissolved_oxygen\":8.4}"
        );
    }

    #[test]
    fn test_decimal_forms() {
        let reading = Reading::new(25.0, 0.05, 14.0);
        let payload = render(&reading, PayloadFormat::Repr).unwrap();
        assert_eq!(
            payload.as_str(),
            "{'temperature': 25.0, 'ph': 0.05, 'dissolved_oxygen': 14.0}"
        );

        let reading = Reading::new(-10.125, 0.0, 20.0);
        let payload = render(&reading, PayloadFormat::Json).unwrap();
        assert_eq!(
            payload.as_str(),
            "{\"temperature\":-10.12,\"ph\":0.0,\"dissolved_oxygen\":20.0}"
        );
    }

    #[test]
    fn test_sensor_ties_publish_rounded_to_even() {
        let reading = Reading::new(25.125, 7.0, 10.0);
        let payload = render(&reading, PayloadFormat::Repr).unwrap();
        assert_eq!(
            payload.as_str(),
            "{'temperature': 25.12, 'ph': 7.0, 'dissolved_oxygen': 10.0}"
        );

        let reading = Reading::new(25.375, 7.0, 10.0);
        let payload = render(&reading, PayloadFormat::Repr).unwrap();
        assert!(payload.starts_with("{'temperature': 25.38,"));
    }

    #[test]
    fn test_payload_has_exactly_three_numeric_keys() {
        let reading = Reading::new(-55.0, 14.0, 20.0);
        for format in [PayloadFormat::Repr, PayloadFormat::Json] {
            let payload = render(&reading, format).unwrap();
            let body = payload.trim_start_matches('{').trim_end_matches('}');

            let mut count = 0;
            for (entry, key) in body.split(format.delimiter()).zip(KEYS) {
                let (name, value) = entry.split_once(':').unwrap();
                let name = name.trim_matches(|c| c == '\'' || c == '"');
                assert_eq!(name, key);
                assert!(value.trim().parse::<f32>().is_ok(), "{} not numeric", value);
                count += 1;
            }
            assert_eq!(count, 3);
            assert_eq!(body.split(format.delimiter()).count(), 3);
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(PayloadFormat::from_name("repr"), Some(PayloadFormat::Repr));
        assert_eq!(PayloadFormat::from_name("json"), Some(PayloadFormat::Json));
        assert_eq!(PayloadFormat::from_name("xml"), None);
    }
}
