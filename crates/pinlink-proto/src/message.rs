//! JSON message codec.
//!
//! Every message is one JSON document with a header and a batch of items:
//!
//! ```json
//! {"header":{"version":0.4},"data":[{"id":200,"action":10,"params":[5,8,82]}]}
//! ```
//!
//! Hosts send [`Command`] items, boards answer with [`Reading`] items. On
//! byte streams each message is terminated by a newline.

use crate::{Action, Result, PROTOCOL_VERSION};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

/// Message header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: f32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
        }
    }
}

/// A batch of items with a header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<T> {
    #[serde(default)]
    pub header: Header,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Message<T> {
    /// Creates a message with the current header.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            header: Header::default(),
            data,
        }
    }

    /// Creates a message carrying one item.
    pub fn single(item: T) -> Self {
        Self::new(vec![item])
    }
}

impl<T: Serialize> Message<T> {
    /// Encodes as a newline-terminated JSON line.
    pub fn encode_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl<T: DeserializeOwned> Message<T> {
    /// Decodes one JSON line. Surrounding whitespace is ignored.
    pub fn decode_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Host-to-board command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Target device ID. Decoded wide so one bad command does not reject
    /// the batch it travels in.
    pub id: i64,
    /// Action code.
    pub action: i64,
    /// Integer parameters. Fractional JSON numbers are rounded.
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: Vec<i64>,
    /// Reporting interval in milliseconds for registered reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl Command {
    /// Creates a command without an interval.
    pub fn new(id: u16, action: Action, params: Vec<i64>) -> Self {
        Self {
            id: i64::from(id),
            action: i64::from(action.code()),
            params,
            interval: None,
        }
    }

    /// Returns a parameter by position.
    pub fn param(&self, index: usize) -> Option<i64> {
        self.params.get(index).copied()
    }
}

/// Board-to-host pin reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Pin the value was read from.
    pub id: u16,
    /// Read action code the value answers.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Level or ADC sample.
    pub value: i64,
}

fn deserialize_params<'de, D>(deserializer: D) -> std::result::Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let numbers = Vec::<serde_json::Number>::deserialize(deserializer)?;
    numbers
        .iter()
        .map(|n| {
            n.as_i64()
                .or_else(|| n.as_u64().map(|v| v as i64))
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .ok_or_else(|| D::Error::custom(format!("invalid parameter: {}", n)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_command_line() {
        let line =
            r#"{"header":{"version":0.3},"data":[{"id":200,"action":10,"params":[5,8,82]}]}"#;
        let msg = Message::<Command>::decode_line(line).unwrap();
        assert_eq!(msg.header.version, 0.3);
        assert_eq!(msg.data.len(), 1);
        assert_eq!(msg.data[0].id, 200);
        assert_eq!(msg.data[0].action, 10);
        assert_eq!(msg.data[0].params, vec![5, 8, 82]);
        assert_eq!(msg.data[0].interval, None);
    }

    #[test]
    fn test_fractional_params_are_rounded() {
        let line = r#"{"data":[{"id":3,"action":4,"params":[3,127.6]}]}"#;
        let msg = Message::<Command>::decode_line(line).unwrap();
        assert_eq!(msg.header, Header::default());
        assert_eq!(msg.data[0].params, vec![3, 128]);
    }

    #[test]
    fn test_missing_params_and_null_interval() {
        let line = r#"{"data":[{"id":200,"action":15,"interval":null}]}"#;
        let msg = Message::<Command>::decode_line(line).unwrap();
        assert!(msg.data[0].params.is_empty());
        assert_eq!(msg.data[0].interval, None);
    }

    #[test]
    fn test_encode_line() {
        let msg = Message::single(Command::new(13, Action::DigitalWrite, vec![13, 1]));
        let line = msg.encode_line().unwrap();
        assert!(line.ends_with('\n'));
        assert!(!line.contains("interval"));
        assert_eq!(Message::<Command>::decode_line(&line).unwrap(), msg);
    }

    #[test]
    fn test_reading_type_field() {
        let msg = Message::single(Reading {
            id: 14,
            kind: Action::AnalogRead.code(),
            value: 512,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["data"][0]["type"], 5);
        assert_eq!(json["data"][0]["value"], 512);
    }

    #[test]
    fn test_out_of_range_codes_decode() {
        let line = r#"{"data":[{"id":-1,"action":3},{"id":3,"action":300},{"id":3,"action":3}]}"#;
        let msg = Message::<Command>::decode_line(line).unwrap();
        assert_eq!(msg.data.len(), 3);
        assert_eq!(msg.data[0].id, -1);
        assert_eq!(msg.data[1].action, 300);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(Message::<Command>::decode_line("not json").is_err());
        assert!(Message::<Command>::decode_line(r#"{"data":[{"id":1}]}"#).is_err());
    }
}
