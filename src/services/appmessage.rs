//! Outbound watch message and its dictionary wire encoding.
//!
//! The watch receives a flat dictionary of numbered tuples:
//!
//! ```text
//! count:u8  { key:u32le  type:u8  length:u16le  data[length] } * count
//! ```
//!
//! Type tags: 0 byte array, 1 NUL-terminated string, 2 unsigned integer,
//! 3 signed integer. Integers are always sent as 4 bytes.

use crate::errors::DeliveryError;
use crate::services::resolver::ResolvedConfig;
use crate::services::weather::WeatherReading;

/// Size of the watch inbox buffer; larger dictionaries are dropped by the watch.
pub const MAX_MESSAGE_BYTES: usize = 256;

/// Longest string value accepted in a tuple (length field is `u16`).
const MAX_TUPLE_DATA: usize = u16::MAX as usize;

const TUPLE_HEADER_BYTES: usize = 4 + 1 + 2;

const TYPE_CSTRING: u8 = 1;
const TYPE_INT: u8 = 3;

/// Dictionary keys shared with the watch app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKey {
    /// `TEMPERATUREC`
    TemperatureC = 0,
    /// `TEMPERATUREF`
    TemperatureF = 1,
    /// `CONDITIONS`
    Conditions = 2,
    /// `USECELSIUS`
    UseCelsius = 3,
    /// `APIKEY`
    ApiKey = 4,
}

impl MessageKey {
    pub fn id(self) -> u32 {
        self as u32
    }
}

/// A single dictionary value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    Int(i32),
    Str(String),
}

/// The fixed-schema message sent to the watch after a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub temperature_c: i32,
    pub temperature_f: i32,
    pub conditions: String,
    pub use_celsius: bool,
    /// Present only when the active key is echoed back to the watch.
    pub api_key: Option<String>,
}

impl OutboundMessage {
    pub fn new(reading: &WeatherReading, config: &ResolvedConfig, include_api_key: bool) -> Self {
        Self {
            temperature_c: reading.temperature_c,
            temperature_f: reading.temperature_f,
            conditions: reading.conditions.clone(),
            use_celsius: config.use_celsius,
            api_key: if include_api_key {
                config.api_key.as_ref().map(|k| k.as_str().to_string())
            } else {
                None
            },
        }
    }

    /// Tuples in key order.
    pub fn tuples(&self) -> Vec<(MessageKey, TupleValue)> {
        let mut tuples = vec![
            (MessageKey::TemperatureC, TupleValue::Int(self.temperature_c)),
            (MessageKey::TemperatureF, TupleValue::Int(self.temperature_f)),
            (
                MessageKey::Conditions,
                TupleValue::Str(self.conditions.clone()),
            ),
            (
                MessageKey::UseCelsius,
                TupleValue::Int(i32::from(self.use_celsius)),
            ),
        ];
        if let Some(key) = &self.api_key {
            tuples.push((MessageKey::ApiKey, TupleValue::Str(key.clone())));
        }
        tuples
    }

    /// Encode into the watch dictionary format, enforcing the inbox limit.
    pub fn encode(&self) -> Result<Vec<u8>, DeliveryError> {
        encode_tuples(&self.tuples(), MAX_MESSAGE_BYTES)
    }
}

/// Encode tuples, failing if the result would exceed `max_bytes`.
pub fn encode_tuples(
    tuples: &[(MessageKey, TupleValue)],
    max_bytes: usize,
) -> Result<Vec<u8>, DeliveryError> {
    let size = encoded_size(tuples);
    if size > max_bytes {
        return Err(DeliveryError::PayloadTooLarge {
            size,
            max: max_bytes,
        });
    }
    let count = u8::try_from(tuples.len()).map_err(|_| DeliveryError::PayloadTooLarge {
        size,
        max: max_bytes,
    })?;

    let mut buf = Vec::with_capacity(size);
    buf.push(count);
    for (key, value) in tuples {
        buf.extend_from_slice(&key.id().to_le_bytes());
        match value {
            TupleValue::Int(v) => {
                buf.push(TYPE_INT);
                buf.extend_from_slice(&4u16.to_le_bytes());
                buf.extend_from_slice(&v.to_le_bytes());
            }
            TupleValue::Str(s) => {
                let len = string_data_len(s);
                if len > MAX_TUPLE_DATA {
                    return Err(DeliveryError::PayloadTooLarge {
                        size,
                        max: max_bytes,
                    });
                }
                buf.push(TYPE_CSTRING);
                buf.extend_from_slice(&(len as u16).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
                buf.push(0);
            }
        }
    }
    Ok(buf)
}

/// Total encoded size in bytes, including the leading count byte.
pub fn encoded_size(tuples: &[(MessageKey, TupleValue)]) -> usize {
    1 + tuples
        .iter()
        .map(|(_, value)| {
            TUPLE_HEADER_BYTES
                + match value {
                    TupleValue::Int(_) => 4,
                    TupleValue::Str(s) => string_data_len(s),
                }
        })
        .sum::<usize>()
}

fn string_data_len(s: &str) -> usize {
    s.len() + 1
}
