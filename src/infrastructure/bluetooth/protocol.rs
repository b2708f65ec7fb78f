//! Coordinate Sync Protocol
//!
//! Attribute table layout and the payload codec shared by both roles.
//!
//! # Payloads
//!
//! ```text
//! split layout     one axis per attribute       "87"
//! combined layout  both axes in one attribute   "87,120"
//! ```
//!
//! Values are ASCII decimal. Decoding is lenient: an optional sign followed by
//! digits is read and anything after the first non-digit is ignored, so
//! `"87,stray"` decodes to 87 on a single-axis attribute.

use crate::domain::error::SyncError;
use crate::domain::models::{AttributeLayout, Coordinate, Role};
use crate::domain::settings::Settings;

/// What a peer may do with a hosted attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeProperties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl AttributeProperties {
    pub const READ_NOTIFY: Self = Self {
        read: true,
        write: false,
        notify: true,
    };
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        notify: false,
    };
    pub const READ_WRITE_NOTIFY: Self = Self {
        read: true,
        write: true,
        notify: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub uuid: String,
    pub properties: AttributeProperties,
    pub initial_value: Vec<u8>,
}

/// Service hosted by the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub uuid: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Attributes carrying one direction of coordinate traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Combined(String),
    Split { x: String, y: String },
}

impl Channel {
    pub fn uuids(&self) -> Vec<&str> {
        match self {
            Self::Combined(uuid) => vec![uuid.as_str()],
            Self::Split { x, y } => vec![x.as_str(), y.as_str()],
        }
    }
}

/// Inbound and outbound attributes as seen from one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateChannels {
    /// Attributes the peer updates and this device decodes
    pub inbound: Channel,
    /// Attributes this device writes its own position to
    pub outbound: Channel,
}

impl CoordinateChannels {
    pub fn for_role(settings: &Settings, role: Role) -> Self {
        match settings.layout {
            AttributeLayout::Combined => Self {
                inbound: Channel::Combined(settings.combined_char_uuid.clone()),
                outbound: Channel::Combined(settings.combined_char_uuid.clone()),
            },
            AttributeLayout::Split => {
                let readable = Channel::Split {
                    x: settings.read_x_char_uuid.clone(),
                    y: settings.read_y_char_uuid.clone(),
                };
                let writable = Channel::Split {
                    x: settings.write_x_char_uuid.clone(),
                    y: settings.write_y_char_uuid.clone(),
                };
                match role {
                    Role::Publisher => Self {
                        inbound: writable,
                        outbound: readable,
                    },
                    Role::Subscriber => Self {
                        inbound: readable,
                        outbound: writable,
                    },
                }
            }
        }
    }

    /// Every attribute that must resolve before the session counts as connected
    pub fn required_uuids(&self) -> Vec<&str> {
        let mut uuids = self.inbound.uuids();
        for uuid in self.outbound.uuids() {
            if !uuids.contains(&uuid) {
                uuids.push(uuid);
            }
        }
        uuids
    }
}

/// Attribute table the publisher hosts, seeded with its start position
pub fn service_spec(settings: &Settings, initial: Coordinate) -> ServiceSpec {
    let attributes = match settings.layout {
        AttributeLayout::Combined => vec![AttributeSpec {
            uuid: settings.combined_char_uuid.clone(),
            properties: AttributeProperties::READ_WRITE_NOTIFY,
            initial_value: encode_pair(initial),
        }],
        AttributeLayout::Split => vec![
            AttributeSpec {
                uuid: settings.read_x_char_uuid.clone(),
                properties: AttributeProperties::READ_NOTIFY,
                initial_value: encode_axis(initial.x),
            },
            AttributeSpec {
                uuid: settings.read_y_char_uuid.clone(),
                properties: AttributeProperties::READ_NOTIFY,
                initial_value: encode_axis(initial.y),
            },
            AttributeSpec {
                uuid: settings.write_x_char_uuid.clone(),
                properties: AttributeProperties::WRITE,
                initial_value: Vec::new(),
            },
            AttributeSpec {
                uuid: settings.write_y_char_uuid.clone(),
                properties: AttributeProperties::WRITE,
                initial_value: Vec::new(),
            },
        ],
    };

    ServiceSpec {
        uuid: settings.service_uuid.clone(),
        attributes,
    }
}

pub fn encode_axis(value: i32) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn encode_pair(coord: Coordinate) -> Vec<u8> {
    format!("{},{}", coord.x, coord.y).into_bytes()
}

/// Lenient decimal parse bounded by the payload length
pub fn decode_axis(payload: &[u8]) -> Result<i32, SyncError> {
    let failure = || SyncError::DecodeFailure(String::from_utf8_lossy(payload).into_owned());

    let mut bytes = payload
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let mut magnitude: i64 = 0;
    let mut digits = 0usize;
    for b in bytes.take_while(|b| b.is_ascii_digit()) {
        magnitude = magnitude * 10 + i64::from(b - b'0');
        if magnitude > i64::from(i32::MAX) + 1 {
            return Err(failure());
        }
        digits += 1;
    }

    if digits == 0 {
        return Err(failure());
    }

    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| failure())
}

/// Decode `"x,y"`. Each side decodes on its own so one bad half keeps the other.
pub fn decode_pair(payload: &[u8]) -> (Result<i32, SyncError>, Result<i32, SyncError>) {
    match payload.iter().position(|&b| b == b',') {
        Some(comma) => (
            decode_axis(&payload[..comma]),
            decode_axis(&payload[comma + 1..]),
        ),
        None => {
            let failure = SyncError::DecodeFailure(String::from_utf8_lossy(payload).into_owned());
            (Err(failure.clone()), Err(failure))
        }
    }
}
