//! Session control messages.
//!
//! The stream carries two message kinds: binary payloads (one raw
//! frame each) and UTF-8 text payloads holding a JSON-encoded control
//! record. The only recognized control record is `initial`, which
//! announces the stream geometry:
//!
//! ```json
//! {"type": "initial", "data": {"width": 320, "height": 240}}
//! ```
//!
//! Other `type` values are reserved; they parse into
//! [`ControlMessage::Unknown`] and are ignored, so new tags can be
//! added server-side without breaking old clients.

use serde::{Deserialize, Serialize};

use crate::error::LumaError;
use crate::geometry::Geometry;

/// Geometry payload carried by the `initial` control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Closed tagged-variant type over the control wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Stream session start, announcing frame geometry.
    Initial { data: Dimensions },

    /// Any unrecognized tag. Safely ignored.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Parse a text payload.
    ///
    /// A parse failure is recoverable: the ingestor logs it and keeps
    /// the connection alive.
    pub fn parse(text: &str) -> Result<Self, LumaError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The announced geometry, if this is a recognized `initial`
    /// message with valid (non-zero) dimensions.
    pub fn geometry(&self) -> Option<Geometry> {
        match self {
            ControlMessage::Initial { data } => Geometry::new(data.width, data.height).ok(),
            ControlMessage::Unknown => None,
        }
    }
}
