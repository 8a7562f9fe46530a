use crate::error::ProtocolError;
use crate::model::room::RoomId;
use crate::model::signaling::SignalMessage;
use crate::model::user::UserId;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};

/// A signaling message plus its routing header.
///
/// On the wire the header fields sit next to `type` in one flat JSON object:
/// `{"type":"video-offer","target":"bob","name":"alice","sdp":{...}}`.
/// A missing `target` means "everyone else in the room".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(flatten)]
    pub body: SignalMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, alias = "date")]
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(body: SignalMessage) -> Self {
        Self {
            body,
            sender: None,
            target: None,
            room_id: None,
            timestamp: now_millis(),
        }
    }

    pub fn from_user(mut self, sender: UserId) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn to_user(mut self, target: UserId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn in_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    /// Parses one text frame. Unknown `type` values are reported separately
    /// from malformed JSON so the relay can log them distinctly.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        if !SignalMessage::KNOWN_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_owned()));
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
