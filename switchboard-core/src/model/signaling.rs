use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Offer,
    Answer,
}

/// Session description. The sdp body is never inspected here; it travels
/// between the wire and the media engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "type")]
    pub kind: DescriptorKind,
    pub sdp: String,
}

impl Descriptor {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: DescriptorKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: DescriptorKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One trickled connectivity candidate, shaped like `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Id {
        id: UserId,
    },
    Username {
        name: String,
        #[serde(default)]
        id: Option<UserId>,
    },
    #[serde(rename = "rejectusername")]
    RejectUsername {
        name: String,
    },
    #[serde(rename = "userlist")]
    UserList {
        users: Vec<String>,
    },
    VideoOffer {
        #[serde(default)]
        name: String,
        sdp: Descriptor,
    },
    VideoAnswer {
        #[serde(default)]
        name: String,
        sdp: Descriptor,
    },
    /// `candidate: null` marks the end of the remote candidate sequence.
    NewIceCandidate {
        #[serde(default)]
        candidate: Option<IceCandidate>,
    },
    HangUp {
        #[serde(default)]
        name: String,
    },
    JoinRoom,
    LeaveRoom,
    JoinSuccess {
        user_id: UserId,
        #[serde(default)]
        members: Vec<UserId>,
    },
    JoinRejected {
        reason: String,
    },
    UserJoined {
        user_id: UserId,
    },
    UserLeft {
        user_id: UserId,
    },
    Chat {
        message: String,
    },
}

impl SignalMessage {
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "id",
        "username",
        "rejectusername",
        "userlist",
        "video-offer",
        "video-answer",
        "new-ice-candidate",
        "hang-up",
        "join-room",
        "leave-room",
        "join-success",
        "join-rejected",
        "user-joined",
        "user-left",
        "chat",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Id { .. } => "id",
            SignalMessage::Username { .. } => "username",
            SignalMessage::RejectUsername { .. } => "rejectusername",
            SignalMessage::UserList { .. } => "userlist",
            SignalMessage::VideoOffer { .. } => "video-offer",
            SignalMessage::VideoAnswer { .. } => "video-answer",
            SignalMessage::NewIceCandidate { .. } => "new-ice-candidate",
            SignalMessage::HangUp { .. } => "hang-up",
            SignalMessage::JoinRoom => "join-room",
            SignalMessage::LeaveRoom => "leave-room",
            SignalMessage::JoinSuccess { .. } => "join-success",
            SignalMessage::JoinRejected { .. } => "join-rejected",
            SignalMessage::UserJoined { .. } => "user-joined",
            SignalMessage::UserLeft { .. } => "user-left",
            SignalMessage::Chat { .. } => "chat",
        }
    }

    /// Messages one peer addresses to another through the relay.
    pub fn is_peer_message(&self) -> bool {
        matches!(
            self,
            SignalMessage::VideoOffer { .. }
                | SignalMessage::VideoAnswer { .. }
                | SignalMessage::NewIceCandidate { .. }
                | SignalMessage::HangUp { .. }
                | SignalMessage::Chat { .. }
        )
    }
}
