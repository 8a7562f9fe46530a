use crate::capability::{
    Capability, CandidateCallback, ConnectivityCallback, ConnectivityState,
};
use crate::error::CapabilityError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use switchboard_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3};
use switchboard_core::{Descriptor, DescriptorKind, IceCandidate, IceServerConfig};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

#[derive(Debug, Clone)]
pub struct WebRtcConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Label of a pre-negotiated data channel (id 0) both ends open, so the
    /// first offer has something to describe. `None` leaves the connection
    /// empty for the owner to add tracks to.
    pub data_channel: Option<String>,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: [DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3]
                    .map(String::from)
                    .to_vec(),
                username: None,
                credential: None,
            }],
            data_channel: Some("switchboard".to_owned()),
        }
    }
}

/// [`Capability`] backed by a `webrtc` peer connection.
pub struct WebRtcCapability {
    peer_connection: Arc<RTCPeerConnection>,
    restart_requested: AtomicBool,
}

impl WebRtcCapability {
    pub async fn new(config: WebRtcConfig) -> Result<Self, CapabilityError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()
            .map_err(|e| CapabilityError::operation("register codecs", e))?;
        let registry = register_default_interceptors(Registry::new(), &mut m)
            .map_err(|e| CapabilityError::operation("register interceptors", e))?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|s| RTCIceServer {
                    urls: s.urls,
                    username: s.username.unwrap_or_default(),
                    credential: s.credential.unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| CapabilityError::operation("create peer connection", e))?,
        );

        if let Some(label) = config.data_channel {
            let init = RTCDataChannelInit {
                negotiated: Some(0),
                ..Default::default()
            };
            peer_connection
                .create_data_channel(&label, Some(init))
                .await
                .map_err(|e| CapabilityError::operation("create data channel", e))?;
        }

        Ok(Self {
            peer_connection,
            restart_requested: AtomicBool::new(false),
        })
    }

    /// The underlying connection, for adding tracks or data channels.
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

fn to_rtc(descriptor: &Descriptor) -> Result<RTCSessionDescription, CapabilityError> {
    let sdp = descriptor.sdp.clone();
    match descriptor.kind {
        DescriptorKind::Offer => RTCSessionDescription::offer(sdp),
        DescriptorKind::Answer => RTCSessionDescription::answer(sdp),
    }
    .map_err(|e| CapabilityError::operation("parse descriptor", e))
}

fn from_rtc(description: RTCSessionDescription) -> Result<Descriptor, CapabilityError> {
    match description.sdp_type {
        RTCSdpType::Offer => Ok(Descriptor::offer(description.sdp)),
        RTCSdpType::Answer => Ok(Descriptor::answer(description.sdp)),
        other => Err(CapabilityError::operation(
            "convert descriptor",
            format!("unexpected sdp type {other}"),
        )),
    }
}

fn connectivity_from(state: RTCIceConnectionState) -> Option<ConnectivityState> {
    match state {
        RTCIceConnectionState::New => Some(ConnectivityState::New),
        RTCIceConnectionState::Checking => Some(ConnectivityState::Checking),
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            Some(ConnectivityState::Connected)
        }
        RTCIceConnectionState::Disconnected => Some(ConnectivityState::Disconnected),
        RTCIceConnectionState::Failed => Some(ConnectivityState::Failed),
        RTCIceConnectionState::Closed => Some(ConnectivityState::Closed),
        _ => None,
    }
}

#[async_trait]
impl Capability for WebRtcCapability {
    async fn generate_offer(&self) -> Result<Descriptor, CapabilityError> {
        let ice_restart = self.restart_requested.swap(false, Ordering::SeqCst);
        let options = RTCOfferOptions {
            ice_restart,
            ..Default::default()
        };

        let offer = self
            .peer_connection
            .create_offer(Some(options))
            .await
            .map_err(|e| CapabilityError::operation("create offer", e))?;
        from_rtc(offer)
    }

    async fn generate_answer(&self) -> Result<Descriptor, CapabilityError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| CapabilityError::operation("create answer", e))?;
        from_rtc(answer)
    }

    async fn apply_local_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError> {
        self.peer_connection
            .set_local_description(to_rtc(descriptor)?)
            .await
            .map_err(|e| CapabilityError::operation("set local description", e))
    }

    async fn apply_remote_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError> {
        if descriptor.kind == DescriptorKind::Offer
            && self.peer_connection.signaling_state() == RTCSignalingState::HaveLocalOffer
        {
            info!("Rolling back local offer for incoming remote offer");
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            self.peer_connection
                .set_local_description(rollback)
                .await
                .map_err(|e| CapabilityError::operation("rollback", e))?;
        }

        self.peer_connection
            .set_remote_description(to_rtc(descriptor)?)
            .await
            .map_err(|e| CapabilityError::operation("set remote description", e))
    }

    async fn add_candidate(&self, candidate: Option<&IceCandidate>) -> Result<(), CapabilityError> {
        let Some(candidate) = candidate else {
            debug!("Remote end of candidates");
            return Ok(());
        };

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment.clone(),
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| CapabilityError::StaleCandidate(e.to_string()))
    }

    fn on_candidate_discovered(&self, callback: CandidateCallback) {
        let callback = Arc::new(callback);
        self.peer_connection
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let callback = callback.clone();
                Box::pin(async move {
                    let Some(candidate) = c else {
                        callback(None);
                        return;
                    };
                    match candidate.to_json() {
                        Ok(json) => callback(Some(IceCandidate {
                            candidate: json.candidate,
                            sdp_mid: json.sdp_mid,
                            sdp_m_line_index: json.sdp_mline_index,
                            username_fragment: json.username_fragment,
                        })),
                        Err(e) => warn!("Failed to serialize local candidate: {}", e),
                    }
                })
            }));
    }

    fn on_connectivity_state_changed(&self, callback: ConnectivityCallback) {
        let callback = Arc::new(callback);
        self.peer_connection
            .on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
                let callback = callback.clone();
                Box::pin(async move {
                    debug!("ICE connection state changed: {}", s);
                    if let Some(state) = connectivity_from(s) {
                        callback(state);
                    }
                })
            }));
    }

    async fn restart_connectivity(&self) -> Result<(), CapabilityError> {
        self.restart_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn teardown(&self) {
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
    }
}
