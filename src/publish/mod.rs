use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice::network_type::NetworkType;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_local::TrackLocal;

use crate::error::{GenStreamError, Result};

pub struct WebRtcConfig {
    pub stun_servers: Vec<String>,
    pub turn_servers: Vec<TurnServer>,
}

pub struct TurnServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

impl Default for WebRtcConfig {
    fn default() -> Self {
        let stun_server = std::env::var("STUN_SERVER_URL")
            .unwrap_or_else(|_| "stun:stun.l.google.com:19302".to_string());

        let mut turn_servers = vec![];

        if let (Ok(turn_url), Ok(username), Ok(credential)) = (
            std::env::var("TURN_SERVER_URL"),
            std::env::var("TURN_USERNAME"),
            std::env::var("TURN_CREDENTIAL"),
        ) {
            turn_servers.push(TurnServer {
                urls: vec![turn_url],
                username,
                credential,
            });
        }

        Self {
            stun_servers: vec![stun_server],
            turn_servers,
        }
    }
}

fn create_webrtc_api() -> Result<Arc<API>> {
    let mut media_engine = MediaEngine::default();

    media_engine
        .register_codec(
            RTCRtpCodecParameters {
                capability: RTCRtpCodecCapability {
                    mime_type: "video/VP8".to_string(),
                    clock_rate: 90000,
                    channels: 0,
                    sdp_fmtp_line: "".to_string(),
                    rtcp_feedback: vec![],
                },
                payload_type: 96,
                ..Default::default()
            },
            RTPCodecType::Video,
        )
        .map_err(|e| GenStreamError::PeerConnectionCreation(format!("VP8 codec: {}", e)))?;

    media_engine
        .register_codec(
            RTCRtpCodecParameters {
                capability: RTCRtpCodecCapability {
                    mime_type: "audio/opus".to_string(),
                    clock_rate: 48000,
                    channels: 2,
                    sdp_fmtp_line: "minptime=10;useinbandfec=1".to_string(),
                    rtcp_feedback: vec![],
                },
                payload_type: 111,
                ..Default::default()
            },
            RTPCodecType::Audio,
        )
        .map_err(|e| GenStreamError::PeerConnectionCreation(format!("Opus codec: {}", e)))?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)
        .map_err(|e| GenStreamError::PeerConnectionCreation(format!("Interceptors: {}", e)))?;

    // IPv4 only to avoid IPv6 binding errors; mDNS off to cut warning noise
    let mut setting_engine = SettingEngine::default();
    setting_engine.set_network_types(vec![NetworkType::Udp4, NetworkType::Tcp4]);
    setting_engine.set_ice_multicast_dns_mode(webrtc::ice::mdns::MulticastDnsMode::Disabled);

    Ok(Arc::new(
        APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build(),
    ))
}

pub fn get_ice_servers(config: &WebRtcConfig) -> Vec<RTCIceServer> {
    let mut ice_servers = Vec::new();

    for stun_server in &config.stun_servers {
        ice_servers.push(RTCIceServer {
            urls: vec![stun_server.clone()],
            ..Default::default()
        });
    }

    for turn_server in &config.turn_servers {
        ice_servers.push(RTCIceServer {
            urls: turn_server.urls.clone(),
            username: turn_server.username.clone(),
            credential: turn_server.credential.clone(),
            credential_type:
                webrtc::ice_transport::ice_credential_type::RTCIceCredentialType::Password,
        });
    }

    ice_servers
}

/// Pushes the local camera feed to the remote session's publish endpoint
/// with a WHIP-style offer/answer handshake: one HTTPS POST of the offer
/// SDP, answer SDP in the response body.
pub struct TransportPublisher {
    peer_connection: Arc<RTCPeerConnection>,
    http: reqwest::Client,
    /// WHIP resource URL from the Location header, for teardown
    resource_url: Option<String>,
}

impl TransportPublisher {
    /// Negotiate and start publishing the given local tracks. With no
    /// tracks, send-only transceivers are still negotiated so the session
    /// goes live (headless smoke runs).
    pub async fn connect(
        config: &WebRtcConfig,
        whip_url: &str,
        bearer_token: Option<&str>,
        tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Result<Self> {
        let api = create_webrtc_api()?;

        let rtc_config = RTCConfiguration {
            ice_servers: get_ice_servers(config),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await.map_err(
            |e| GenStreamError::PeerConnectionCreation(e.to_string()),
        )?);

        if tracks.is_empty() {
            for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
                peer_connection
                    .add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Sendonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
            }
        } else {
            for track in tracks {
                peer_connection.add_track(track).await?;
            }
        }

        peer_connection.on_ice_connection_state_change(Box::new(move |state| {
            tracing::debug!(ice_state = %state, "ICE connection state changed");
            Box::pin(async {})
        }));

        let offer = peer_connection.create_offer(None).await?;
        let mut gather_complete = peer_connection.gathering_complete_promise().await;
        peer_connection.set_local_description(offer).await?;
        let _ = gather_complete.recv().await;

        let local = peer_connection
            .local_description()
            .await
            .ok_or_else(|| GenStreamError::InvalidSdp("No local description".to_string()))?;

        let mut request = reqwest::Client::new()
            .post(whip_url)
            .header("Content-Type", "application/sdp")
            .body(local.sdp.clone());
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenStreamError::HandshakeFailed(format!("Publish POST failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenStreamError::HandshakeFailed(format!(
                "Publish endpoint returned {}: {}",
                status, body
            )));
        }

        let resource_url = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let answer_sdp = response
            .text()
            .await
            .map_err(|e| GenStreamError::HandshakeFailed(format!("Answer body: {}", e)))?;

        let answer = RTCSessionDescription::answer(answer_sdp)
            .map_err(|e| GenStreamError::InvalidSdp(e.to_string()))?;
        peer_connection.set_remote_description(answer).await?;

        tracing::info!(whip_url = %whip_url, "Publish handshake complete");

        Ok(Self {
            peer_connection,
            http: reqwest::Client::new(),
            resource_url,
        })
    }

    /// Tear down the publish leg. Deletes the WHIP resource when the server
    /// announced one.
    pub async fn close(&self) {
        if let Some(url) = &self.resource_url {
            if let Err(e) = self.http.delete(url).send().await {
                tracing::warn!(error = %e, "Failed to delete publish resource");
            }
        }
        let _ = self.peer_connection.close().await;
        tracing::info!("Publisher closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_stun() {
        std::env::remove_var("STUN_SERVER_URL");
        let config = WebRtcConfig::default();
        assert_eq!(config.stun_servers.len(), 1);
        assert!(config.stun_servers[0].starts_with("stun:"));
    }

    #[test]
    fn test_ice_servers_include_turn_credentials() {
        let config = WebRtcConfig {
            stun_servers: vec!["stun:stun.example.com:3478".to_string()],
            turn_servers: vec![TurnServer {
                urls: vec!["turn:turn.example.com:3478".to_string()],
                username: "user".to_string(),
                credential: "pass".to_string(),
            }],
        };

        let servers = get_ice_servers(&config);
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].username, "user");
    }
}
