//! Per-peer protocol state
//!
//! One `PeerState` exists per stdio connection or HTTP session. Stateless
//! HTTP requests each get a throwaway one.

use {
    serde_json::Value,
    std::sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

#[derive(Debug, Default)]
pub struct PeerState {
    session_id: Option<String>,
    protocol_version: RwLock<Option<String>>,
    client_info: RwLock<Option<Value>>,
    initialized: AtomicBool,
}

impl PeerState {
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    /// Peer whose version is already known, e.g. from a request header
    pub fn with_protocol_version(session_id: Option<String>, version: impl Into<String>) -> Self {
        let peer = Self::new(session_id);
        peer.set_negotiated(version.into(), None);
        peer
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Negotiated version, if `initialize` has run
    pub fn protocol_version(&self) -> Option<String> {
        self.protocol_version
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn client_info(&self) -> Option<Value> {
        self.client_info
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn set_negotiated(&self, version: String, client_info: Option<Value>) {
        *self
            .protocol_version
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(version);
        if client_info.is_some() {
            *self
                .client_info
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = client_info;
        }
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Whether the peer has sent `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negotiation_is_recorded() {
        let peer = PeerState::new(Some("s1".into()));
        assert_eq!(peer.protocol_version(), None);

        peer.set_negotiated("2025-06-18".into(), Some(json!({"name": "client"})));
        assert_eq!(peer.protocol_version().as_deref(), Some("2025-06-18"));
        assert_eq!(peer.client_info().unwrap()["name"], "client");
        assert_eq!(peer.session_id(), Some("s1"));
    }

    #[test]
    fn test_initialized_flag() {
        let peer = PeerState::default();
        assert!(!peer.is_initialized());
        peer.mark_initialized();
        assert!(peer.is_initialized());
    }
}
