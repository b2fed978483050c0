//! Resource limits configuration for MCP servers
//!
//! Provides configurable limits to prevent resource exhaustion.

use {
    crate::{
        error::{McpError, McpResult},
        types::CapabilityKind,
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Configuration for various resource limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of concurrent HTTP sessions
    pub max_sessions: Option<usize>,

    /// Maximum message size in bytes, for stdio lines and HTTP bodies alike
    pub max_message_size: usize,

    /// Maximum number of tools that can be registered
    pub max_tools: Option<usize>,

    /// Maximum number of resources that can be registered.
    /// Resource templates are counted separately against the same bound.
    pub max_resources: Option<usize>,

    /// Maximum number of prompts that can be registered
    pub max_prompts: Option<usize>,

    /// Pending notifications kept per session while no stream is open.
    /// The oldest entry is dropped when the queue is full.
    pub notification_queue_capacity: usize,

    /// Sessions idle longer than this are reaped. `None` keeps them forever.
    pub session_idle_timeout: Option<Duration>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_sessions: Some(10_000),
            max_message_size: 2 * 1024 * 1024, // 2MB
            max_tools: Some(1_000),
            max_resources: Some(10_000),
            max_prompts: Some(1_000),
            notification_queue_capacity: 1024,
            session_idle_timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

impl ResourceLimits {
    /// Create unlimited resource limits (use with caution)
    pub fn unlimited() -> Self {
        Self {
            max_sessions: None,
            max_message_size: usize::MAX,
            max_tools: None,
            max_resources: None,
            max_prompts: None,
            notification_queue_capacity: usize::MAX,
            session_idle_timeout: None,
        }
    }

    /// Create strict limits for testing or restricted environments
    pub fn strict() -> Self {
        Self {
            max_sessions: Some(100),
            max_message_size: 256 * 1024, // 256KB
            max_tools: Some(50),
            max_resources: Some(100),
            max_prompts: Some(50),
            notification_queue_capacity: 64,
            session_idle_timeout: Some(Duration::from_secs(5 * 60)),
        }
    }

    pub fn capability_limit(&self, kind: CapabilityKind) -> Option<usize> {
        match kind {
            CapabilityKind::Tool => self.max_tools,
            CapabilityKind::Prompt => self.max_prompts,
            CapabilityKind::Resource | CapabilityKind::ResourceTemplate => self.max_resources,
        }
    }

    /// Fail if adding one more capability of `kind` would exceed its limit
    pub fn check_capacity(&self, kind: CapabilityKind, current: usize) -> McpResult<()> {
        match self.capability_limit(kind) {
            Some(max) if current >= max => Err(McpError::TooManyCapabilities(kind, max)),
            _ => Ok(()),
        }
    }

    pub fn check_message_size(&self, size: usize) -> McpResult<()> {
        if size > self.max_message_size {
            Err(McpError::MessageTooLarge(size, self.max_message_size))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_checks() {
        let limits = ResourceLimits {
            max_tools: Some(2),
            ..ResourceLimits::default()
        };
        assert!(limits.check_capacity(CapabilityKind::Tool, 1).is_ok());
        assert!(matches!(
            limits.check_capacity(CapabilityKind::Tool, 2),
            Err(McpError::TooManyCapabilities(CapabilityKind::Tool, 2))
        ));
        assert!(ResourceLimits::unlimited()
            .check_capacity(CapabilityKind::Prompt, usize::MAX - 1)
            .is_ok());
    }

    #[test]
    fn test_message_size() {
        let limits = ResourceLimits::strict();
        assert!(limits.check_message_size(1024).is_ok());
        assert!(limits.check_message_size(limits.max_message_size + 1).is_err());
    }
}
