// statsig-net/src/local_resolvers.rs
// ============================================================================
// Module: Local IP/User-Agent Resolvers
// Description: Minimal IpLocator/UserAgentParser implementations.
// Purpose: Satisfy the evaluator's collaborator seams without embedding a
//          geo/UA database.
// Dependencies: statsig-core
// ============================================================================

//! ## Overview
//! Full IP geolocation and user-agent parsing are outside this crate's
//! scope; a deployment that needs `ip_based`/`ua_based` conditions to match
//! against more than the `country`/`os`/`browser` fields already present on
//! the user object should supply its own [`IpLocator`]/[`UserAgentParser`].
//! These implementations always return `None`, which is the evaluator's
//! documented "condition cannot be resolved" fallback: it evaluates to
//! `false`, never to an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use statsig_core::IpLocator;
use statsig_core::UserAgentParser;

// ============================================================================
// SECTION: Resolvers
// ============================================================================

/// An [`IpLocator`] that never resolves an address, used when no geo
/// database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIpLocator;

impl IpLocator for NoopIpLocator {
    fn country_for_ip(&self, _ip: &str) -> Option<String> {
        None
    }
}

/// A [`UserAgentParser`] that never resolves a user agent, used when no UA
/// database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUserAgentParser;

impl UserAgentParser for NoopUserAgentParser {
    fn os_name(&self, _user_agent: &str) -> Option<String> {
        None
    }

    fn browser_name(&self, _user_agent: &str) -> Option<String> {
        None
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_ip_locator_never_resolves() {
        assert_eq!(NoopIpLocator.country_for_ip("1.2.3.4"), None);
    }

    #[test]
    fn noop_user_agent_parser_never_resolves() {
        assert_eq!(NoopUserAgentParser.os_name("Mozilla/5.0"), None);
        assert_eq!(NoopUserAgentParser.browser_name("Mozilla/5.0"), None);
    }
}
