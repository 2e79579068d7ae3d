// homescript-server/src/debug_access.rs
// ============================================================================
// Module: Debug Access Gate
// Description: CIDR allowlist checks for the LAN debugging path.
// Purpose: Gate the service-secret bypass on caller IP membership.
// Dependencies: ipnet
// ============================================================================

//! ## Overview
//! The debug-access path lets a LAN caller run a script's debug draft while
//! presenting only a valid service id, bypassing the service-secret check.
//! The gate is the caller IP: it must fall inside one of the configured
//! CIDR blocks, and the feature must be enabled at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use ipnet::IpNet;

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Parses CIDR strings, silently dropping malformed entries.
///
/// Config validation rejects malformed CIDRs up front; entries arriving
/// from the settings store are best-effort.
#[must_use]
pub fn parse_cidrs(raw: &[String]) -> Vec<IpNet> {
    raw.iter()
        .filter_map(|entry| entry.trim().parse().ok())
        .collect()
}

/// Returns true when the IP falls inside any allowed block.
#[must_use]
pub fn ip_allowed(ip: IpAddr, allowed: &[IpNet]) -> bool {
    allowed.iter().any(|net| net.contains(&ip))
}
