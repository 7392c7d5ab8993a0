//! Naming and defaulting utilities
//!
//! Derived names are pure functions of the owning declaration's identifier
//! and the resource kind, so repeated runs over the same source produce the
//! same artifacts.

use crate::annotation::Owner;

/// Suffix for defaulted ingress names
pub const INGRESS_SUFFIX: &str = "-ingress";
/// Suffix for defaulted ingress hostnames
pub const HOSTNAME_SUFFIX: &str = "-hostname";
/// Suffix for defaulted virtual service names
pub const VIRTUAL_SERVICE_SUFFIX: &str = "-virtual-service";
/// Suffix for defaulted service names
pub const SVC_SUFFIX: &str = "-svc";
/// Suffix for defaulted gateway names
pub const GATEWAY_SUFFIX: &str = "-gateway";
/// Infix for services bound to anonymous listeners
pub const ANONYMOUS_INFIX: &str = "-anonymous";

/// True when a name is empty or whitespace-only and needs defaulting
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Sanitize an identifier into a valid K8s DNS label.
///
/// DNS labels: `[a-z0-9]([-a-z0-9]*[a-z0-9])?`, max 63 chars.
pub fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches('-');
    if trimmed.len() > 63 {
        trimmed[..63].trim_end_matches('-').to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derive the default resource name for an owner and kind suffix.
///
/// A service bound to an anonymous listener inserts `-anonymous` before the
/// suffix so its artifacts cannot collide with a named listener's.
pub fn default_name(owner: &Owner, suffix: &str) -> String {
    let mut name = stem(owner);
    if owner.anonymous {
        name.push_str(ANONYMOUS_INFIX);
    }
    name.push_str(suffix);
    name
}

/// Derive the default ingress hostname for an owner.
///
/// Unlike names, hostnames never take the anonymous infix.
pub fn default_hostname(owner: &Owner) -> String {
    let mut hostname = stem(owner);
    hostname.push_str(HOSTNAME_SUFFIX);
    hostname
}

/// Sanitized owner identifier, with a fixed stem when sanitization strips
/// every character (a suffix alone would start with a hyphen, which is not
/// a valid DNS label).
fn stem(owner: &Owner) -> String {
    let stem = sanitize(&owner.name);
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

const FALLBACK_STEM: &str = "listener";
