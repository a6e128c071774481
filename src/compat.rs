//! API version compatibility.
//!
//! Purely advisory: the session logs a warning on mismatch and keeps going.

use serde::Serialize;

/// API versions this client is known to work with, oldest first. A declared
/// version matches any server version it is a component-wise prefix of, so
/// `"2.1"` covers `"2.1.0"` and `"2.1.7"`.
pub const COMPATIBLE_API_VERSIONS: &[&str] = &["2.0", "2.1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    /// Server version matches a declared version.
    Compatible,
    /// Same major version as a declared version, different minor.
    MinorDrift,
    /// Major version not declared.
    Incompatible,
    /// The server did not report a usable version.
    Unknown,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// Compare a server-reported version against a declared set.
pub fn check_compatibility(server_version: &str, declared: &[&str]) -> Compatibility {
    let server = components(server_version);
    if server.is_empty() {
        return Compatibility::Unknown;
    }

    let mut same_major = false;
    for version in declared {
        let want = components(version);
        if want.is_empty() {
            continue;
        }
        if server.len() >= want.len() && server[..want.len()] == want[..] {
            return Compatibility::Compatible;
        }
        if want[0] == server[0] {
            same_major = true;
        }
    }

    if same_major {
        Compatibility::MinorDrift
    } else {
        Compatibility::Incompatible
    }
}

/// Numeric components of a version string; `"v2.1.0-beta"` → `[2, 1, 0]`.
fn components(version: &str) -> Vec<u64> {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();
    let mut out = Vec::new();
    for part in core.split('.') {
        match part.parse() {
            Ok(n) => out.push(n),
            Err(_) => break,
        }
    }
    out
}
