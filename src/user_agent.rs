//! Default User-Agent string sent to home servers.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/mxmedia";

/// Default User-Agent for every request (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("mxmedia/{version} (+{PROJECT_UA_URL})")
}
