//! Device classification from a client's user-agent string.

use woothee::parser::Parser;

const UNKNOWN: &str = "UNKNOWN";

/// Device class and human-readable identifier recorded with each session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub mobile: bool,
    /// "{browser} on {OS}"
    pub identifier: String,
}

impl DeviceInfo {
    pub fn from_user_agent(user_agent: &str) -> Self {
        match Parser::new().parse(user_agent) {
            Some(result) => DeviceInfo {
                mobile: matches!(result.category, "smartphone" | "mobilephone"),
                identifier: format!("{} on {}", result.name, result.os),
            },
            None => DeviceInfo {
                mobile: false,
                identifier: format!("{UNKNOWN} on {UNKNOWN}"),
            },
        }
    }
}
