//! Device class detection.

use crate::config::schema::{DeviceClassSetting, DeviceConfig};

/// Environment variable consulted when no user agent is configured.
pub const USER_AGENT_ENV_VAR: &str = "WALLET_USER_AGENT";

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
    "webos",
    "mobile",
];

/// Runtime environment class, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    NonMobile,
}

impl DeviceClass {
    /// Classifies a user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::NonMobile
        }
    }

    /// Resolves the class from configuration, falling back to the
    /// `WALLET_USER_AGENT` environment variable in `auto` mode.
    pub fn detect(config: &DeviceConfig) -> Self {
        let class = match config.class {
            DeviceClassSetting::Mobile => DeviceClass::Mobile,
            DeviceClassSetting::Desktop => DeviceClass::NonMobile,
            DeviceClassSetting::Auto => config
                .user_agent
                .clone()
                .or_else(|| std::env::var(USER_AGENT_ENV_VAR).ok())
                .map(|ua| Self::from_user_agent(&ua))
                .unwrap_or(DeviceClass::NonMobile),
        };
        tracing::info!(device_class = ?class, "Device class detected");
        class
    }

    pub fn is_mobile(self) -> bool {
        self == DeviceClass::Mobile
    }
}
