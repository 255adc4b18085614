use serde::{Deserialize, Serialize};

const MOBILE_MARKERS: [&str; 5] = ["mobi", "android", "iphone", "ipad", "ipod"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|m| ua.contains(m)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub device_class: DeviceClass,
}

impl DeviceInfo {
    pub fn new(
        user_agent: impl Into<String>,
        platform: impl Into<String>,
        screen_width: u32,
        screen_height: u32,
    ) -> Self {
        let user_agent = user_agent.into();
        let device_class = DeviceClass::from_user_agent(&user_agent);
        Self {
            user_agent,
            platform: platform.into(),
            screen_width,
            screen_height,
            device_class,
        }
    }
}
