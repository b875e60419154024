//! Device/browser projects the QA suite runs against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngine {
    Chromium,
    Firefox,
    Webkit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One configured device project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: String,
    pub browser: BrowserEngine,
    pub viewport: Viewport,
    pub is_mobile: bool,
}

impl DeviceProfile {
    fn new(name: &str, browser: BrowserEngine, width: u32, height: u32, is_mobile: bool) -> Self {
        Self {
            name: name.to_string(),
            browser,
            viewport: Viewport { width, height },
            is_mobile,
        }
    }

    /// Snapshot embedded into generated reports.
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.name.clone(),
            browser: self.browser,
            viewport: self.viewport,
            is_mobile: self.is_mobile,
        }
    }
}

/// The device context a report was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub browser: BrowserEngine,
    pub viewport: Viewport,
    pub is_mobile: bool,
}

impl DeviceInfo {
    /// Default context for runs that never touch a real browser.
    pub fn headless_default() -> Self {
        desktop_chrome().info()
    }
}

pub fn desktop_chrome() -> DeviceProfile {
    DeviceProfile::new("Desktop Chrome", BrowserEngine::Chromium, 1920, 1080, false)
}

/// All eleven configured projects, in run order.
pub fn device_catalogue() -> Vec<DeviceProfile> {
    use BrowserEngine::{Chromium, Firefox, Webkit};
    vec![
        desktop_chrome(),
        DeviceProfile::new("Desktop Firefox", Firefox, 1920, 1080, false),
        DeviceProfile::new("Desktop Safari", Webkit, 1440, 900, false),
        DeviceProfile::new("Mobile Chrome", Chromium, 393, 851, true),
        DeviceProfile::new("Mobile Safari", Webkit, 390, 844, true),
        DeviceProfile::new("Mobile Safari Landscape", Webkit, 844, 390, true),
        DeviceProfile::new("iPhone SE", Webkit, 375, 667, true),
        DeviceProfile::new("iPad Pro", Webkit, 1024, 1366, false),
        DeviceProfile::new("Galaxy Tab S4", Chromium, 712, 1138, false),
        DeviceProfile::new("Small Screen", Chromium, 320, 568, true),
        DeviceProfile::new("Large Screen", Chromium, 2560, 1440, false),
    ]
}

pub fn profile(name: &str) -> Option<DeviceProfile> {
    device_catalogue()
        .into_iter()
        .find(|profile| profile.name == name)
}

/// Projects relevant to WebKit-only regressions.
pub fn safari_projects() -> Vec<DeviceProfile> {
    device_catalogue()
        .into_iter()
        .filter(|profile| profile.browser == BrowserEngine::Webkit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{device_catalogue, profile, safari_projects, BrowserEngine};

    #[test]
    fn unit_catalogue_holds_eleven_uniquely_named_projects() {
        let catalogue = device_catalogue();
        assert_eq!(catalogue.len(), 11);
        let mut names: Vec<&str> = catalogue.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn unit_profile_lookup_is_by_exact_name() {
        let mobile = profile("Mobile Safari").expect("known project");
        assert!(mobile.is_mobile);
        assert_eq!(mobile.browser, BrowserEngine::Webkit);
        assert!(profile("Mobile safari").is_none());
    }

    #[test]
    fn functional_safari_projects_are_all_webkit() {
        let projects = safari_projects();
        assert!(!projects.is_empty());
        assert!(projects
            .iter()
            .all(|project| project.browser == BrowserEngine::Webkit));
    }
}
