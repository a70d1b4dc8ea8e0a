//! Service identities.
//!
//! Fixture files, API source files, and prompt `ground_truth` blocks all
//! name services with their own spelling (`diverse_simple_notes_state.json`,
//! `SimpleNoteApis.py`, `"simple_note"`). Every spelling is folded to one
//! [`Service`] here so registries never need default-value fallbacks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A mock backend service known to the corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Amazon,
    CommuniLink,
    Gmail,
    GoogleCalendar,
    GoogleDrive,
    Netflix,
    Phone,
    SimpleNote,
    Slack,
    SmartHome,
    SmartThings,
    Spotify,
    TeslaFleet,
    Venmo,
    Walmart,
    X,
    YouTube,
    /// A service with no entry in the alias table, keyed by its normalized
    /// label so two spellings of the same unlisted service still meet.
    Unknown(String),
}

impl Service {
    /// Resolve any raw service label.
    pub fn from_label(label: &str) -> Self {
        let key = normalize_label(label);
        match key.as_str() {
            "amazon" => Self::Amazon,
            "communilink" => Self::CommuniLink,
            "gmail" => Self::Gmail,
            "googlecalendar" | "calendar" => Self::GoogleCalendar,
            "googledrive" | "drive" => Self::GoogleDrive,
            "netflix" => Self::Netflix,
            "phone" => Self::Phone,
            "simplenote" | "simplenotes" => Self::SimpleNote,
            "slack" => Self::Slack,
            "smarthome" => Self::SmartHome,
            "smartthings" => Self::SmartThings,
            "spotify" => Self::Spotify,
            "teslafleet" | "tesla" => Self::TeslaFleet,
            "venmo" => Self::Venmo,
            "walmart" | "walmartmarketplace" => Self::Walmart,
            "x" | "twitter" => Self::X,
            "youtube" => Self::YouTube,
            _ => Self::Unknown(key),
        }
    }

    /// Resolve the service of a `diverse_<service>_state.json` fixture stem.
    pub fn from_fixture_stem(stem: &str) -> Self {
        let trimmed = stem.strip_prefix("diverse_").unwrap_or(stem);
        let trimmed = trimmed.strip_suffix("_state").unwrap_or(trimmed);
        Self::from_label(trimmed)
    }

    /// Resolve the service of a `<Service>Apis` source stem.
    pub fn from_api_stem(stem: &str) -> Self {
        Self::from_label(stem.strip_suffix("Apis").unwrap_or(stem))
    }

    /// Canonical lower-case key.
    pub fn key(&self) -> &str {
        match self {
            Self::Amazon => "amazon",
            Self::CommuniLink => "communilink",
            Self::Gmail => "gmail",
            Self::GoogleCalendar => "googlecalendar",
            Self::GoogleDrive => "googledrive",
            Self::Netflix => "netflix",
            Self::Phone => "phone",
            Self::SimpleNote => "simplenote",
            Self::Slack => "slack",
            Self::SmartHome => "smarthome",
            Self::SmartThings => "smartthings",
            Self::Spotify => "spotify",
            Self::TeslaFleet => "teslafleet",
            Self::Venmo => "venmo",
            Self::Walmart => "walmart",
            Self::X => "x",
            Self::YouTube => "youtube",
            Self::Unknown(key) => key,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_and_api_spellings_meet() {
        assert_eq!(
            Service::from_fixture_stem("diverse_smart_things_state"),
            Service::from_fixture_stem("diverse_smartthings_state")
        );
        assert_eq!(
            Service::from_fixture_stem("diverse_simple_notes_state"),
            Service::from_api_stem("SimpleNoteApis")
        );
        assert_eq!(
            Service::from_fixture_stem("diverse_walmart_state"),
            Service::from_api_stem("WalmartMarketplaceApis")
        );
        assert_eq!(Service::from_api_stem("YouTubeApis"), Service::YouTube);
        assert_eq!(Service::from_label("google_calendar"), Service::GoogleCalendar);
    }

    #[test]
    fn unlisted_labels_fold_to_one_unknown_key() {
        let a = Service::from_label("Test_Amazon");
        let b = Service::from_api_stem("TestAmazonApis");
        assert_eq!(a, Service::Unknown("testamazon".to_string()));
        assert_eq!(a, b);
        assert!(!a.is_known());
        assert_eq!(a.to_string(), "testamazon");
    }
}
