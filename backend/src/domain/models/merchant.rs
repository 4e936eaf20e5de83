//! Domain model for a merchant where the benefit is accepted.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Merchant {
    pub fn generate_id() -> String {
        format!("merchant::{}", uuid::Uuid::new_v4())
    }

    pub fn new(name: &str, location: Option<&str>) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.trim().to_string(),
            location: normalize_location(location),
        }
    }

    /// True when this merchant is the (name, location) pair given.
    ///
    /// Names and locations compare trimmed and case-insensitively; an empty
    /// location is the same as no location.
    pub fn matches(&self, name: &str, location: Option<&str>) -> bool {
        self.key() == merchant_key(name, location)
    }

    pub fn key(&self) -> (String, Option<String>) {
        merchant_key(&self.name, self.location.as_deref())
    }
}

/// Uniqueness key of a merchant
pub fn merchant_key(name: &str, location: Option<&str>) -> (String, Option<String>) {
    (
        name.trim().to_lowercase(),
        normalize_location(location).map(|l| l.to_lowercase()),
    )
}

/// Trim a location and collapse blank values to `None`
pub fn normalize_location(location: Option<&str>) -> Option<String> {
    location
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_different_location_is_distinct() {
        let centro = Merchant::new("Café Central", Some("Centro"));
        assert!(centro.matches("Café Central", Some("Centro")));
        assert!(centro.matches("  café central ", Some("centro")));
        assert!(!centro.matches("Café Central", Some("Norte")));
        assert!(!centro.matches("Café Central", None));
    }

    #[test]
    fn test_blank_location_is_no_location() {
        let merchant = Merchant::new("Kiosko", Some("   "));
        assert_eq!(merchant.location, None);
        assert!(merchant.matches("Kiosko", None));
        assert!(merchant.matches("Kiosko", Some("")));
    }
}
