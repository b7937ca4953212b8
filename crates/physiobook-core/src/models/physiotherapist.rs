use serde::{Deserialize, Serialize};

/// A provider profile from the partners directory.
///
/// The list endpoint returns summary cards; the detail endpoint fills in
/// rating, experience and bio, so those stay optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physiotherapist {
    pub id: String,
    /// User id used when creating bookings against this provider
    pub physiotherapist_user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub experience_years: Option<i64>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl Physiotherapist {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed physiotherapist")
    }

    /// One-line summary for list views
    pub fn summary(&self) -> String {
        let specialization = self.specialization.as_deref().unwrap_or("General");
        match self.consultation_fee {
            Some(fee) => format!("{} ({}, ₹{:.0})", self.display_name(), specialization, fee),
            None => format!("{} ({})", self.display_name(), specialization),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_summary_card_without_detail_fields() {
        let json = r#"{
            "id": "d-12",
            "physiotherapist_user_id": "u-40",
            "name": "Dr. Mehta",
            "specialization": "Sports rehab",
            "consultation_fee": 450
        }"#;
        let physio: Physiotherapist = serde_json::from_str(json).unwrap();
        assert_eq!(physio.summary(), "Dr. Mehta (Sports rehab, ₹450)");
        assert!(physio.rating.is_none());
    }
}
