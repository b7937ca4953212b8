use serde::{Deserialize, Serialize};

/// The only account role this client is allowed to operate as
pub const PATIENT_ROLE: &str = "patient";

/// The signed-in user as the server represents it.
///
/// Everything except `id` and `role` is optional on the wire so that
/// decoding stays total across server versions; missing numeric fields
/// default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub wallet: f64,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub banned_until: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Patient {
    /// Display name, falling back to whichever contact field is present.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.phone.as_deref())
            .unwrap_or("Unnamed patient")
    }

    /// Merge a server-returned patient into this one. Server fields win
    /// on conflict; locally-known optional fields survive when the server
    /// omits them.
    pub fn merged_with(mut self, server: Patient) -> Patient {
        self.id = server.id;
        self.name = server.name.or(self.name);
        self.email = server.email.or(self.email);
        self.phone = server.phone.or(self.phone);
        self.date_of_birth = server.date_of_birth.or(self.date_of_birth);
        self.gender = server.gender.or(self.gender);
        if !server.role.is_empty() {
            self.role = server.role;
        }
        self.profile_picture = server.profile_picture.or(self.profile_picture);
        self.wallet = server.wallet;
        self.is_banned = server.is_banned;
        self.banned_until = server.banned_until.or(self.banned_until);
        self.is_deleted = server.is_deleted;
        self.created_at = server.created_at.or(self.created_at);
        self.updated_at = server.updated_at.or(self.updated_at);
        self
    }
}

/// Partial patient update applied after screen-level operations complete
/// (name edit, wallet top-up). Only the populated fields are touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub wallet: Option<f64>,
}

impl PatientUpdate {
    pub fn apply(&self, patient: &mut Patient) {
        if let Some(ref name) = self.name {
            patient.name = Some(name.clone());
        }
        if let Some(ref email) = self.email {
            patient.email = Some(email.clone());
        }
        if let Some(ref phone) = self.phone {
            patient.phone = Some(phone.clone());
        }
        if let Some(ref picture) = self.profile_picture {
            patient.profile_picture = Some(picture.clone());
        }
        if let Some(wallet) = self.wallet {
            patient.wallet = wallet;
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn wallet(balance: f64) -> Self {
        Self {
            wallet: Some(balance),
            ..Self::default()
        }
    }
}
