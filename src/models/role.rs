use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Coarse authorization category derived from the authenticated user's
/// identity. Never persisted; recomputed whenever the session changes.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
    #[default]
    Unknown,
}

impl Role {
    /// Roles allowed to change an appointment's status.
    pub fn can_manage_appointments(&self) -> bool {
        matches!(self, Role::Admin | Role::Doctor)
    }
}

/// Policy seam for deriving a [`Role`] from a user's email. The substring
/// rule below is a placeholder policy; a claims or roles-table lookup can
/// replace it without touching callers.
pub trait RoleResolver: Send + Sync {
    fn resolve(&self, email: Option<&str>) -> Role;
}

/// Classifies by case-insensitive substring match on the email address:
/// "admin" wins over "doctor", anything else with an email is a patient,
/// and a missing or empty email resolves to [`Role::Unknown`].
pub struct EmailSubstringRoles;

impl RoleResolver for EmailSubstringRoles {
    fn resolve(&self, email: Option<&str>) -> Role {
        // Providers can deliver "email": "", which is as good as no email.
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Role::Unknown;
        };

        let lowered = email.to_lowercase();
        if lowered.contains("admin") {
            Role::Admin
        } else if lowered.contains("doctor") {
            Role::Doctor
        } else {
            Role::Patient
        }
    }
}
