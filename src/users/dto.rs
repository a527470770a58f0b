use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// User as exposed to admin endpoints.
#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub role: String,
    pub email_verified: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl From<User> for AdminUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            role: user.role,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "USER".into()
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

/// Client-side preferences; acknowledged but not persisted server-side.
#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub theme: Option<String>,
    pub email_notifications: Option<bool>,
    pub marketing_emails: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_to_user_role() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"name":"Carol","email":"carol@example.com","password":"secret1"}"#,
        )
        .expect("parse");
        assert_eq!(req.role, "USER");
    }

    #[test]
    fn settings_request_fields_are_optional() {
        let req: SettingsRequest = serde_json::from_str(r#"{"theme":"dark"}"#).expect("parse");
        assert_eq!(req.theme.as_deref(), Some("dark"));
        assert!(req.email_notifications.is_none());
        assert!(req.marketing_emails.is_none());
    }
}
