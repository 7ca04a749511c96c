use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone_number: String,
    pub password: String,
    pub name: String,
    pub village: String,
    pub language_preference: Option<String>,
}

/// Request body for login (user and admin).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub phone_number: String,
    pub name: String,
    pub village: Option<String>,
    pub role: String,
    pub language_preference: String,
    pub must_reset_password: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            phone_number: u.phone_number,
            name: u.name,
            village: u.village,
            role: u.role,
            language_preference: u.language_preference,
            must_reset_password: u.must_reset_password,
        }
    }
}

/// Only `name` and `language_preference` may be changed; other keys are
/// rejected at deserialization time.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub language_preference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub phone_number: String,
    pub reset_code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_hides_nothing_it_should_show() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            phone_number: "9876543210".into(),
            name: "Ram".into(),
            village: Some("nawanagar".into()),
            role: "farmer".into(),
            language_preference: "hi".into(),
            must_reset_password: false,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("9876543210"));
        assert!(json.contains("nawanagar"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn profile_update_rejects_unknown_fields() {
        let err = serde_json::from_str::<UpdateProfileRequest>(r#"{"role": "admin"}"#);
        assert!(err.is_err());

        let ok = serde_json::from_str::<UpdateProfileRequest>(
            r#"{"name": "Shyam", "language_preference": "hi"}"#,
        )
        .unwrap();
        assert_eq!(ok.name.as_deref(), Some("Shyam"));
    }
}
