use rand::RngCore;
use time::OffsetDateTime;

use crate::notify::normalize_phone;
use crate::users::repo::{ROLE_ADMIN, ROLE_FARMER};

/// Default password for implicitly created accounts: the last six digits of
/// the phone number. Such accounts are flagged `must_reset_password`.
pub fn default_password(phone_number: &str) -> String {
    let digits = normalize_phone(phone_number);
    let start = digits.len().saturating_sub(6);
    digits[start..].to_string()
}

/// Six-character uppercase code cut from a fresh random token.
pub fn generate_reset_code() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    token[..6].to_uppercase()
}

pub fn reset_token_valid(expires: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    matches!(expires, Some(exp) if exp > now)
}

pub fn is_valid_role(role: &str) -> bool {
    role == ROLE_FARMER || role == ROLE_ADMIN
}

/// A role change may not demote the last remaining admin.
pub fn demotion_allowed(current_role: &str, new_role: &str, admin_count: i64) -> bool {
    !(current_role == ROLE_ADMIN && new_role != ROLE_ADMIN && admin_count <= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn default_password_is_last_six_digits() {
        assert_eq!(default_password("9876543210"), "543210");
        assert_eq!(default_password("(987) 654-3210"), "543210");
        assert_eq!(default_password("1234"), "1234");
        assert_eq!(default_password(""), "");
    }

    #[test]
    fn reset_code_is_six_uppercase_hex_chars() {
        let code = generate_reset_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        // two draws should essentially never collide
        assert_ne!(generate_reset_code(), generate_reset_code());
    }

    #[test]
    fn reset_token_expiry_is_enforced() {
        let now = OffsetDateTime::now_utc();
        assert!(reset_token_valid(Some(now + Duration::minutes(30)), now));
        assert!(!reset_token_valid(Some(now - Duration::seconds(1)), now));
        assert!(!reset_token_valid(None, now));
    }

    #[test]
    fn last_admin_cannot_be_demoted() {
        assert!(!demotion_allowed(ROLE_ADMIN, ROLE_FARMER, 1));
        assert!(demotion_allowed(ROLE_ADMIN, ROLE_FARMER, 2));
        assert!(demotion_allowed(ROLE_ADMIN, ROLE_ADMIN, 1));
        assert!(demotion_allowed(ROLE_FARMER, ROLE_ADMIN, 0));
    }

    #[test]
    fn role_names_are_validated() {
        assert!(is_valid_role("farmer"));
        assert!(is_valid_role("admin"));
        assert!(!is_valid_role("superuser"));
        assert!(!is_valid_role(""));
    }
}
