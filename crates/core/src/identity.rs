//! User registry: registration, login, and badge bookkeeping.
//!
//! Accounts live in `users.json` keyed by username. Registration runs the
//! full validation chain before anything is written; any failure aborts the
//! attempt and leaves the registry untouched.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use regex_lite::Regex;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::errors::{AuthError, CoreError, StoreError, ValidationError};
use crate::models::{Registration, User};
use crate::persist::JsonStore;

/// Loose RFC-style email shape check: local part, `@`, dotted domain.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$";

/// Accepted date-of-birth years, matching the signup form's date picker.
const DOB_MIN_YEAR: i32 = 1990;
const DOB_MAX_YEAR: i32 = 2030;

/// Store of registered users.
pub struct IdentityStore {
    store: JsonStore<HashMap<String, User>>,
}

impl IdentityStore {
    /// Create a handle backed by `users.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            store: JsonStore::new(data_dir.as_ref().join("users.json")),
        }
    }

    /// Validate and create a new account.
    ///
    /// Checks run in a fixed order: duplicate username, duplicate college
    /// id, college id format, password confirmation, email syntax, date of
    /// birth. The first failure wins and nothing is written.
    pub fn register(&self, registration: Registration) -> Result<User, CoreError> {
        self.store.update(|users| {
            validate_registration(users, &registration)?;

            let user = User {
                username: registration.username.clone(),
                college_id: registration.college_id.clone(),
                email: registration.email.clone(),
                date_of_birth: registration.date_of_birth.clone(),
                password: registration.password.clone(),
                badges: Vec::new(),
            };
            users.insert(user.username.clone(), user.clone());
            info!(username = %user.username, "registered new user");
            Ok(user)
        })
    }

    /// Run the registration validation chain without creating anything.
    ///
    /// Used before an OTP is issued, so invalid signups never get a code.
    pub fn validate_new(&self, registration: &Registration) -> Result<(), CoreError> {
        let users = self.store.read()?;
        validate_registration(&users, registration)?;
        Ok(())
    }

    /// Authenticate by college id and password.
    ///
    /// The password comparison is constant-time; the caller learns only
    /// "valid" or "invalid", never which half was wrong.
    pub fn login(&self, college_id: &str, password: &str) -> Result<User, CoreError> {
        let users = self.store.read()?;
        for user in users.values() {
            if user.college_id == college_id && passwords_match(&user.password, password) {
                debug!(username = %user.username, "login succeeded");
                return Ok(user.clone());
            }
        }
        Err(AuthError::InvalidCredentials.into())
    }

    /// Look up a user by username.
    pub fn get(&self, username: &str) -> Result<User, CoreError> {
        let users = self.store.read()?;
        users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", username).into())
    }

    /// Add `badge` to the user's badge set if not already held.
    ///
    /// Returns `true` when the badge was newly awarded.
    pub fn award_badge(&self, username: &str, badge: &str) -> Result<bool, CoreError> {
        self.store.update(|users| {
            let user = users
                .get_mut(username)
                .ok_or_else(|| StoreError::not_found("user", username))?;
            if user.badges.iter().any(|b| b == badge) {
                debug!(username, badge, "badge already held");
                return Ok(false);
            }
            user.badges.push(badge.to_string());
            info!(username, badge, "awarded badge");
            Ok(true)
        })
    }
}

fn validate_registration(
    users: &HashMap<String, User>,
    reg: &Registration,
) -> Result<(), ValidationError> {
    if users.contains_key(&reg.username) {
        return Err(ValidationError::DuplicateUsername(reg.username.clone()));
    }
    if users.values().any(|u| u.college_id == reg.college_id) {
        return Err(ValidationError::DuplicateCollegeId(reg.college_id.clone()));
    }
    if !is_valid_college_id(&reg.college_id) {
        return Err(ValidationError::MalformedCollegeId(reg.college_id.clone()));
    }
    if reg.password != reg.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if !is_valid_email(&reg.email) {
        return Err(ValidationError::InvalidEmail(reg.email.clone()));
    }
    validate_date_of_birth(&reg.date_of_birth)?;
    Ok(())
}

/// College ids are exactly 10 ASCII-alphanumeric characters.
fn is_valid_college_id(id: &str) -> bool {
    id.len() == 10 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

fn validate_date_of_birth(dob: &str) -> Result<(), ValidationError> {
    let date = NaiveDate::parse_from_str(dob, "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidDateOfBirth(dob.to_string(), e.to_string())
    })?;
    if !(DOB_MIN_YEAR..=DOB_MAX_YEAR).contains(&date.year()) {
        return Err(ValidationError::InvalidDateOfBirth(
            dob.to_string(),
            format!("year must be between {DOB_MIN_YEAR} and {DOB_MAX_YEAR}"),
        ));
    }
    Ok(())
}

fn passwords_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registration() -> Registration {
        Registration {
            username: "alice".into(),
            college_id: "ABCD123456".into(),
            email: "alice@example.com".into(),
            date_of_birth: "2001-04-12".into(),
            password: "pw1".into(),
            confirm_password: "pw1".into(),
        }
    }

    fn store_with_alice() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());
        store.register(sample_registration()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_register_creates_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());

        let user = store.register(sample_registration()).unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.badges.is_empty());

        let fetched = store.get("alice").unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_dir, store) = store_with_alice();

        let mut dup = sample_registration();
        dup.college_id = "ZZZZ999999".into();
        let result = store.register(dup);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::DuplicateUsername(_)))
        ));
    }

    #[test]
    fn test_duplicate_college_id_rejected() {
        let (_dir, store) = store_with_alice();

        let mut dup = sample_registration();
        dup.username = "bob".into();
        let result = store.register(dup);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::DuplicateCollegeId(_)))
        ));
        // The failed attempt must not have touched the registry.
        assert!(store.get("bob").is_err());
    }

    #[test]
    fn test_college_id_format() {
        assert!(is_valid_college_id("ABCD123456"));
        assert!(is_valid_college_id("0123456789"));
        assert!(!is_valid_college_id("ABCD12345")); // 9 chars
        assert!(!is_valid_college_id("ABCD1234567")); // 11 chars
        assert!(!is_valid_college_id("ABCD 12345")); // space
        assert!(!is_valid_college_id("ABCD-12345")); // punctuation
    }

    #[test]
    fn test_malformed_college_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());

        let mut reg = sample_registration();
        reg.college_id = "short".into();
        let result = store.register(reg);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::MalformedCollegeId(_)))
        ));
    }

    #[test]
    fn test_password_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());

        let mut reg = sample_registration();
        reg.confirm_password = "pw2".into();
        let result = store.register(reg);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::PasswordMismatch))
        ));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());

        for bad in ["not-an-email", "a@b", "a b@example.com", "@example.com"] {
            let mut reg = sample_registration();
            reg.email = bad.into();
            let result = store.register(reg);
            assert!(
                matches!(
                    result,
                    Err(CoreError::Validation(ValidationError::InvalidEmail(_)))
                ),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn test_date_of_birth_bounds() {
        assert!(validate_date_of_birth("1990-01-01").is_ok());
        assert!(validate_date_of_birth("2030-12-31").is_ok());
        assert!(validate_date_of_birth("1989-12-31").is_err());
        assert!(validate_date_of_birth("2031-01-01").is_err());
        assert!(validate_date_of_birth("not a date").is_err());
    }

    #[test]
    fn test_validation_order_duplicate_username_first() {
        let (_dir, store) = store_with_alice();

        // Both a duplicate username and a malformed college id: the
        // duplicate-username check runs first.
        let mut reg = sample_registration();
        reg.college_id = "bad".into();
        let result = store.register(reg);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::DuplicateUsername(_)))
        ));
    }

    #[test]
    fn test_login() {
        let (_dir, store) = store_with_alice();

        let user = store.login("ABCD123456", "pw1").unwrap();
        assert_eq!(user.username, "alice");

        let result = store.login("ABCD123456", "wrong");
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::InvalidCredentials))
        ));

        let result = store.login("NOPE000000", "pw1");
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[test]
    fn test_award_badge_once() {
        let (_dir, store) = store_with_alice();

        assert!(store.award_badge("alice", "Active Coder").unwrap());
        assert!(!store.award_badge("alice", "Active Coder").unwrap());

        let user = store.get("alice").unwrap();
        assert_eq!(user.badges, vec!["Active Coder".to_string()]);
    }

    #[test]
    fn test_award_badge_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());

        let result = store.award_badge("ghost", "Active Coder");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }
}
