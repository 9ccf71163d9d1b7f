//! Registration and credential checks.

use crate::db::NoteDb;
use crate::error::{AuthError, Error};
use crate::models::{Branch, User};
use crate::storage::Storage;
use serde::Deserialize;

/// How passwords are stored at registration and checked at login.
pub trait CredentialVerifier: Send + Sync {
    /// Turns a raw password into the form written to the user record.
    fn prepare(&self, password: &str) -> Result<String, AuthError>;

    fn verify(&self, password: &str, stored: Option<&str>) -> bool;

    /// Whether an account without a password could ever log in.
    fn requires_password(&self) -> bool {
        false
    }
}

/// Login by email alone. Any password is accepted.
///
/// This is a known simplification: knowing an address is enough to log in.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailOnly;

impl CredentialVerifier for EmailOnly {
    fn prepare(&self, password: &str) -> Result<String, AuthError> {
        Ok(password.to_string())
    }

    fn verify(&self, _password: &str, _stored: Option<&str>) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bcrypt {
    cost: u32,
}

impl Bcrypt {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for Bcrypt {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialVerifier for Bcrypt {
    fn prepare(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or_else(|e| {
                tracing::warn!("stored password hash is unreadable: {}", e);
                false
            }),
            None => false,
        }
    }

    fn requires_password(&self) -> bool {
        true
    }
}

/// Picks the verifier for the `auth.verify_passwords` setting.
pub fn verifier_for(verify_passwords: bool) -> Box<dyn CredentialVerifier> {
    if verify_passwords {
        Box::new(Bcrypt::default())
    } else {
        Box::new(EmailOnly)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub branch: Branch,
    pub year: u8,
}

pub fn validate_year(year: u8) -> Result<(), AuthError> {
    if (1..=4).contains(&year) {
        Ok(())
    } else {
        Err(AuthError::Invalid(format!(
            "Year must be between 1 and 4, got {}",
            year
        )))
    }
}

pub fn register<S: Storage>(
    db: &NoteDb<S>,
    form: RegisterForm,
    verifier: &dyn CredentialVerifier,
) -> Result<User, Error> {
    let name = form.name.trim();
    let email = form.email.trim();

    if name.is_empty() {
        return Err(AuthError::Invalid("Name cannot be empty".into()).into());
    }
    if email.is_empty() {
        return Err(AuthError::Invalid("Email cannot be empty".into()).into());
    }
    validate_year(form.year)?;
    if form.password.is_empty() && verifier.requires_password() {
        return Err(AuthError::Invalid("Password cannot be empty".into()).into());
    }

    if db.find_user_by_email(email)?.is_some() {
        return Err(AuthError::EmailTaken(email.to_string()).into());
    }

    let password = if form.password.is_empty() {
        None
    } else {
        Some(verifier.prepare(&form.password)?)
    };

    let user = User::new(name.to_string(), email.to_string(), password, form.branch, form.year);
    db.save_user(user.clone())?;
    tracing::info!(user_id = %user.id, "registered user");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn form(email: &str) -> RegisterForm {
        RegisterForm {
            name: "Priya".into(),
            email: email.into(),
            password: "hunter22".into(),
            branch: Branch::It,
            year: 3,
        }
    }

    #[test]
    fn register_appends_user() {
        let db = NoteDb::new(MemoryStorage::new());
        let user = register(&db, form("priya@uni.edu"), &EmailOnly).unwrap();

        let users = db.users().unwrap();
        assert_eq!(users, vec![user]);
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let db = NoteDb::new(MemoryStorage::new());
        register(&db, form("priya@uni.edu"), &EmailOnly).unwrap();

        let err = register(&db, form("priya@uni.edu"), &EmailOnly).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::EmailTaken(_))));
        assert_eq!(db.users().unwrap().len(), 1);
    }

    #[test]
    fn register_rejects_bad_year() {
        let db = NoteDb::new(MemoryStorage::new());
        let err = register(&db, RegisterForm { year: 5, ..form("x@uni.edu") }, &EmailOnly).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Invalid(_))));
    }

    #[test]
    fn bcrypt_hashes_and_verifies() {
        let verifier = Bcrypt::new(4);
        let stored = verifier.prepare("correct horse").unwrap();
        assert_ne!(stored, "correct horse");
        assert!(verifier.verify("correct horse", Some(&stored)));
        assert!(!verifier.verify("wrong", Some(&stored)));
        assert!(!verifier.verify("correct horse", None));
    }

    #[test]
    fn bcrypt_rejects_blank_password_at_registration() {
        let db = NoteDb::new(MemoryStorage::new());
        let verifier = Bcrypt::new(4);

        let err = register(
            &db,
            RegisterForm { password: String::new(), ..form("nopw@uni.edu") },
            &verifier,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Invalid(_))));
        assert!(db.users().unwrap().is_empty());

        // with a password the account can log in afterwards
        let user = register(&db, form("nopw@uni.edu"), &verifier).unwrap();
        assert!(verifier.verify("hunter22", user.password.as_deref()));
    }

    #[test]
    fn email_only_allows_blank_password() {
        let db = NoteDb::new(MemoryStorage::new());
        let user = register(
            &db,
            RegisterForm { password: String::new(), ..form("open@uni.edu") },
            &EmailOnly,
        )
        .unwrap();
        assert_eq!(user.password, None);
    }

    #[test]
    fn email_only_accepts_anything() {
        assert!(EmailOnly.verify("whatever", Some("something else")));
        assert!(EmailOnly.verify("", None));
    }
}
