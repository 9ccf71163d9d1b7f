use crate::auth::{validate_year, CredentialVerifier};
use crate::db::NoteDb;
use crate::error::{Error, SessionError, StoreError};
use crate::models::{Branch, User};
use crate::storage::Storage;
use serde::Deserialize;

/// The logged-in user, if any.
///
/// Mirrors the persisted `active_user` slot. [`Session::restore`] reads it once,
/// [`Session::login`] sets it and [`Session::logout`] clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    current: Option<User>,
}

/// Editable profile fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub year: Option<u8>,
    pub branch: Option<Branch>,
}

impl Session {
    /// Trusts whatever snapshot is stored; there is no expiry or signature.
    pub fn restore<S: Storage>(db: &NoteDb<S>) -> Result<Self, StoreError> {
        let current = db.active_user()?;
        if let Some(user) = &current {
            tracing::debug!(user_id = %user.id, "restored session");
        }
        Ok(Self { current })
    }

    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn require(&self) -> Result<&User, SessionError> {
        self.current.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    /// Returns `None` when no user has this email or the verifier rejects the password.
    pub fn login<S: Storage>(
        &mut self,
        db: &NoteDb<S>,
        email: &str,
        password: &str,
        verifier: &dyn CredentialVerifier,
    ) -> Result<Option<User>, StoreError> {
        let Some(found) = db.find_user_by_email(email.trim())? else {
            return Ok(None);
        };
        if !verifier.verify(password, found.password.as_deref()) {
            return Ok(None);
        }

        let snapshot = found.without_password();
        db.set_active_user(&snapshot)?;
        tracing::info!(user_id = %snapshot.id, "logged in");
        self.current = Some(snapshot.clone());
        Ok(Some(snapshot))
    }

    pub fn logout<S: Storage>(&mut self, db: &NoteDb<S>) -> Result<(), StoreError> {
        db.clear_active_user()?;
        if let Some(user) = self.current.take() {
            tracing::info!(user_id = %user.id, "logged out");
        }
        Ok(())
    }

    /// Applies profile edits to the logged-in user.
    ///
    /// The stored record and the session snapshot change together.
    pub fn update_profile<S: Storage>(
        &mut self,
        db: &NoteDb<S>,
        changes: ProfileChanges,
    ) -> Result<User, Error> {
        let id = self.require()?.id.clone();
        let mut user = db
            .find_user(&id)?
            .ok_or_else(|| SessionError::UnknownUser(id.clone()))?;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(year) = changes.year {
            validate_year(year)?;
            user.year = year;
        }
        if let Some(branch) = changes.branch {
            user.branch = branch;
        }

        if !db.update_user(user.clone())? {
            return Err(SessionError::UnknownUser(id).into());
        }

        let snapshot = user.without_password();
        self.current = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{register, Bcrypt, EmailOnly, RegisterForm};
    use crate::storage::MemoryStorage;

    fn setup(verifier: &dyn CredentialVerifier) -> (NoteDb<MemoryStorage>, User) {
        let db = NoteDb::new(MemoryStorage::new());
        let user = register(
            &db,
            RegisterForm {
                name: "Sam".into(),
                email: "sam@uni.edu".into(),
                password: "pass1234".into(),
                branch: Branch::Cse,
                year: 2,
            },
            verifier,
        )
        .unwrap();
        (db, user)
    }

    #[test]
    fn login_strips_password_and_persists() {
        let (db, user) = setup(&EmailOnly);
        let mut session = Session::default();

        let logged = session
            .login(&db, "sam@uni.edu", "anything", &EmailOnly)
            .unwrap()
            .unwrap();

        assert_eq!(logged.id, user.id);
        assert_eq!(logged.password, None);
        assert_eq!(session.current(), Some(&logged));
        assert_eq!(db.active_user().unwrap(), Some(logged));
    }

    #[test]
    fn login_unknown_email_fails() {
        let (db, _) = setup(&EmailOnly);
        let mut session = Session::default();
        assert!(session
            .login(&db, "nobody@uni.edu", "pass1234", &EmailOnly)
            .unwrap()
            .is_none());
        assert!(session.current().is_none());
    }

    #[test]
    fn bcrypt_login_checks_password() {
        let verifier = Bcrypt::new(4);
        let (db, _) = setup(&verifier);
        let mut session = Session::default();

        assert!(session.login(&db, "sam@uni.edu", "wrong", &verifier).unwrap().is_none());
        assert!(session.login(&db, "sam@uni.edu", "pass1234", &verifier).unwrap().is_some());
    }

    #[test]
    fn restore_and_logout() {
        let (db, _) = setup(&EmailOnly);
        let mut session = Session::default();
        session.login(&db, "sam@uni.edu", "", &EmailOnly).unwrap();

        let mut restored = Session::restore(&db).unwrap();
        assert_eq!(restored, session);

        restored.logout(&db).unwrap();
        assert!(restored.current().is_none());
        assert!(db.active_user().unwrap().is_none());
        assert!(matches!(restored.require(), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn profile_edit_updates_record_and_session() {
        let (db, user) = setup(&EmailOnly);
        let mut session = Session::default();
        session.login(&db, "sam@uni.edu", "", &EmailOnly).unwrap();

        let updated = session
            .update_profile(
                &db,
                ProfileChanges {
                    branch: Some(Branch::Mech),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.branch, Branch::Mech);
        assert_eq!(session.current().unwrap().branch, Branch::Mech);
        assert_eq!(db.active_user().unwrap().unwrap().branch, Branch::Mech);

        let stored = db.find_user(&user.id).unwrap().unwrap();
        assert_eq!(stored.branch, Branch::Mech);
        // the stored password survives a profile edit
        assert_eq!(stored.password.as_deref(), Some("pass1234"));
    }

    #[test]
    fn profile_edit_requires_login() {
        let (db, _) = setup(&EmailOnly);
        let mut session = Session::default();
        let err = session.update_profile(&db, ProfileChanges::default()).unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotLoggedIn)));
    }
}
