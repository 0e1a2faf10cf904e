//! Registration and login.
//!
//! Passwords are never stored in plaintext. Hashing is delegated to a
//! [`PasswordHasher`]; the production implementation is [`Argon2Hasher`],
//! which produces salted PHC-format Argon2id strings. Hashing and
//! verification run on tokio's blocking pool, outside the storage lock.
//!
//! Login failures are indistinguishable: an unknown email and a
//! wrong password both yield [`Error::Authentication`].
//!
//! Repeated failed logins are neither rate-limited nor locked out.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Parent, User};
use crate::storage::Storage;

/// Message shown when registration input is incomplete.
pub const MISSING_CREDENTIALS: &str = "Bitte E-Mail und Passwort angeben.";

/// Hashes and verifies passwords.
pub trait PasswordHasher: Send + Sync + std::fmt::Debug {
    /// Hash a plaintext password with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// A malformed stored hash never verifies.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id password hasher.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Create a hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }
}

/// Run a hasher call on the blocking thread pool.
async fn off_runtime<T, F>(hasher: &Arc<dyn PasswordHasher>, f: F) -> Result<T>
where
    F: FnOnce(&dyn PasswordHasher) -> T + Send + 'static,
    T: Send + 'static,
{
    let hasher = Arc::clone(hasher);
    tokio::task::spawn_blocking(move || f(hasher.as_ref()))
        .await
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Register a new login and its parent record.
///
/// The email is trimmed; the password is used as given. The password is
/// hashed before the storage lock is taken.
///
/// # Errors
///
/// Returns a validation error if either field is empty or the email is
/// already registered.
pub async fn register(
    storage: &Mutex<Storage>,
    hasher: &Arc<dyn PasswordHasher>,
    email: &str,
    password: &str,
) -> Result<(User, Parent)> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(Error::validation(MISSING_CREDENTIALS));
    }

    let password = password.to_string();
    let password_hash = off_runtime(hasher, move |h| h.hash(&password)).await??;
    storage
        .lock()
        .await
        .create_user_with_parent(email, &password_hash)
}

/// Check login credentials.
///
/// The storage lock is held only for the user lookup.
///
/// # Errors
///
/// Returns [`Error::Authentication`] if the email is unknown or the password
/// does not match, or a database error if the lookup fails.
pub async fn login(
    storage: &Mutex<Storage>,
    hasher: &Arc<dyn PasswordHasher>,
    email: &str,
    password: &str,
) -> Result<User> {
    let found = storage.lock().await.user_by_email(email.trim())?;
    let Some(user) = found else {
        debug!("Login for unknown email");
        return Err(Error::Authentication);
    };

    let password = password.to_string();
    let stored = user.password_hash.clone();
    let verified = off_runtime(hasher, move |h| h.verify(&password, &stored)).await?;
    if !verified {
        debug!(user_id = user.id, "Login with wrong password");
        return Err(Error::Authentication);
    }

    info!(user_id = user.id, "User logged in");
    Ok(user)
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::with_params(8, 1, 1).expect("valid test parameters")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::storage::test_support::storage;

    fn shared() -> (Mutex<Storage>, Arc<dyn PasswordHasher>) {
        (Mutex::new(storage()), Arc::new(test_hasher()))
    }

    /// Records whether the storage lock was free at each hash or verify.
    #[derive(Debug)]
    struct LockCheckingHasher {
        storage: Arc<Mutex<Storage>>,
        inner: Argon2Hasher,
        lock_free: StdMutex<Vec<bool>>,
    }

    impl LockCheckingHasher {
        fn record(&self) {
            let free = self.storage.try_lock().is_ok();
            self.lock_free.lock().unwrap().push(free);
        }
    }

    impl PasswordHasher for LockCheckingHasher {
        fn hash(&self, password: &str) -> Result<String> {
            self.record();
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.record();
            self.inner.verify(password, hash)
        }
    }

    #[test]
    fn test_hash_is_salted_and_not_plaintext() {
        let hasher = test_hasher();
        let first = hasher.hash("pw123").unwrap();
        let second = hasher.hash("pw123").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("pw123"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("pw123").unwrap();

        assert!(hasher.verify("pw123", &hash));
        assert!(!hasher.verify("pw124", &hash));
        assert!(!hasher.verify("pw123", "not a phc string"));
    }

    #[test]
    fn test_default_hasher_verifies_own_hash() {
        let hasher = Argon2Hasher::default();
        let hash = hasher.hash("secret").unwrap();
        assert!(hasher.verify("secret", &hash));
    }

    #[test]
    fn test_with_params_rejects_invalid() {
        assert!(Argon2Hasher::with_params(0, 0, 0).is_err());
    }

    #[tokio::test]
    async fn test_register_stores_hash() {
        let (storage, hasher) = shared();

        let (user, parent) = register(&storage, &hasher, " parent@example.com ", "pw123")
            .await
            .unwrap();

        assert_eq!(user.email, "parent@example.com");
        assert_ne!(user.password_hash, "pw123");
        assert_eq!(parent.name, "parent@example.com");
        assert_eq!(parent.user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let (storage, hasher) = shared();

        for (email, password) in [("", "pw123"), ("   ", "pw123"), ("a@example.com", "")] {
            let err = register(&storage, &hasher, email, password)
                .await
                .unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(storage.lock().await.stats().unwrap().users, 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (storage, hasher) = shared();
        register(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();

        let err = register(&storage, &hasher, "parent@example.com", "other")
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(
            storage
                .lock()
                .await
                .count_users_with_email("parent@example.com")
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_login_success() {
        let (storage, hasher) = shared();
        let (user, _) = register(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();

        let logged_in = login(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (storage, hasher) = shared();
        register(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();

        let wrong_password = login(&storage, &hasher, "parent@example.com", "nope")
            .await
            .unwrap_err();
        let unknown_email = login(&storage, &hasher, "other@example.com", "pw123")
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, Error::Authentication));
        assert!(matches!(unknown_email, Error::Authentication));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_hashing_runs_outside_storage_lock() {
        let storage = Arc::new(Mutex::new(storage()));
        let checking = Arc::new(LockCheckingHasher {
            storage: Arc::clone(&storage),
            inner: test_hasher(),
            lock_free: StdMutex::new(Vec::new()),
        });
        let hasher: Arc<dyn PasswordHasher> = checking.clone();

        register(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();
        login(&storage, &hasher, "parent@example.com", "pw123")
            .await
            .unwrap();

        assert_eq!(*checking.lock_free.lock().unwrap(), vec![true, true]);
    }
}
