//! Identity provider.
//!
//! Registration creates an identity (a generated user id bound to an email
//! and password) before any profile data is written. [`IdentityProvider`] is
//! the seam; [`LocalIdentityProvider`] keeps identities in the storage backend
//! under `auth/identities/<email>` with Argon2id password hashes.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surat_storage::StorageBackend;
use tokio::sync::Mutex;

use crate::error::IdentityError;

const PREFIX: &str = "auth/identities/";

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A created identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Creates identities for new users.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Create an identity for `email` with `password`.
    ///
    /// # Errors
    ///
    /// [`IdentityError::InvalidEmail`], [`IdentityError::WeakPassword`] and
    /// [`IdentityError::EmailExists`] for rejected input; other variants for
    /// provider failures.
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Remove the identity registered for `email`. Unknown emails are fine.
    ///
    /// # Errors
    ///
    /// Provider failures.
    async fn delete_user(&self, email: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    uid: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Identity provider backed by the storage backend.
pub struct LocalIdentityProvider {
    backend: Arc<dyn StorageBackend>,
    argon2: Argon2<'static>,
    create_lock: Mutex<()>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            argon2: Argon2::default(),
            create_lock: Mutex::new(()),
        }
    }

    fn key(email: &str) -> String {
        format!("{PREFIX}{email}")
    }
}

impl std::fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityProvider").finish_non_exhaustive()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), IdentityError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && !email.contains('/')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidEmail {
            email: email.to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                min_length: MIN_PASSWORD_LEN,
            });
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IdentityError::Hash {
                reason: e.to_string(),
            })?
            .to_string();

        let _guard = self.create_lock.lock().await;
        if self.backend.exists(&Self::key(&email)).await? {
            return Err(IdentityError::EmailExists { email });
        }

        let stored = StoredIdentity {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        };
        let data = serde_json::to_vec(&stored).map_err(|e| IdentityError::Serialization {
            reason: e.to_string(),
        })?;
        self.backend.put(&Self::key(&stored.email), &data).await?;

        tracing::info!(uid = %stored.uid, "identity created");
        Ok(Identity {
            uid: stored.uid,
            email: stored.email,
        })
    }

    async fn delete_user(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email);
        self.backend.delete(&Self::key(&email)).await?;
        tracing::info!(email = %email, "identity removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use surat_storage::MemoryBackend;

    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    use super::*;

    impl LocalIdentityProvider {
        async fn verify(&self, email: &str, password: &str) -> Option<Identity> {
            let raw = self.backend.get(&Self::key(&normalize_email(email))).await.unwrap()?;
            let stored: StoredIdentity = serde_json::from_slice(&raw).unwrap();
            let hash = PasswordHash::new(&stored.password_hash).unwrap();
            self.argon2.verify_password(password.as_bytes(), &hash).ok()?;
            Some(Identity {
                uid: stored.uid,
                email: stored.email,
            })
        }
    }

    fn provider() -> LocalIdentityProvider {
        LocalIdentityProvider::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn create_then_verify() {
        let idp = provider();
        let identity = idp.create_user(" Ana@Example.com ", "secret1").await.unwrap();
        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(identity.uid.len(), 32);

        let verified = idp.verify("ana@example.com", "secret1").await;
        assert_eq!(verified, Some(identity));
        assert_eq!(idp.verify("ana@example.com", "wrong!!").await, None);
        assert_eq!(idp.verify("bo@example.com", "secret1").await, None);
    }

    #[tokio::test]
    async fn salts_differ_between_identities() {
        let backend = MemoryBackend::new();
        let idp = LocalIdentityProvider::new(Arc::new(backend.clone()));
        idp.create_user("ana@example.com", "secret1").await.unwrap();
        idp.create_user("bo@example.com", "secret1").await.unwrap();

        let mut hashes = Vec::new();
        for key in backend.list(PREFIX).await.unwrap() {
            let stored: StoredIdentity =
                serde_json::from_slice(&backend.get(&key).await.unwrap().unwrap()).unwrap();
            hashes.push(stored.password_hash);
        }
        assert_eq!(hashes.len(), 2);
        assert_ne!(hashes[0], hashes[1]);
    }

    #[tokio::test]
    async fn deleted_identity_frees_the_email() {
        let idp = provider();
        let first = idp.create_user("ana@example.com", "secret1").await.unwrap();
        idp.delete_user(" ANA@example.com").await.unwrap();
        assert_eq!(idp.verify("ana@example.com", "secret1").await, None);
        idp.delete_user("ana@example.com").await.unwrap();

        let second = idp.create_user("ana@example.com", "secret2").await.unwrap();
        assert_ne!(first.uid, second.uid);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let idp = provider();
        idp.create_user("ana@example.com", "secret1").await.unwrap();
        let err = idp.create_user("ANA@example.com", "other-secret").await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailExists { ref email } if email == "ana@example.com"));
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let idp = provider();
        for email in ["", "no-at-sign", "@example.com", "ana@", "a b@example.com", "a@b@c"] {
            let err = idp.create_user(email, "secret1").await.unwrap_err();
            assert!(matches!(err, IdentityError::InvalidEmail { .. }), "{email:?}");
        }
        let err = idp.create_user("ana@example.com", "12345").await.unwrap_err();
        assert!(matches!(err, IdentityError::WeakPassword { min_length: 6 }));
    }

    #[tokio::test]
    async fn stored_record_holds_a_hash_not_the_password() {
        let backend = MemoryBackend::new();
        let idp = LocalIdentityProvider::new(Arc::new(backend.clone()));
        idp.create_user("ana@example.com", "secret1").await.unwrap();

        let raw = backend.get("auth/identities/ana@example.com").await.unwrap().unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.contains("$argon2id$"));
        assert!(!raw.contains("secret1"));
    }
}
