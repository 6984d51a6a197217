//! User registration and profiles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::UserError;
use crate::identity::{Identity, IdentityProvider};
use crate::metadata::{Collection, DocumentStore};

/// Metadata collection holding user profiles.
pub const USERS_COLLECTION: &str = "users";

/// Registration input. Personal fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub nik: Option<String>,
    pub tanggal_lahir: Option<String>,
    pub tempat_lahir: Option<String>,
}

/// A stored user profile. Absent personal fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    /// National identity number.
    pub nik: String,
    /// Date of birth.
    pub tanggal_lahir: String,
    /// Place of birth.
    pub tempat_lahir: String,
}

/// Registration and profile lookup.
pub struct UserService {
    identities: Arc<dyn IdentityProvider>,
    profiles: Collection<UserProfile>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

impl UserService {
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityProvider>, docs: &DocumentStore) -> Self {
        Self {
            identities,
            profiles: docs.collection(USERS_COLLECTION),
        }
    }

    /// Create an identity, then store the user's profile under its id.
    ///
    /// # Errors
    ///
    /// - [`UserError::InputMissing`] if email or password is empty
    /// - [`UserError::Invalid`] if the identity provider rejects them
    /// - [`UserError::Conflict`] if the email is already registered
    /// - [`UserError::Upstream`] if the provider or store fails; a failed
    ///   profile write also removes the identity just created
    pub async fn register(&self, request: RegisterRequest) -> Result<Identity, UserError> {
        if request.email.trim().is_empty() {
            return Err(UserError::InputMissing { what: "email" });
        }
        if request.password.is_empty() {
            return Err(UserError::InputMissing { what: "password" });
        }

        let identity = self
            .identities
            .create_user(&request.email, &request.password)
            .await?;

        let profile = UserProfile {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            nik: request.nik.unwrap_or_default(),
            tanggal_lahir: request.tanggal_lahir.unwrap_or_default(),
            tempat_lahir: request.tempat_lahir.unwrap_or_default(),
        };
        if let Err(e) = self.profiles.set(&profile.uid, &profile).await {
            // Without a profile the identity is unusable; free the email.
            if let Err(cleanup) = self.identities.delete_user(&identity.email).await {
                tracing::warn!(
                    uid = %identity.uid,
                    error = %cleanup,
                    "identity left behind after failed profile write"
                );
            }
            return Err(e.into());
        }

        tracing::info!(uid = %identity.uid, "user registered");
        Ok(identity)
    }

    /// The profile of user `uid`.
    ///
    /// # Errors
    ///
    /// [`UserError::NotFound`] if there is none, [`UserError::Upstream`] if
    /// the store fails.
    pub async fn profile(&self, uid: &str) -> Result<UserProfile, UserError> {
        self.profiles
            .get(uid)
            .await?
            .ok_or_else(|| UserError::NotFound {
                uid: uid.to_owned(),
            })
    }
}
