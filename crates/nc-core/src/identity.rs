//! Identity service interface and in-memory backend
//!
//! The hosted backend owns accounts and sessions. [`IdentityService`] is the
//! seam the navigation shell resolves the current user through;
//! [`MemoryIdentity`] emulates it, including the sign-up trigger that
//! provisions `profiles`, `user_roles` and `patients` rows.

use crate::error::AuthError;
use crate::store::{Filter, RowStore, RowStoreExt, Table};
use crate::types::{NewPatient, Profile, Role, Sex, UserId, UserRoleRecord};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id, shared by the `profiles` row
    pub id: UserId,
    /// Normalized (trimmed, lowercase) e-mail
    pub email: String,
}

/// Profile metadata attached to a new account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    /// Display name
    pub name: String,
    /// Granted role
    pub role: Role,
    /// Required for patients, ignored otherwise
    #[serde(default)]
    pub birth_year: Option<i32>,
    /// Required for patients, ignored otherwise
    #[serde(default)]
    pub sex: Option<Sex>,
}

/// Account creation request
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    /// Login e-mail; compared case-insensitively
    pub email: String,
    /// Plain password; only its digest is kept
    pub password: String,
    /// Stored by the sign-up trigger
    pub metadata: SignUpMetadata,
}

/// Authentication and session retrieval
#[async_trait]
pub trait IdentityService: Send + Sync + std::fmt::Debug {
    /// Create an account and sign it in
    async fn sign_up(&self, request: SignUpRequest) -> Result<User, AuthError> {
        let email = normalize_email(&request.email);
        let metadata = &request.metadata;
        let demographics = match (metadata.role, metadata.birth_year, metadata.sex) {
            (Role::Patient, Some(year), Some(sex)) => Some((year, sex)),
            (Role::Patient, _, _) => {
                return Err(AuthError::InvalidMetadata(
                    "birth year and sex are required for patients".into(),
                ))
            }
            _ => None,
        };

        let user = User {
            id: UserId::new(),
            email: email.clone(),
        };
        match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => return Err(AuthError::AlreadyRegistered(email)),
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    user: user.clone(),
                    password_hash: hash_password(&email, &request.password),
                    provisioned: false,
                });
            }
        }

        if let Err(err) = self.provision(&user, metadata, demographics).await {
            self.accounts.remove(&email);
            return Err(err);
        }
        if let Some(mut account) = self.accounts.get_mut(&email) {
            account.provisioned = true;
        }
        *self.current.write() = Some(user.clone());

        tracing::info!(user = %user.id, role = %metadata.role, "account created");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Invalidate the current session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Identity of the current session, if any
    async fn current_user(&self) -> Result<Option<User>, AuthError>;
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_hash: String,
    /// False while the sign-up rows are being written
    provisioned: bool,
}

/// In-memory identity backend
#[derive(Debug)]
pub struct MemoryIdentity {
    store: Arc<dyn RowStore>,
    accounts: DashMap<String, Account>,
    current: RwLock<Option<User>>,
    fail_sign_out: AtomicBool,
}

impl MemoryIdentity {
    /// Create backend provisioning rows into `store`
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            accounts: DashMap::new(),
            current: RwLock::new(None),
            fail_sign_out: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `sign_out` fail (session stays valid remotely)
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Number of registered accounts
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Write the rows the hosted sign-up trigger creates. Either all of
    /// them are stored or, on error, none are.
    async fn provision(
        &self,
        user: &User,
        metadata: &SignUpMetadata,
        demographics: Option<(i32, Sex)>,
    ) -> Result<(), AuthError> {
        let result = self.write_rows(user, metadata, demographics).await;
        if result.is_err() {
            self.remove_rows(user.id).await;
        }
        result
    }

    async fn write_rows(
        &self,
        user: &User,
        metadata: &SignUpMetadata,
        demographics: Option<(i32, Sex)>,
    ) -> Result<(), AuthError> {
        let profile = Profile {
            id: user.id,
            email: user.email.clone(),
            name: metadata.name.clone(),
            birth_year: demographics.map(|(year, _)| year),
            sex: demographics.map(|(_, sex)| sex),
        };
        let _: Profile = self.store.insert_as(Table::Profiles, &profile).await?;

        let role = serde_json::json!({ "user_id": user.id, "role": metadata.role });
        let _: UserRoleRecord = self.store.insert_as(Table::UserRoles, &role).await?;

        if let Some((birth_year, sex)) = demographics {
            let patient = NewPatient {
                user_id: Some(user.id),
                clinician_id: None,
                birth_year,
                sex,
                risk_level: None,
            };
            let row = crate::store::encode_row(Table::Patients, &patient)?;
            self.store.insert(Table::Patients, row).await?;
        }
        Ok(())
    }

    async fn remove_rows(&self, user: UserId) {
        let owned = [
            (Table::Patients, "user_id"),
            (Table::UserRoles, "user_id"),
            (Table::Profiles, "id"),
        ];
        for (table, column) in owned {
            if let Err(err) = self.store.delete(table, &[Filter::eq(column, user)]).await {
                tracing::warn!(%user, %table, error = %err, "sign-up rollback incomplete");
            }
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update([0]);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn sign_up(&self, request: SignUpRequest) -> Result<User, AuthError> {
        let email = normalize_email(&request.email);
        if self.accounts.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered(email));
        }
        if request.metadata.role == Role::Patient
            && (request.metadata.birth_year.is_none() || request.metadata.sex.is_none())
        {
            return Err(AuthError::InvalidMetadata(
                "birth year and sex are required for patients".into(),
            ));
        }

        let user = User {
            id: UserId::new(),
            email: email.clone(),
        };
        self.provision(&user, &request.metadata).await?;
        self.accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_hash: hash_password(&email, &request.password),
            },
        );
        *self.current.write() = Some(user.clone());

        tracing::info!(user = %user.id, role = %request.metadata.role, "account created");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let account = self
            .accounts
            .get(&email)
            .filter(|a| a.provisioned)
            .map(|a| a.value().clone())
            .ok_or(AuthError::InvalidCredentials)?;
        if account.password_hash != hash_password(&email, password) {
            return Err(AuthError::InvalidCredentials);
        }
        *self.current.write() = Some(account.user.clone());
        Ok(account.user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Backend("session invalidation failed".into()));
        }
        *self.current.write() = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, AuthError> {
        Ok(self.current.read().clone())
    }
}
