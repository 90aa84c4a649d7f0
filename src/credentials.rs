//! Admin accounts: usernames mapped to salted Argon2id hashes, stored as a
//! single JSON object.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_ADMINS_FILE: &str = "admin_users.json";
pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username '{0}' is already registered")]
    UsernameTaken(String),

    #[error("username must be at least 3 characters long")]
    UsernameTooShort,

    #[error("password must be at least 4 characters long")]
    PasswordTooShort,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<argon2::password_hash::Error> for CredentialError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn register(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(CredentialError::UsernameTooShort);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooShort);
        }

        let mut admins = self.load()?;
        if admins.contains_key(username) {
            return Err(CredentialError::UsernameTaken(username.to_string()));
        }
        admins.insert(username.to_string(), hash_password(password)?);
        self.store(&admins)?;
        info!(username, "admin registered");
        Ok(())
    }

    /// `Ok(false)` for unknown users and wrong passwords alike.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        match self.load()?.get(username) {
            Some(hash) => verify_password(password, hash),
            None => Ok(false),
        }
    }

    pub fn any_admin_exists(&self) -> Result<bool, CredentialError> {
        Ok(!self.load()?.is_empty())
    }

    fn load(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, admins: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(admins)?)?;
        Ok(())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_ADMINS_FILE)
    }
}

fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
