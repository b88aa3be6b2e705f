use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::Collection;
use crate::util::base64_engine;

pub type Salt = [u8; 16];

/// Salted SHA-256 digest of a collection password, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    pub salt: String,
    pub digest: String,
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut sha = Sha256::new();
    sha.update(salt);
    sha.update(password.as_bytes());
    sha.finalize().to_vec()
}

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> PasswordHash {
        let salt: Salt = rand::random();
        PasswordHash::with_salt(&salt, password)
    }

    pub fn with_salt(salt: &Salt, password: impl AsRef<str>) -> PasswordHash {
        let engine = base64_engine();
        PasswordHash {
            salt: engine.encode(salt),
            digest: engine.encode(digest(salt, password.as_ref())),
        }
    }

    pub fn verify(&self, candidate: impl AsRef<str>) -> bool {
        let engine = base64_engine();
        let (salt, expected) = match (engine.decode(&self.salt), engine.decode(&self.digest)) {
            (Ok(salt), Ok(expected)) => (salt, expected),
            _ => {
                tracing::warn!("Stored password hash isn't valid base64.");
                return false;
            }
        };

        digest(&salt, candidate.as_ref()).ct_eq(&expected).into()
    }
}

/// How a collection password is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordStorage {
    #[default]
    Plain,
    Hashed,
}

impl PasswordStorage {
    pub fn from_config(hash_passwords: bool) -> PasswordStorage {
        if hash_passwords {
            PasswordStorage::Hashed
        } else {
            PasswordStorage::Plain
        }
    }

    /// Returns the `(password, password_hash)` pair to persist.
    pub fn seal(self, password: &str) -> (Option<String>, Option<PasswordHash>) {
        match self {
            PasswordStorage::Plain => (Some(password.to_string()), None),
            PasswordStorage::Hashed => (None, Some(PasswordHash::new(password))),
        }
    }
}

/// Checks a join attempt against whichever representation the collection was stored with.
pub fn verify_password(collection: &Collection, candidate: &str) -> bool {
    if let Some(hash) = &collection.password_hash {
        return hash.verify(candidate);
    }

    match &collection.password {
        Some(plain) => plain.as_bytes().ct_eq(candidate.as_bytes()).into(),
        None => false,
    }
}
