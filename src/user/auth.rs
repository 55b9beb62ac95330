//! Password hashing and session tokens.

use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct TokenValue(pub String);

impl TokenValue {
    pub fn generate() -> TokenValue {
        let value: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        TokenValue(value)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SessionToken {
    pub user_id: crate::store::UserId,
    pub value: TokenValue,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

mod argon2_hasher {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash(plain: &[u8], b64_salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt).map_err(|err| anyhow!("{}", err))?;
        let hash_string = Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify(plain: &[u8], target_hash: &str) -> Result<bool> {
        let password_hash = PasswordHash::new(target_hash).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default().verify_password(plain, &password_hash).is_ok())
    }
}

#[cfg(feature = "test-fast-hasher")]
mod fast_hasher {
    //! Unsalted-strength sha256 stand-in. Orders of magnitude faster than
    //! argon2; never enable outside of test runs.

    use anyhow::Result;
    use sha2::{Digest, Sha256};

    pub fn hash(plain: &[u8], salt: &str) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(plain);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum CredentialsHasher {
    Argon2,
    #[cfg(feature = "test-fast-hasher")]
    FastSha256,
}

impl CredentialsHasher {
    /// The hasher used for new credentials.
    pub fn default_hasher() -> Self {
        #[cfg(feature = "test-fast-hasher")]
        return CredentialsHasher::FastSha256;
        #[cfg(not(feature = "test-fast-hasher"))]
        CredentialsHasher::Argon2
    }

    pub fn generate_b64_salt(&self) -> String {
        argon2_hasher::generate_b64_salt()
    }

    pub fn hash(&self, plain: &[u8], b64_salt: &str) -> Result<String> {
        match self {
            CredentialsHasher::Argon2 => argon2_hasher::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            CredentialsHasher::FastSha256 => fast_hasher::hash(plain, b64_salt),
        }
    }

    pub fn verify(&self, plain: &str, target_hash: &str, salt: &str) -> Result<bool> {
        match self {
            CredentialsHasher::Argon2 => {
                let _ = salt; // the PHC string embeds it
                argon2_hasher::verify(plain.as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            CredentialsHasher::FastSha256 => {
                Ok(fast_hasher::hash(plain.as_bytes(), salt)? == target_hash)
            }
        }
    }
}

impl FromStr for CredentialsHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(CredentialsHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "fast-sha256" => Ok(CredentialsHasher::FastSha256),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for CredentialsHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialsHasher::Argon2 => "argon2",
            #[cfg(feature = "test-fast-hasher")]
            CredentialsHasher::FastSha256 => "fast-sha256",
        };
        write!(f, "{}", name)
    }
}
