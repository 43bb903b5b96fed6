//! Fixed account table loaded at startup.
//!
//! Passwords are stored only as argon2 PHC strings. The table is validated once
//! when it is built and is read-only afterwards.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::error;
use utoipa::ToSchema;

static USERNAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@-]{1,64}$"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Viewer,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    username: String,
    password_hash: String,
    #[serde(default)]
    role: Role,
}

impl Account {
    #[must_use]
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("failed to read accounts file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid accounts document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no accounts defined")]
    Empty,
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("duplicate username: {0}")]
    DuplicateUsername(String),
    #[error("account {username} has an invalid password hash: {reason}")]
    InvalidHash { username: String, reason: String },
    #[error("failed to hash password: {0}")]
    Hash(String),
}

#[derive(Deserialize)]
struct AccountsFile {
    accounts: Vec<Account>,
}

#[derive(Debug)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
    // Verified against when the username is unknown so both paths cost the same.
    decoy_hash: String,
}

impl AccountStore {
    /// Build the table from already-parsed accounts.
    ///
    /// # Errors
    /// Returns an error for an empty list, a malformed or duplicate username, or a
    /// password hash that is not a valid PHC string.
    pub fn new(accounts: Vec<Account>) -> Result<Self, AccountsError> {
        let decoy_hash = accounts
            .first()
            .map(|account| account.password_hash.clone())
            .ok_or(AccountsError::Empty)?;

        let mut table = HashMap::with_capacity(accounts.len());
        for account in accounts {
            if !valid_username(&account.username) {
                return Err(AccountsError::InvalidUsername(account.username));
            }
            match PasswordHash::new(&account.password_hash) {
                Ok(parsed) if parsed.algorithm.as_str() == "argon2id" => {}
                Ok(parsed) => {
                    return Err(AccountsError::InvalidHash {
                        reason: format!("unsupported algorithm {}", parsed.algorithm),
                        username: account.username,
                    });
                }
                Err(err) => {
                    return Err(AccountsError::InvalidHash {
                        username: account.username,
                        reason: err.to_string(),
                    });
                }
            }
            if table.contains_key(&account.username) {
                return Err(AccountsError::DuplicateUsername(account.username));
            }
            table.insert(account.username.clone(), account);
        }

        Ok(Self {
            accounts: table,
            decoy_hash,
        })
    }

    /// Parse a `{"accounts": [...]}` document.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or any account is invalid.
    pub fn from_json(json: &str) -> Result<Self, AccountsError> {
        let file: AccountsFile = serde_json::from_str(json)?;
        Self::new(file.accounts)
    }

    /// Read and parse an accounts file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, AccountsError> {
        let json = fs::read_to_string(path).map_err(|source| AccountsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Check a password for `username`. Unknown usernames still pay for a
    /// verification against the decoy hash.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.accounts.get(username) {
            Some(account) => verify_password(password, &account.password_hash),
            None => {
                let _ = verify_password(password, &self.decoy_hash);
                false
            }
        }
    }
}

/// Hash a password with the default argon2id parameters.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AccountsError> {
    hash_password_with(password, Params::default())
}

/// Hash a password with explicit argon2id parameters.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password_with(password: &str, params: Params) -> Result<String, AccountsError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountsError::Hash(err.to_string()))
}

/// Verify a password against a stored hash; parameters come from the hash itself.
fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn valid_username(username: &str) -> bool {
    match &*USERNAME {
        Ok(regex) => regex.is_match(username),
        Err(err) => {
            error!("Username pattern failed to compile: {err}");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap parameters so tests do not spend seconds hashing.
    pub(crate) fn cheap_hash(password: &str) -> String {
        let params = Params::new(64, 1, 1, None).unwrap();
        hash_password_with(password, params).unwrap()
    }

    #[test]
    fn username_pattern_compiles() {
        assert!(USERNAME.is_ok());
        assert!(valid_username("first.last@example-1"));
        assert!(!valid_username("spaced name"));
    }

    pub(crate) fn demo_store() -> AccountStore {
        AccountStore::new(vec![
            Account::new("demo", cheap_hash("demo123"), Role::Viewer),
            Account::new("admin", cheap_hash("s3cret-admin"), Role::Admin),
        ])
        .unwrap()
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let store = demo_store();
        assert!(store.verify("demo", "demo123"));
        assert!(store.verify("admin", "s3cret-admin"));
        assert!(!store.verify("demo", "wrong"));
        assert!(!store.verify("demo", ""));
        assert!(!store.verify("demo", "s3cret-admin"));
    }

    #[test]
    fn verify_rejects_unknown_user_even_with_decoy_password() {
        let store = demo_store();
        // The decoy hash belongs to "demo"; its password must not open other names.
        assert!(!store.verify("nobody", "demo123"));
        assert!(!store.verify("", ""));
    }

    #[test]
    fn hash_password_produces_argon2id_phc() {
        let hash = cheap_hash("pw");
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(verify_password("pw", &hash));
        assert!(!verify_password("pw", "not-a-hash"));
    }

    #[test]
    fn from_json_reads_roles_with_default() {
        let json = format!(
            r#"{{"accounts": [
                {{"username": "demo", "password_hash": "{}"}},
                {{"username": "boss", "password_hash": "{}", "role": "admin"}}
            ]}}"#,
            cheap_hash("a"),
            cheap_hash("b")
        );
        let store = AccountStore::from_json(&json).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("demo").map(Account::role), Some(Role::Viewer));
        assert_eq!(store.get("boss").map(Account::role), Some(Role::Admin));
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(
            AccountStore::new(Vec::new()),
            Err(AccountsError::Empty)
        ));
    }

    #[test]
    fn rejects_duplicate_usernames() {
        let result = AccountStore::new(vec![
            Account::new("demo", cheap_hash("a"), Role::Viewer),
            Account::new("demo", cheap_hash("b"), Role::Admin),
        ]);
        assert!(matches!(result, Err(AccountsError::DuplicateUsername(name)) if name == "demo"));
    }

    #[test]
    fn rejects_plaintext_or_fake_hashes() {
        for bogus in [
            "demo123",
            "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p30ldGxxHG7PvqcZ6Tfy5O",
            "$argon2i$v=19$m=64,t=1,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNo",
            "",
        ] {
            let result = AccountStore::new(vec![Account::new("demo", bogus, Role::Viewer)]);
            assert!(
                matches!(result, Err(AccountsError::InvalidHash { .. })),
                "{bogus:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_usernames() {
        let long = "x".repeat(65);
        for name in ["", "has space", "semi;colon", long.as_str()] {
            let result = AccountStore::new(vec![Account::new(name, cheap_hash("a"), Role::Viewer)]);
            assert!(matches!(result, Err(AccountsError::InvalidUsername(_))));
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let result = AccountStore::load(Path::new("/nonexistent/storygate/accounts.json"));
        assert!(matches!(result, Err(AccountsError::Io { .. })));
    }

    #[test]
    fn example_accounts_file_contains_demo() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("accounts.example.json");
        let store = AccountStore::load(&path).unwrap();
        assert!(store.verify("demo", "demo123"));
        assert!(!store.verify("demo", "wrong"));
    }
}
