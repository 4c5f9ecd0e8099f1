use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiCredential {
    pub api_key: String,
}

impl ApiCredential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

pub trait CredentialStore: Send + Sync {
    fn save_credential(&self, credential: &ApiCredential) -> Result<(), InfraError>;
    fn load_credential(&self) -> Result<Option<ApiCredential>, InfraError>;
    fn delete_credential(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new("weekplan.openai", "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_credential(&self, credential: &ApiCredential) -> Result<(), InfraError> {
        let payload = serde_json::to_string(credential)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_credential(&self) -> Result<Option<ApiCredential>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        let credential = serde_json::from_str::<ApiCredential>(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        Ok(Some(credential))
    }

    fn delete_credential(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credential: Mutex<Option<ApiCredential>>,
}

impl InMemoryCredentialStore {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            credential: Mutex::new(Some(ApiCredential::new(api_key))),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save_credential(&self, credential: &ApiCredential) -> Result<(), InfraError> {
        let mut guard = self
            .credential
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(credential.clone());
        Ok(())
    }

    fn load_credential(&self) -> Result<Option<ApiCredential>, InfraError> {
        let guard = self
            .credential
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_credential(&self) -> Result<(), InfraError> {
        let mut guard = self
            .credential
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

/// Prefers `OPENAI_API_KEY` from the process environment, falling back to
/// the wrapped store for everything else.
pub struct EnvBackedCredentialStore<C> {
    inner: C,
    env_lookup: fn() -> Option<String>,
}

fn read_env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}

impl<C> EnvBackedCredentialStore<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            env_lookup: read_env_api_key,
        }
    }

    #[cfg(test)]
    fn with_env_lookup(inner: C, env_lookup: fn() -> Option<String>) -> Self {
        Self { inner, env_lookup }
    }
}

impl<C: CredentialStore> CredentialStore for EnvBackedCredentialStore<C> {
    fn save_credential(&self, credential: &ApiCredential) -> Result<(), InfraError> {
        self.inner.save_credential(credential)
    }

    fn load_credential(&self) -> Result<Option<ApiCredential>, InfraError> {
        if let Some(value) = (self.env_lookup)() {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(Some(ApiCredential::new(trimmed)));
            }
        }
        self.inner.load_credential()
    }

    fn delete_credential(&self) -> Result<(), InfraError> {
        self.inner.delete_credential()
    }
}

/// Blank keys count as absent; whitespace is stripped.
pub fn resolve_api_key<C: CredentialStore + ?Sized>(
    store: &C,
) -> Result<Option<String>, InfraError> {
    Ok(store
        .load_credential()?
        .filter(ApiCredential::is_usable)
        .map(|credential| credential.api_key.trim().to_string()))
}
