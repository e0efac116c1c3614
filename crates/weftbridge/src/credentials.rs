//! Credential sealing seam.
//!
//! The registry only ever holds opaque handles; plaintext credential
//! material exists exactly twice: when sealed at registration and when
//! opened by the gateway at the moment of a tool call. Plaintext is
//! never logged and never stored.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use weftcore::BridgeError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Seal plaintext credentials, returning an opaque handle safe to
    /// store and log.
    async fn seal(&self, plaintext: Value) -> Result<String, BridgeError>;

    /// Open a previously sealed handle. Called only at the point of
    /// use.
    async fn open(&self, handle: &str) -> Result<Value, BridgeError>;
}

/// In-memory vault: handles are random and carry no information about
/// the material they name. Suitable for local runs and tests; a real
/// deployment backs this trait with a KMS or secrets manager.
#[derive(Default)]
pub struct MemoryCredentialStore {
    sealed: Mutex<HashMap<String, Value>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn seal(&self, plaintext: Value) -> Result<String, BridgeError> {
        let handle = Uuid::new_v4().to_string();
        self.sealed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle.clone(), plaintext);
        Ok(handle)
    }

    async fn open(&self, handle: &str) -> Result<Value, BridgeError> {
        self.sealed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .cloned()
            .ok_or_else(|| BridgeError::Credential(format!("unknown credential handle: {handle}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn seal_then_open_round_trips() {
        let store = MemoryCredentialStore::new();
        let handle = store.seal(json!({"api_key": "s3cret"})).await.unwrap();
        assert_ne!(handle, "s3cret");

        let opened = store.open(&handle).await.unwrap();
        assert_eq!(opened["api_key"], "s3cret");
    }

    #[tokio::test]
    async fn unknown_handle_is_a_credential_error() {
        let store = MemoryCredentialStore::new();
        let err = store.open("nope").await.unwrap_err();
        assert!(matches!(err, BridgeError::Credential(_)));
    }
}
