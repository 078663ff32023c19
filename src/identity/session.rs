//! Session & Registration Storage
//!
//! Persists the client's registration and login session under `~/.agora`
//! and exposes the read-only identity provider used during contract
//! finalization. Both files may contain credentials and are written
//! with mode 0o600.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::PlatformClient;

/// Directory name under the user's home for all agora client data.
const AGORA_DIR_NAME: &str = ".agora";

/// Session file name within the agora directory.
const SESSION_FILENAME: &str = "session.json";

/// Registration file name within the agora directory.
const REGISTRATION_FILENAME: &str = "registration.json";

/// Returns the agora base directory: `~/.agora`.
pub fn get_agora_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    home.join(AGORA_DIR_NAME)
}

/// Returns the full path to the session file: `~/.agora/session.json`.
pub fn get_session_path() -> PathBuf {
    get_agora_dir().join(SESSION_FILENAME)
}

/// Returns the full path to the registration file: `~/.agora/registration.json`.
pub fn get_registration_path() -> PathBuf {
    get_agora_dir().join(REGISTRATION_FILENAME)
}

fn ensure_agora_dir() -> Result<PathBuf> {
    let dir = get_agora_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create agora directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
            .context("Failed to set directory permissions")?;
    }
    Ok(dir)
}

fn write_private(path: &PathBuf, json: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context("Failed to set file permissions")?;
    Ok(())
}

// ─── Registration ────────────────────────────────────────────────

/// On-disk client registration. The private key is stored as an opaque
/// string and never used to sign anything.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub email: String,
    pub wallet_address: String,
    pub private_key: String,
    pub created_at: String,
}

/// Persist a client registration locally.
pub fn save_registration(email: &str, wallet_address: &str, private_key: &str) -> Result<()> {
    ensure_agora_dir()?;
    let data = RegistrationData {
        email: email.to_string(),
        wallet_address: wallet_address.to_string(),
        private_key: private_key.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&data).context("Failed to serialize registration")?;
    write_private(&get_registration_path(), &json)
}

/// Load the local registration, if any. Corrupt files read as absent.
pub fn load_registration() -> Option<RegistrationData> {
    let contents = fs::read_to_string(get_registration_path()).ok()?;
    serde_json::from_str(&contents).ok()
}

// ─── Session ─────────────────────────────────────────────────────

/// Persist the session blob returned by the platform's `/login`.
pub fn save_session(session: &Value) -> Result<()> {
    ensure_agora_dir()?;
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    write_private(&get_session_path(), &json)
}

/// Load the raw session blob, if any. Corrupt files read as absent.
pub fn load_session() -> Option<Value> {
    let contents = fs::read_to_string(get_session_path()).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Remove the stored session, logging the client out.
pub fn clear_session() -> Result<()> {
    let path = get_session_path();
    if path.exists() {
        fs::remove_file(&path).context("Failed to remove session file")?;
    }
    Ok(())
}

// ─── Login flow ──────────────────────────────────────────────────

/// Log in against the platform, falling back to the local registration
/// when the platform is unreachable.
///
/// On platform success the returned session blob is stored verbatim.
/// In the fallback path, credentials matching the local registration
/// synthesize a demo session in the same `{client: {...}}` shape so the
/// identity provider reads both identically. Mismatched or absent local
/// credentials fail the login.
pub async fn login(platform: &dyn PlatformClient, email: &str, password: &str) -> Result<Value> {
    match platform.login(email, password).await {
        Ok(session) => {
            save_session(&session)?;
            Ok(session)
        }
        Err(e) => {
            warn!("Login API failed, checking local registration: {e:#}");
            let reg = load_registration()
                .context("Login failed and no local registration found. Register first.")?;
            let session = fallback_session(&reg, email, password)
                .context("Login failed: invalid credentials")?;
            save_session(&session)?;
            Ok(session)
        }
    }
}

/// Build a demo-mode session from the local registration, or `None`
/// when the credentials do not match.
///
/// The stored registration has no password of its own (the original
/// flow only checks the email), so any non-empty password with the
/// registered email is accepted in demo mode.
pub fn fallback_session(reg: &RegistrationData, email: &str, password: &str) -> Option<Value> {
    if reg.email != email || password.is_empty() {
        return None;
    }
    Some(serde_json::json!({
        "client": {
            "email_address": reg.email,
            "eth_wallet_address": reg.wallet_address,
        },
        "demo": true,
    }))
}

// ─── Identity provider ───────────────────────────────────────────

/// The client identity carried into contract finalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
    pub email_address: String,
    pub eth_wallet_address: Option<String>,
}

/// Read-only source of the logged-in client's identity. Absence (not
/// logged in, unreadable session) is a defined value, never a crash.
pub trait IdentityProvider: Send + Sync {
    fn client_identity(&self) -> Option<ClientIdentity>;
}

/// Identity provider backed by `~/.agora/session.json`.
pub struct FileIdentityProvider;

impl IdentityProvider for FileIdentityProvider {
    fn client_identity(&self) -> Option<ClientIdentity> {
        let session = load_session()?;
        let identity = identity_from_session(&session);
        if identity.is_none() {
            debug!("Session file present but carries no client identity");
        }
        identity
    }
}

/// Extract the client identity from a session blob, tolerating missing
/// optional fields.
pub fn identity_from_session(session: &Value) -> Option<ClientIdentity> {
    let client = session.get("client")?;
    let email = client.get("email_address")?.as_str()?;
    if email.is_empty() {
        return None;
    }
    let wallet = client
        .get("eth_wallet_address")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    Some(ClientIdentity {
        email_address: email.to_string(),
        eth_wallet_address: wallet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agora_dir_is_under_home() {
        let dir = get_agora_dir();
        assert!(dir.ends_with(".agora"));
    }

    #[test]
    fn test_session_path_is_under_agora_dir() {
        let path = get_session_path();
        assert!(path.ends_with("session.json"));
        assert!(path.starts_with(get_agora_dir()));
    }

    #[test]
    fn test_identity_from_full_session() {
        let session = serde_json::json!({
            "client": {
                "email_address": "maahir@example.com",
                "eth_wallet_address": "0xabc",
            }
        });
        let identity = identity_from_session(&session).unwrap();
        assert_eq!(identity.email_address, "maahir@example.com");
        assert_eq!(identity.eth_wallet_address.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_identity_missing_wallet_is_none_field() {
        let session = serde_json::json!({
            "client": { "email_address": "maahir@example.com" }
        });
        let identity = identity_from_session(&session).unwrap();
        assert!(identity.eth_wallet_address.is_none());
    }

    #[test]
    fn test_identity_absent_client_is_absent() {
        let session = serde_json::json!({ "loggedIn": true });
        assert!(identity_from_session(&session).is_none());
    }

    #[test]
    fn test_fallback_session_requires_matching_email() {
        let reg = RegistrationData {
            email: "maahir@example.com".to_string(),
            wallet_address: "0xabc".to_string(),
            private_key: "0xsecret".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        assert!(fallback_session(&reg, "other@example.com", "pw").is_none());
        assert!(fallback_session(&reg, "maahir@example.com", "").is_none());

        let session = fallback_session(&reg, "maahir@example.com", "pw").unwrap();
        let identity = identity_from_session(&session).unwrap();
        assert_eq!(identity.email_address, "maahir@example.com");
        assert_eq!(identity.eth_wallet_address.as_deref(), Some("0xabc"));
    }
}
