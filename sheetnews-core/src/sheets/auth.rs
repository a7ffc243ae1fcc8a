//! Bearer tokens for the Sheets API

use super::SheetsError;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;
use yup_oauth2::ServiceAccountAuthenticator;
use yup_oauth2::authenticator::DefaultAuthenticator;

/// Something that can hand out an OAuth2 access token
pub trait TokenSource {
    fn access_token(&mut self) -> Result<String, SheetsError>;
}

/// A token obtained elsewhere, used as-is
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn access_token(&mut self) -> Result<String, SheetsError> {
        if self.0.trim().is_empty() {
            return Err(SheetsError::Auth("access token is empty".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Service-account flow; tokens are cached and refreshed by the authenticator.
///
/// The authenticator is async, so it runs on a private current-thread runtime.
pub struct ServiceAccountTokens {
    runtime: Runtime,
    authenticator: DefaultAuthenticator,
    scopes: Vec<String>,
}

impl ServiceAccountTokens {
    /// Read the key file and build the authenticator
    pub fn from_key_file(key_path: &Path, scopes: &[String]) -> Result<Self, SheetsError> {
        if !key_path.exists() {
            return Err(SheetsError::Auth(format!(
                "service account key not found at {}",
                key_path.display()
            )));
        }
        if scopes.is_empty() {
            return Err(SheetsError::Auth("no OAuth scopes configured".to_string()));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let authenticator = runtime.block_on(async {
            let key = yup_oauth2::read_service_account_key(key_path)
                .await
                .map_err(|e| {
                    SheetsError::Auth(format!("invalid key file {}: {}", key_path.display(), e))
                })?;
            debug!("Loaded service account key for {}", key.client_email);
            ServiceAccountAuthenticator::builder(key)
                .build()
                .await
                .map_err(|e| SheetsError::Auth(e.to_string()))
        })?;

        Ok(Self {
            runtime,
            authenticator,
            scopes: scopes.to_vec(),
        })
    }
}

impl TokenSource for ServiceAccountTokens {
    fn access_token(&mut self) -> Result<String, SheetsError> {
        let token = self
            .runtime
            .block_on(self.authenticator.token(&self.scopes))
            .map_err(|e| SheetsError::Auth(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| SheetsError::Auth("token response carried no access token".to_string()))
    }
}
