use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use crate::{error::DirectoryError, models::DirectoryRecord, repository::RepositoryState};

/// Header carrying the shared key for the directory search endpoint.
pub const DIRECTORY_KEY_HEADER: &str = "x-directory-key";

/// Path of the search endpoint, relative to the directory base URL.
pub const SEARCH_PATH: &str = "/api/users/search";

/// UserDirectory
///
/// Email to directory records. Callers use only the first record; an empty list means
/// "no such user" and is not an error.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, DirectoryError>;
}

pub type DirectoryState = Arc<dyn UserDirectory>;

/// HttpDirectory
///
/// Looks users up through the search endpoint of a (possibly remote) CRM instance.
/// Any non-2xx status is a failure, as is a body that is not a JSON array of records.
pub struct HttpDirectory {
    client: reqwest::Client,
    search_url: String,
    api_key: Option<String>,
}

impl HttpDirectory {
    /// # Errors
    /// Fails only if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            search_url: format!("{}{}", base_url.trim_end_matches('/'), SEARCH_PATH),
            api_key,
        })
    }
}

#[async_trait]
impl UserDirectory for HttpDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, DirectoryError> {
        let mut request = self.client.get(&self.search_url).query(&[("email", email)]);
        if let Some(key) = &self.api_key {
            request = request.header(DIRECTORY_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Vec<DirectoryRecord>>(&body)
            .map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

/// RepositoryDirectory
///
/// In-process lookups straight against the repository, used when no `DIRECTORY_URL`
/// is configured.
pub struct RepositoryDirectory {
    repo: RepositoryState,
}

impl RepositoryDirectory {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserDirectory for RepositoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<DirectoryRecord>, DirectoryError> {
        Ok(self.repo.find_users_by_email(email).await?)
    }
}
