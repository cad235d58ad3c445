use std::io::Read;
use std::time::Duration;

use crate::{BuildError, Result};

pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2";

/// Source of repository files that are missing from the local repository.
pub trait ArtifactFetcher: Send + Sync + std::fmt::Debug {
    /// Fetches a file by its repository-relative path (`org/x/a/1.0/a-1.0.pom`).
    /// `Ok(None)` means the repository does not have it.
    fn fetch(&self, relative_path: &str) -> Result<Option<Vec<u8>>>;
}

/// Fetches from a Maven 2 layout repository over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    timeout: Option<Duration>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(MAVEN_CENTRAL)
    }
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, relative_path: &str) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/{}", self.base_url, relative_path.trim_start_matches('/'));
        let mut request = ureq::get(&url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(ureq::Error::Status(code, _)) => {
                return Err(BuildError::Http {
                    url,
                    message: format!("server returned status {code}"),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(BuildError::Http {
                    url,
                    message: format!("transport error: {transport}"),
                })
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|err| BuildError::Http {
                url: url.clone(),
                message: err.to_string(),
            })?;
        tracing::debug!(target: "pomkit.fetch", url = %url, bytes = bytes.len(), "downloaded artifact");
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(HttpFetcher::new("https://repo.example/m2/").base_url(), "https://repo.example/m2");
        assert_eq!(HttpFetcher::default().base_url(), MAVEN_CENTRAL);
    }
}
