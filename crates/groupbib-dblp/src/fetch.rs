//! Per-person feed fetching
//!
//! One GET per invocation, no retries, no caching. A non-200 response
//! is a hard failure for that person's import.

use thiserror::Error;

use crate::http::{HttpClient, HttpError};

const DBLP_BASE_URL: &str = "https://dblp.uni-trier.de/pid";

#[derive(Error, Debug)]
pub enum FetchError {
    /// DBLP answered with something other than 200.
    #[error("DBLP returned status {status} for '{pid}'")]
    Status { pid: String, status: u16 },

    #[error(transparent)]
    Http(#[from] HttpError),
}

pub struct DblpClient {
    client: HttpClient,
    base_url: String,
}

impl DblpClient {
    pub fn new() -> Self {
        Self::with_base_url(DBLP_BASE_URL)
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: HttpClient::new("groupbib/0.1"),
            base_url: base_url.to_string(),
        }
    }

    /// Fetch `{base_url}/{pid}.xml` and return the raw feed document.
    pub async fn fetch_person(&self, pid: &str) -> Result<String, FetchError> {
        let url = self.person_url(pid);
        let response = self.client.get(&url).await?;

        if response.status != 200 {
            return Err(FetchError::Status {
                pid: pid.to_string(),
                status: response.status,
            });
        }

        Ok(response.body)
    }

    fn person_url(&self, pid: &str) -> String {
        format!("{}/{}.xml", self.base_url, pid)
    }
}

impl Default for DblpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_url() {
        let client = DblpClient::new();
        assert_eq!(
            client.person_url("92/7397"),
            "https://dblp.uni-trier.de/pid/92/7397.xml"
        );
    }

    #[test]
    fn test_status_error_names_person() {
        let err = FetchError::Status {
            pid: "92/7397".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "DBLP returned status 404 for '92/7397'");
    }
}
