//! The remote service as seen by the CLI, and its HTTP implementation.
//!
//! | Call            | Request                                       |
//! |-----------------|-----------------------------------------------|
//! | `list_packs`    | `GET /api/v1/machinepacks`                    |
//! | `fetch_pack`    | `GET /api/v1/machinepacks/<id>/export`        |
//! | `fetch_project` | `GET /api/v1/<apps or machinepacks>/<id>`     |
//!
//! Requests authenticate with `x-profile` (username) and `x-auth` (secret).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use treeline_core::{Credentials, PackData, PackId, PackSummary, ProjectType};

use crate::error::RemoteError;

const USER_AGENT: &str = concat!("treeline-cli/", env!("CARGO_PKG_VERSION"));

/// A remote app or machinepack, as returned by `fetch_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProject {
    pub id: String,
    pub identity: String,
    pub display_name: String,
}

pub trait TreelineApi: Send + Sync {
    /// Packs visible to the account.
    fn list_packs(&self, credentials: &Credentials) -> Result<Vec<PackSummary>, RemoteError>;

    /// The export set for `id`: the pack itself plus every dependency.
    fn fetch_pack(&self, secret: &str, id: &PackId) -> Result<Vec<PackData>, RemoteError>;

    /// Look up an app or machinepack by id.
    fn fetch_project(
        &self,
        credentials: &Credentials,
        project_type: ProjectType,
        id: &str,
    ) -> Result<RemoteProject, RemoteError>;
}

/// [`TreelineApi`] over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base: String,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .timeout_write(Duration::from_secs(30))
            .build();
        Self {
            base: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        username: Option<&str>,
        secret: &str,
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base, path.trim_start_matches('/'));
        tracing::debug!("GET {url}");

        let mut request = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
            .set("x-auth", secret);
        if let Some(username) = username {
            request = request.set("x-profile", username);
        }

        let resp = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(RemoteError::Status { url, status, body });
            }
            Err(err) => {
                return Err(RemoteError::Transport {
                    url,
                    message: err.to_string(),
                })
            }
        };

        resp.into_json::<T>()
            .map_err(|source| RemoteError::Decode { url, source })
    }
}

impl TreelineApi for HttpApi {
    fn list_packs(&self, credentials: &Credentials) -> Result<Vec<PackSummary>, RemoteError> {
        self.get_json(
            "api/v1/machinepacks",
            Some(&credentials.username),
            &credentials.secret,
        )
    }

    fn fetch_pack(&self, secret: &str, id: &PackId) -> Result<Vec<PackData>, RemoteError> {
        let id = urlencoding::encode(&id.0);
        self.get_json(&format!("api/v1/machinepacks/{id}/export"), None, secret)
    }

    fn fetch_project(
        &self,
        credentials: &Credentials,
        project_type: ProjectType,
        id: &str,
    ) -> Result<RemoteProject, RemoteError> {
        self.get_json(
            &format!(
                "api/v1/{}/{}",
                project_type.api_collection(),
                urlencoding::encode(id)
            ),
            Some(&credentials.username),
            &credentials.secret,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let api = HttpApi::new("http://localhost:1337///");
        assert_eq!(api.base_url(), "http://localhost:1337");
    }

    #[test]
    fn remote_project_uses_camel_case() {
        let project: RemoteProject = serde_json::from_str(
            r#"{"id":"42","identity":"my-app","displayName":"My App","owner":"x"}"#,
        )
        .unwrap();
        assert_eq!(project.display_name, "My App");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Port 1 on loopback is never listening in CI.
        let api = HttpApi::new("http://127.0.0.1:1");
        let creds = Credentials {
            username: "u".into(),
            secret: "s".into(),
        };
        let err = api.list_packs(&creds).unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }), "got {err:?}");
    }
}
