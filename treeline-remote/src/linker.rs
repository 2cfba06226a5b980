//! [`ProjectLinker`] backed by the remote API.

use std::sync::Arc;

use treeline_core::{
    fsx, keychain, layout, LinkError, LinkMetadata, LinkRequest, ProjectLinker,
};

use crate::api::{HttpApi, TreelineApi};

/// Confirms the project exists remotely, then rewrites `treeline.json` in the
/// current schema.
#[derive(Clone)]
pub struct HttpLinker {
    api: Option<Arc<dyn TreelineApi>>,
}

impl HttpLinker {
    /// Build an [`HttpApi`] per request from the request's base URL.
    pub fn new() -> Self {
        Self { api: None }
    }

    /// Use a fixed API client regardless of the request's base URL.
    pub fn with_api(api: Arc<dyn TreelineApi>) -> Self {
        Self { api: Some(api) }
    }
}

impl Default for HttpLinker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectLinker for HttpLinker {
    fn establish_link(&self, request: &LinkRequest) -> Result<(), LinkError> {
        let credentials =
            keychain::read_at(&request.credentials_path)?.ok_or_else(|| LinkError::NotLoggedIn {
                path: request.credentials_path.clone(),
            })?;

        let api: Arc<dyn TreelineApi> = match &self.api {
            Some(api) => Arc::clone(api),
            None => Arc::new(HttpApi::new(request.api_base_url.as_str())),
        };
        let project = api
            .fetch_project(&credentials, request.project_type, &request.id)
            .map_err(|err| LinkError::Remote(err.to_string()))?;

        let meta = LinkMetadata {
            id: project.id,
            project_type: request.project_type,
            identity: project.identity,
            display_name: project.display_name,
        };
        let path = layout::link_path(&request.dir);
        fsx::write_json(&path, &meta, true)?;
        tracing::info!("wrote link metadata: {}", path.display());
        Ok(())
    }
}
