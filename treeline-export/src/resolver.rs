//! Picks the pack to export from the account's pack list.

use serde::Serialize;

use treeline_core::{Credentials, PackId, PackSummary};
use treeline_remote::TreelineApi;

use crate::error::ExportError;

pub const SELECT_MESSAGE: &str = "Which machinepack would you like to export?";

/// One entry offered by the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: PackId,
    pub label: String,
}

impl From<&PackSummary> for Choice {
    fn from(summary: &PackSummary) -> Self {
        Self {
            id: summary.id.clone(),
            label: summary.display_name.clone(),
        }
    }
}

/// Asks the user to pick one of `choices`.
pub trait PackSelector: Send + Sync {
    fn select(&self, choices: &[Choice], message: &str) -> Result<PackId, ExportError>;
}

/// List the account's packs and resolve the one to export.
///
/// The list call always happens first so bad credentials surface before any
/// other outcome.
pub fn resolve(
    api: &dyn TreelineApi,
    selector: &dyn PackSelector,
    credentials: &Credentials,
    identity: Option<&PackId>,
) -> Result<PackSummary, ExportError> {
    let packs = api.list_packs(credentials)?;
    tracing::debug!("account {} has {} pack(s)", credentials.username, packs.len());

    if let Some(identity) = identity {
        tracing::debug!("explicit identity {identity} requested");
        return Err(ExportError::NotImplemented);
    }
    if packs.is_empty() {
        return Err(ExportError::NoPacks);
    }

    let choices: Vec<Choice> = packs.iter().map(Choice::from).collect();
    let selected = selector.select(&choices, SELECT_MESSAGE)?;
    packs
        .into_iter()
        .find(|pack| pack.id == selected)
        .ok_or(ExportError::UnknownSelection { id: selected })
}
