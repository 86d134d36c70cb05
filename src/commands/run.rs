use anyhow::Result;

use super::{check, download, AppState};
use crate::detect::Selection;

/// Check, then download the change set directly without a file round trip.
pub async fn run(state: &AppState, selection: &Selection) -> Result<()> {
    let summary = check::check(state, selection).await?;
    download::download(state, Some(summary.change_set)).await?;
    Ok(())
}
