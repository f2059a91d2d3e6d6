use axum::{
    extract::{Path, State},
    response::Html,
};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;
use crate::viewer::fetch::fetch_all_posts;
use crate::viewer::render::render_bookmarks_page;

/// GET /view/:handle
pub async fn handle_view(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Html<String>, AppError> {
    let profile = state.feed.get_profile(&handle).await.map_err(|e| {
        if e.is_client_error() {
            AppError::NotFound(format!("No account found for handle '{handle}'"))
        } else {
            AppError::Upstream(e)
        }
    })?;

    let saved = state.store.select_by_owner(&profile.did).await?;
    debug!("{} has {} saved posts", profile.handle, saved.len());

    let uris: Vec<String> = saved.into_iter().map(|row| row.uri).collect();
    let posts = fetch_all_posts(state.feed.as_ref(), &uris).await?;

    let page = render_bookmarks_page(&handle, &posts)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render bookmarks page: {e}")))?;
    Ok(Html(page))
}
