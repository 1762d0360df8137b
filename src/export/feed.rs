use super::{Result, Store, Summary, Target};
use crate::facebook::Client;
use futures::TryStreamExt;

/// Write every feed post that isn't already in the store.
pub async fn export(client: &Client, store: &mut Store) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut posts = client.feed();

    while let Some(post) = posts.try_next().await? {
        if store.contains(Target::Feed, &post.id) {
            log::debug!("Skipping known post {}", post.id);
            summary.skipped += 1;
        } else {
            store.add(Target::Feed, &post.id, &post.created_time, &post)?;
            summary.written += 1;
        }
    }

    log::info!("Feed export finished: {}", summary);

    Ok(summary)
}
