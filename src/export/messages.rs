use super::{Result, Store, Summary, Target};
use crate::facebook::{
    model::{Conversation, Message},
    Client,
};
use futures::TryStreamExt;
use serde_derive::Serialize;

/// The file written for each conversation.
#[derive(Serialize)]
struct ConversationExport<'a> {
    #[serde(flatten)]
    conversation: &'a Conversation,
    messages: Vec<Message>,
}

/// Write every conversation that changed since it was last stored.
///
/// A conversation's `updated_time` moves whenever a message is added, so an
/// unchanged timestamp means there's nothing new to fetch.
pub async fn export(client: &Client, store: &mut Store) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut conversations = client.conversations();

    while let Some(conversation) = conversations.try_next().await? {
        let stored = store.timestamp(Target::Messages, &conversation.id);

        if stored == Some(&conversation.updated_time) {
            log::debug!("Skipping unchanged conversation {}", conversation.id);
            summary.skipped += 1;
            continue;
        }

        let messages = client
            .messages(&conversation.id)
            .try_collect::<Vec<_>>()
            .await?;

        log::info!(
            "Retrieved {} messages for conversation {}",
            messages.len(),
            conversation.id
        );

        store.add(
            Target::Messages,
            &conversation.id,
            &conversation.updated_time,
            &ConversationExport {
                conversation: &conversation,
                messages,
            },
        )?;
        summary.written += 1;
    }

    log::info!("Message export finished: {}", summary);

    Ok(summary)
}
