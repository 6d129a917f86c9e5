//! `ragdesk history`: Show a stored conversation.

use std::path::Path;

use ragdesk_core::{ConversationKey, Role};

use crate::runtime::Runtime;

pub async fn run(
    config: Option<&Path>,
    assistant: &str,
    user: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::load(config).await?;
    let key = ConversationKey::new(user, assistant);
    let messages = rt.pipeline().memory().get_history(&key, limit).await?;

    if messages.is_empty() {
        println!("No conversation for {key}.");
        return Ok(());
    }

    for message in messages {
        let label = match message.role {
            Role::User => "🧑 user",
            Role::Assistant => "🤖 assistant",
            Role::System => "📝 summary",
        };
        println!("[{}] {label}", message.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("{}", message.content);
        println!();
    }
    Ok(())
}
