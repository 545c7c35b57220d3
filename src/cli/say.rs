//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::chat::{ChatController, TurnOutcome, STALLED_BANNER};

/// Run one turn against the stored conversation, streaming the reply to
/// stdout, then list the follow-up suggestions.
pub async fn run_say(mut chat: ChatController, prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let request = chat
        .send_message(&prompt)
        .ok_or("Usage: vulcan say <prompt>")?;

    let outcome = chat
        .drive_reply_with(request, |chunk| {
            print!("{chunk}");
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    if let TurnOutcome::Failed(detail) = outcome {
        return Err(format!("{STALLED_BANNER}\n{detail}").into());
    }

    println!();
    for (index, pill) in chat.pills().iter().enumerate() {
        println!("  {}. {}", index + 1, pill.label);
    }
    Ok(())
}
