//! Echo bot logic: repeat whatever the user says; "sair" says goodbye and
//! stops the listen loop.

use lib::activity::ActivityType;
use lib::console::ListenHandle;
use lib::context::TurnContext;
use lib::error::TurnError;
use std::sync::OnceLock;

/// The console echo bot. Holds the listen handle so the "sair" command
/// can stop accepting input.
pub struct EchoBot {
    handle: OnceLock<ListenHandle>,
}

impl EchoBot {
    pub fn new() -> Self {
        Self {
            handle: OnceLock::new(),
        }
    }

    /// Attach the listen handle after `listen` returns it.
    pub fn bind_handle(&self, handle: ListenHandle) {
        let _ = self.handle.set(handle);
    }

    /// One turn of bot logic. Activities without a message type (e.g.
    /// proactive turns) are ignored without error.
    pub async fn on_turn(&self, context: &TurnContext) -> Result<(), TurnError> {
        let activity = context.activity().await?;
        if activity.activity_type != Some(ActivityType::Message) {
            return Ok(());
        }
        let Some(text) = activity.text else {
            return Ok(());
        };
        if text.to_lowercase() == "sair" {
            context.queue_message("Tchauzinho!").await?;
            if let Some(handle) = self.handle.get() {
                handle.stop();
            }
        } else {
            context
                .queue_message(format!("Você disse: \"{}\"", text))
                .await?;
        }
        Ok(())
    }
}

impl Default for EchoBot {
    fn default() -> Self {
        Self::new()
    }
}
