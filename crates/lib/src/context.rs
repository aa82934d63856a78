//! Turn context: the single-use object representing one turn.
//!
//! Wraps the turn activity, accumulates outbound activities queued by
//! middleware and application logic, and is revoked by the adapter when
//! the turn finishes. After revocation every operation fails with
//! [`TurnError::Revoked`], so use-after-turn from lingering callbacks
//! fails loudly instead of silently dropping messages.

use crate::activity::{
    apply_conversation_reference, conversation_reference, Activity, ConversationReference,
};
use crate::adapter::BotAdapter;
use crate::error::TurnError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Placeholder result for one delivered or queued activity. The console
/// transport never assigns ids; richer transports can report
/// provider-assigned ones here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

struct TurnState {
    revoked: bool,
    outbound: Vec<Activity>,
}

/// Context for one turn of conversation. Created by the adapter, passed
/// through the middleware chain, revoked when the turn completes.
pub struct TurnContext {
    adapter: Arc<dyn BotAdapter>,
    activity: Activity,
    reference: ConversationReference,
    state: RwLock<TurnState>,
}

impl TurnContext {
    /// Wrap an addressed activity for one turn. The conversation reference
    /// is captured from the activity's addressing fields.
    pub fn new(adapter: Arc<dyn BotAdapter>, activity: Activity) -> Self {
        let reference = conversation_reference(&activity);
        Self {
            adapter,
            activity,
            reference,
            state: RwLock::new(TurnState {
                revoked: false,
                outbound: Vec::new(),
            }),
        }
    }

    async fn ensure_live(&self) -> Result<(), TurnError> {
        if self.state.read().await.revoked {
            Err(TurnError::Revoked)
        } else {
            Ok(())
        }
    }

    /// The activity this turn is processing. On proactive turns its type,
    /// id, and timestamp are absent.
    pub async fn activity(&self) -> Result<Activity, TurnError> {
        self.ensure_live().await?;
        Ok(self.activity.clone())
    }

    /// Addressing for this conversation, reusable for proactive turns.
    pub async fn conversation_reference(&self) -> Result<ConversationReference, TurnError> {
        self.ensure_live().await?;
        Ok(self.reference.clone())
    }

    /// Queue outbound activities for delivery when the turn completes.
    /// Each is addressed from the turn's reference (bot → user) before it
    /// enters the queue. Returns one placeholder result per activity.
    pub async fn queue_outbound(
        &self,
        activities: Vec<Activity>,
    ) -> Result<Vec<DeliveryResult>, TurnError> {
        let mut state = self.state.write().await;
        if state.revoked {
            return Err(TurnError::Revoked);
        }
        let mut results = Vec::with_capacity(activities.len());
        for activity in activities {
            state
                .outbound
                .push(apply_conversation_reference(activity, &self.reference, false));
            results.push(DeliveryResult::default());
        }
        Ok(results)
    }

    /// Queue a single text message reply.
    pub async fn queue_message(
        &self,
        text: impl Into<String>,
    ) -> Result<DeliveryResult, TurnError> {
        let mut results = self.queue_outbound(vec![Activity::message(text)]).await?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Ask the adapter to replace an already-delivered activity. Fails
    /// with `NotSupported` on transports that cannot edit history.
    pub async fn request_update(&self, activity: &Activity) -> Result<(), TurnError> {
        self.ensure_live().await?;
        self.adapter.update_activity(self, activity).await
    }

    /// Ask the adapter to delete an already-delivered activity. Fails
    /// with `NotSupported` on transports that cannot edit history.
    pub async fn request_delete(&self, reference: &ConversationReference) -> Result<(), TurnError> {
        self.ensure_live().await?;
        self.adapter.delete_activity(self, reference).await
    }

    /// Take the queued outbound batch for delivery. Adapter-internal;
    /// called once, before revocation.
    pub(crate) async fn drain_outbound(&self) -> Vec<Activity> {
        let mut state = self.state.write().await;
        std::mem::take(&mut state.outbound)
    }

    /// One-way transition to inert. Every later operation fails with
    /// [`TurnError::Revoked`].
    pub(crate) async fn revoke(&self) {
        self.state.write().await.revoked = true;
    }
}
