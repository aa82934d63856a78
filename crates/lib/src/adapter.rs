//! Adapter contract: the transport-facing side of a turn.
//!
//! Concrete adapters (console here; HTTP elsewhere) implement the same
//! contract without sharing a base type. Update/delete default to a
//! capability-gap error, mirroring transports that cannot edit history.

use crate::activity::{Activity, ConversationReference};
use crate::context::{DeliveryResult, TurnContext};
use crate::error::TurnError;
use async_trait::async_trait;

/// Delivery and mutation operations an adapter offers to a turn.
#[async_trait]
pub trait BotAdapter: Send + Sync {
    /// Deliver a batch of outbound activities, strictly in batch order.
    /// Returns one result per activity.
    async fn send_outbound(
        &self,
        context: &TurnContext,
        activities: &[Activity],
    ) -> Result<Vec<DeliveryResult>, TurnError>;

    /// Replace an already-delivered activity. Default: not supported.
    async fn update_activity(
        &self,
        _context: &TurnContext,
        _activity: &Activity,
    ) -> Result<(), TurnError> {
        Err(TurnError::NotSupported("update_activity"))
    }

    /// Delete an already-delivered activity addressed by `reference`.
    /// Default: not supported.
    async fn delete_activity(
        &self,
        _context: &TurnContext,
        _reference: &ConversationReference,
    ) -> Result<(), TurnError> {
        Err(TurnError::NotSupported("delete_activity"))
    }
}
