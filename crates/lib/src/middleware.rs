//! Middleware chain: ordered interceptors wrapping the application logic
//! for one turn.
//!
//! Units run their "before" code in registration order and their "after"
//! code in reverse, call-stack style. A unit that returns without calling
//! `next.run` vetoes the rest of the chain and the logic. Errors from any
//! unit or from the logic propagate up through every enclosing unit to
//! the adapter; they are never swallowed.

use crate::context::TurnContext;
use crate::error::TurnError;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Application logic callback: invoked once per turn, innermost in the
/// chain, after all middleware "before" segments have run.
pub type TurnLogic =
    Arc<dyn Fn(Arc<TurnContext>) -> BoxFuture<'static, Result<(), TurnError>> + Send + Sync>;

/// Build a [`TurnLogic`] from an async closure.
pub fn turn_logic<F, Fut>(f: F) -> TurnLogic
where
    F: Fn(Arc<TurnContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TurnError>> + Send + 'static,
{
    Arc::new(move |context| -> BoxFuture<'static, Result<(), TurnError>> { Box::pin(f(context)) })
}

/// One interceptor in the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run this unit. Call `next.run(context)` to continue into the rest
    /// of the chain; returning without doing so short-circuits the turn.
    async fn on_turn(&self, context: Arc<TurnContext>, next: Next<'_>) -> Result<(), TurnError>;
}

/// Continuation into the remainder of the chain and, finally, the logic.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    logic: &'a TurnLogic,
}

impl Next<'_> {
    /// Invoke the next unit, or the application logic once the chain is
    /// exhausted.
    pub async fn run(self, context: Arc<TurnContext>) -> Result<(), TurnError> {
        match self.stack.split_first() {
            Some((head, rest)) => {
                head.on_turn(
                    context,
                    Next {
                        stack: rest,
                        logic: self.logic,
                    },
                )
                .await
            }
            None => (self.logic)(context).await,
        }
    }
}

/// Ordered set of middleware. Registration order is execution order; the
/// last-registered unit is innermost.
#[derive(Default)]
pub struct MiddlewareSet {
    stack: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareSet {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Append a unit to the end of the chain.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.stack.push(middleware);
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run the chain around `logic` for one turn.
    pub async fn run(&self, context: Arc<TurnContext>, logic: &TurnLogic) -> Result<(), TurnError> {
        Next {
            stack: &self.stack,
            logic,
        }
        .run(context)
        .await
    }
}
