//! Console adapter: drives turns from lines of input and prints outbound
//! activities one line each. The reference transport for the pipeline.
//!
//! Each input line becomes a `message` activity with a monotonic id, gets
//! wrapped in a revocable [`TurnContext`], is routed through the
//! middleware chain and the host's logic, and then the queued outbound
//! activities are delivered in order. A failing turn is reported to the
//! error sink; it never terminates the line loop.

use crate::activity::{
    apply_conversation_reference, Activity, ActivityType, ChannelAccount, ConversationAccount,
    ConversationReference,
};
use crate::adapter::BotAdapter;
use crate::context::{DeliveryResult, TurnContext};
use crate::error::TurnError;
use crate::middleware::{Middleware, MiddlewareSet, TurnLogic};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Where delivered lines go. Stdout in the binary; tests inject a collector.
pub trait OutputSink: Send + Sync {
    /// Print one delivered line.
    fn print(&self, line: &str);
    /// Print one error line.
    fn print_error(&self, line: &str);
}

/// Default sink: stdout for deliveries, stderr for errors.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print(&self, line: &str) {
        println!("{}", line);
    }

    fn print_error(&self, line: &str) {
        eprintln!("{}", line);
    }
}

/// Default addressing for the console transport.
pub fn console_reference() -> ConversationReference {
    ConversationReference {
        channel_id: "console".to_string(),
        user: ChannelAccount {
            id: "user".to_string(),
            name: "User1".to_string(),
        },
        bot: ChannelAccount {
            id: "bot".to_string(),
            name: "Bot".to_string(),
        },
        conversation: ConversationAccount {
            id: "convo1".to_string(),
            name: String::new(),
            is_group: false,
        },
        service_url: String::new(),
    }
}

/// Cancellation handle returned by [`ConsoleAdapter::listen`]. Stopping
/// rejects new input lines; turns already dispatched run to completion.
#[derive(Clone)]
pub struct ListenHandle {
    running: Arc<AtomicBool>,
    stopped: Arc<Notify>,
}

impl ListenHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(Notify::new()),
        }
    }

    /// Stop accepting new input lines. In-flight turns are not aborted.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stopped.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Adapter that reads turns from input lines and writes replies as lines.
pub struct ConsoleAdapter {
    reference: ConversationReference,
    middleware: MiddlewareSet,
    next_id: AtomicU64,
    output: Arc<dyn OutputSink>,
}

impl ConsoleAdapter {
    /// New adapter printing to stdout. `reference` overrides the default
    /// console addressing when given.
    pub fn new(reference: Option<ConversationReference>) -> Self {
        Self::with_output(reference, Arc::new(StdoutSink))
    }

    /// New adapter with a custom output sink (used by tests).
    pub fn with_output(
        reference: Option<ConversationReference>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            reference: reference.unwrap_or_else(console_reference),
            middleware: MiddlewareSet::new(),
            next_id: AtomicU64::new(0),
            output,
        }
    }

    /// Append middleware to the chain. Registration order is execution
    /// order; register everything before calling `listen`.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Start dispatching turns for lines arriving on `lines`. Every line
    /// runs as its own spawned turn, so a slow turn (e.g. one delivering a
    /// `delay` activity) never blocks later lines. Returns the cancel
    /// handle and the loop task to await on shutdown.
    pub fn listen(
        self: &Arc<Self>,
        mut lines: mpsc::Receiver<String>,
        logic: TurnLogic,
    ) -> (ListenHandle, JoinHandle<()>) {
        let handle = ListenHandle::new();
        let loop_handle = handle.clone();
        let adapter = self.clone();
        let task = tokio::spawn(async move {
            log::info!("console adapter: listening for input lines");
            loop {
                let line = tokio::select! {
                    _ = loop_handle.stopped.notified() => None,
                    line = lines.recv() => line,
                };
                let Some(line) = line else { break };
                if !loop_handle.is_running() {
                    break;
                }
                let activity = apply_conversation_reference(
                    Activity {
                        activity_type: Some(ActivityType::Message),
                        id: Some(adapter.next_id.fetch_add(1, Ordering::SeqCst)),
                        timestamp: Some(Utc::now()),
                        text: Some(line),
                        ..Activity::default()
                    },
                    &adapter.reference,
                    true,
                );
                let adapter = adapter.clone();
                let logic = logic.clone();
                tokio::spawn(async move {
                    if let Err(e) = adapter.run_turn(activity, &logic).await {
                        log::error!("turn failed: {}", e);
                        adapter.output.print_error(&format!("turn failed: {}", e));
                    }
                });
            }
            log::info!("console adapter: line loop stopped");
        });
        (handle, task)
    }

    /// Pump stdin lines into a channel and listen on it.
    pub fn listen_stdin(self: &Arc<Self>, logic: TurnLogic) -> (ListenHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        self.listen(rx, logic)
    }

    /// Host-initiated turn addressed by a stored reference. No inbound
    /// event exists, so the turn activity has no type, id, or timestamp —
    /// logic must not assume a message type here. Failures are reported
    /// and returned; they never panic the host.
    pub async fn continue_conversation(
        self: &Arc<Self>,
        reference: &ConversationReference,
        logic: TurnLogic,
    ) -> Result<(), TurnError> {
        let activity = apply_conversation_reference(Activity::default(), reference, true);
        let result = self.run_turn(activity, &logic).await;
        if let Err(ref e) = result {
            log::error!("proactive turn failed: {}", e);
            self.output
                .print_error(&format!("proactive turn failed: {}", e));
        }
        result
    }

    /// One full turn: context, middleware chain, delivery, revocation.
    /// The queued batch is delivered only when the chain resolves; the
    /// context is revoked either way.
    async fn run_turn(
        self: &Arc<Self>,
        activity: Activity,
        logic: &TurnLogic,
    ) -> Result<(), TurnError> {
        let context = Arc::new(TurnContext::new(
            self.clone() as Arc<dyn BotAdapter>,
            activity,
        ));
        let result = match self.middleware.run(context.clone(), logic).await {
            Ok(()) => {
                let queued = context.drain_outbound().await;
                self.send_outbound(&context, &queued).await.map(|_| ())
            }
            Err(e) => Err(e),
        };
        context.revoke().await;
        result
    }
}

#[async_trait]
impl BotAdapter for ConsoleAdapter {
    async fn send_outbound(
        &self,
        _context: &TurnContext,
        activities: &[Activity],
    ) -> Result<Vec<DeliveryResult>, TurnError> {
        let mut results = Vec::with_capacity(activities.len());
        for activity in activities {
            match activity.activity_type {
                Some(ActivityType::Delay) => {
                    let ms = activity.value.as_ref().and_then(|v| v.as_u64()).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                Some(ActivityType::Message) => {
                    let text = activity.text.as_deref().unwrap_or_default();
                    match activity.attachments.len() {
                        0 => self.output.print(text),
                        1 => self.output.print(&format!("{} (1 attachment)", text)),
                        n => self.output.print(&format!("{} ({} attachments)", text, n)),
                    }
                }
                Some(ref other) => self.output.print(&format!("[{}]", other)),
                None => self.output.print("[unknown]"),
            }
            results.push(DeliveryResult::default());
        }
        Ok(results)
    }
}
