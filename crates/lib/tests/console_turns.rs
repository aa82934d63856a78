//! End-to-end turn tests: lines in through the console adapter, rendered
//! lines out through a collecting sink. Covers the echo-bot scenarios,
//! id assignment, ordering, short-circuiting, revocation, and proactive
//! turns. No terminal required.

use async_trait::async_trait;
use lib::activity::{Activity, ActivityType, Attachment};
use lib::console::{console_reference, ConsoleAdapter, ListenHandle, OutputSink};
use lib::context::TurnContext;
use lib::error::TurnError;
use lib::middleware::{turn_logic, Middleware, Next, TurnLogic};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;

struct CollectSink {
    lines: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl CollectSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        })
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl OutputSink for CollectSink {
    fn print(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn print_error(&self, line: &str) {
        self.errors.lock().unwrap().push(line.to_string());
    }
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {}", what);
}

/// The console echo bot's logic, as the CLI wires it.
fn echo_logic(handle_slot: Arc<OnceLock<ListenHandle>>) -> TurnLogic {
    turn_logic(move |context| {
        let handle_slot = handle_slot.clone();
        async move {
            let activity = context.activity().await?;
            if activity.activity_type != Some(ActivityType::Message) {
                return Ok(());
            }
            let text = activity.text.unwrap_or_default();
            if text.to_lowercase() == "sair" {
                context.queue_message("Tchauzinho!").await?;
                if let Some(handle) = handle_slot.get() {
                    handle.stop();
                }
            } else {
                context
                    .queue_message(format!("Você disse: \"{}\"", text))
                    .await?;
            }
            Ok(())
        }
    })
}

#[tokio::test]
async fn inbound_ids_start_at_zero_with_no_gaps() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));
    let ids: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));

    let logic = {
        let ids = ids.clone();
        turn_logic(move |context| {
            let ids = ids.clone();
            async move {
                let activity = context.activity().await?;
                if let Some(id) = activity.id {
                    ids.lock().unwrap().push(id);
                }
                Ok(())
            }
        })
    };

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    for line in ["one", "two", "three", "four"] {
        tx.send(line.to_string()).await.expect("send line");
    }

    wait_until("all four turns", || ids.lock().unwrap().len() == 4).await;
    let mut seen = ids.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn outbound_batch_delivers_in_enqueue_order() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));

    let logic = turn_logic(|context| async move {
        context
            .queue_outbound(vec![
                Activity::message("A"),
                Activity::message("B"),
                Activity::message("C"),
            ])
            .await?;
        Ok(())
    });

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("go".to_string()).await.expect("send line");

    wait_until("three deliveries", || sink.lines().len() == 3).await;
    assert_eq!(sink.lines(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn echo_scenario_repeats_the_input() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));
    let slot = Arc::new(OnceLock::new());

    let (tx, rx) = mpsc::channel(8);
    let (handle, _task) = adapter.listen(rx, echo_logic(slot.clone()));
    let _ = slot.set(handle);

    tx.send("hello".to_string()).await.expect("send line");
    wait_until("echo delivery", || !sink.lines().is_empty()).await;
    assert_eq!(sink.lines(), vec!["Você disse: \"hello\""]);
}

#[tokio::test]
async fn sair_scenario_says_goodbye_and_stops_the_loop() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));
    let slot = Arc::new(OnceLock::new());

    let (tx, rx) = mpsc::channel(8);
    let (handle, task) = adapter.listen(rx, echo_logic(slot.clone()));
    let _ = slot.set(handle.clone());

    tx.send("sair".to_string()).await.expect("send line");
    wait_until("goodbye delivery", || !sink.lines().is_empty()).await;
    assert_eq!(sink.lines(), vec!["Tchauzinho!"]);
    assert!(!handle.is_running());

    // The line loop terminates; later lines have nowhere to go.
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("loop terminates")
        .expect("loop task");
    wait_until("receiver dropped", || tx.is_closed()).await;
}

#[tokio::test]
async fn attachments_render_with_count_marker_after_text() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));

    let logic = turn_logic(|context| async move {
        let activity = Activity {
            activity_type: Some(ActivityType::Message),
            attachments: vec![Attachment::default(), Attachment::default()],
            ..Activity::default()
        };
        context.queue_outbound(vec![activity]).await?;
        Ok(())
    });

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("go".to_string()).await.expect("send line");

    wait_until("delivery", || !sink.lines().is_empty()).await;
    assert_eq!(sink.lines(), vec![" (2 attachments)"]);
}

#[tokio::test]
async fn context_is_inert_after_its_turn() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));
    let captured: Arc<Mutex<Option<Arc<TurnContext>>>> = Arc::new(Mutex::new(None));

    let logic = {
        let captured = captured.clone();
        turn_logic(move |context| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(context.clone());
                context.queue_message("done").await?;
                Ok(())
            }
        })
    };

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("go".to_string()).await.expect("send line");

    wait_until("delivery", || !sink.lines().is_empty()).await;
    let context = captured.lock().unwrap().clone().expect("captured context");

    // Revocation happens right after delivery; wait for the transition,
    // then every operation must fail.
    let mut revoked = false;
    for _ in 0..200 {
        if matches!(context.activity().await, Err(TurnError::Revoked)) {
            revoked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(revoked, "context was never revoked");
    assert!(matches!(
        context.queue_message("late").await,
        Err(TurnError::Revoked)
    ));
    assert!(matches!(
        context.queue_outbound(vec![Activity::message("late")]).await,
        Err(TurnError::Revoked)
    ));
    assert!(matches!(
        context.request_update(&Activity::message("late")).await,
        Err(TurnError::Revoked)
    ));
    assert!(matches!(context.activity().await, Err(TurnError::Revoked)));
}

#[tokio::test]
async fn update_and_delete_fail_not_supported_in_a_live_turn() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));
    let outcomes: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let logic = {
        let outcomes = outcomes.clone();
        turn_logic(move |context| {
            let outcomes = outcomes.clone();
            async move {
                let update = context.request_update(&Activity::message("edit")).await;
                let delete = context
                    .request_delete(&context.conversation_reference().await?)
                    .await;
                let mut outcomes = outcomes.lock().unwrap();
                outcomes.push(format!("{:?}", update));
                outcomes.push(format!("{:?}", delete));
                Ok(())
            }
        })
    };

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("go".to_string()).await.expect("send line");

    wait_until("both outcomes", || outcomes.lock().unwrap().len() == 2).await;
    let outcomes = outcomes.lock().unwrap();
    assert!(outcomes[0].contains("NotSupported"));
    assert!(outcomes[1].contains("NotSupported"));
}

#[tokio::test]
async fn proactive_turn_has_no_type_and_still_delivers() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));

    let logic = turn_logic(|context| async move {
        let activity = context.activity().await?;
        assert!(activity.activity_type.is_none());
        assert!(activity.id.is_none());
        assert!(activity.timestamp.is_none());
        // Type-inspecting logic treats this as "no specific type".
        if activity.activity_type == Some(ActivityType::Message) {
            context.queue_message("unexpected").await?;
        } else {
            context.queue_message("proactive ping").await?;
        }
        Ok(())
    });

    adapter
        .continue_conversation(&console_reference(), logic)
        .await
        .expect("proactive turn");
    assert_eq!(sink.lines(), vec!["proactive ping"]);
}

#[tokio::test]
async fn failing_turn_is_reported_and_does_not_kill_the_loop() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));

    let logic = turn_logic(|context| async move {
        let activity = context.activity().await?;
        let text = activity.text.unwrap_or_default();
        if text == "boom" {
            return Err(TurnError::middleware("boom"));
        }
        context.queue_message(format!("ok: {}", text)).await?;
        Ok(())
    });

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("boom".to_string()).await.expect("send line");
    wait_until("failure report", || !sink.errors().is_empty()).await;
    assert!(sink.errors()[0].contains("boom"));

    // The loop is still alive and dispatches the next turn.
    tx.send("hello".to_string()).await.expect("send line");
    wait_until("next delivery", || !sink.lines().is_empty()).await;
    assert_eq!(sink.lines(), vec!["ok: hello"]);
}

#[tokio::test]
async fn delay_in_one_turn_does_not_block_another() {
    let sink = CollectSink::new();
    let adapter = Arc::new(ConsoleAdapter::with_output(None, sink.clone()));

    let logic = turn_logic(|context| async move {
        let activity = context.activity().await?;
        let text = activity.text.unwrap_or_default();
        if text == "slow" {
            context
                .queue_outbound(vec![Activity::delay(150), Activity::message("slow-done")])
                .await?;
        } else {
            context.queue_message("fast-done").await?;
        }
        Ok(())
    });

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("slow".to_string()).await.expect("send line");
    tx.send("fast".to_string()).await.expect("send line");

    wait_until("both turns", || sink.lines().len() == 2).await;
    assert_eq!(sink.lines(), vec!["fast-done", "slow-done"]);
}

/// Middleware registered on the adapter wraps every turn the chain runs.
struct Bracketing {
    label: &'static str,
}

#[async_trait]
impl Middleware for Bracketing {
    async fn on_turn(&self, context: Arc<TurnContext>, next: Next<'_>) -> Result<(), TurnError> {
        context
            .queue_message(format!("{}-before", self.label))
            .await?;
        let result = next.run(context.clone()).await;
        context.queue_message(format!("{}-after", self.label)).await?;
        result
    }
}

#[tokio::test]
async fn adapter_middleware_wraps_turn_and_delivery_keeps_queue_order() {
    let sink = CollectSink::new();
    let mut adapter = ConsoleAdapter::with_output(None, sink.clone());
    adapter.use_middleware(Arc::new(Bracketing { label: "mw" }));
    let adapter = Arc::new(adapter);

    let logic = turn_logic(|context| async move {
        context.queue_message("logic").await?;
        Ok(())
    });

    let (tx, rx) = mpsc::channel(8);
    let (_handle, _task) = adapter.listen(rx, logic);
    tx.send("go".to_string()).await.expect("send line");

    wait_until("three deliveries", || sink.lines().len() == 3).await;
    assert_eq!(sink.lines(), vec!["mw-before", "logic", "mw-after"]);
}
