//! Streaming bridge: runs an agent on its own thread and streams its
//! observer events to an async consumer.
//!
//! The run gets a dedicated OS thread with a current-thread runtime, so a
//! slow tool or a blocking execution engine never stalls the consumer's
//! runtime. The consumer side polls the shared [`Observer`] and paces what
//! it yields: small batches trickle out one event at a time, bursts are
//! flushed at once. Every run ends with exactly one final-answer event,
//! including runs that fail before or during execution.

use async_trait::async_trait;
use codeloop_config::StreamingSettings;
use codeloop_core::{AgentEvent, ChatMessage, EventKind, Observer, RunId, StopSignal};
use futures::Stream;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::agent::{CodeAgent, RunOptions};
use crate::error::AgentError;

/// Final answer reported when a remote tool server could not be reached.
pub const TOOL_SERVER_UNREACHABLE_MESSAGE: &str =
    "Couldn't connect to the tool server. Please check that it is running and reachable, then try again.";

/// Builds the agent for one streamed run.
///
/// Called on the run thread, so remote tool connections made here belong to
/// that thread's runtime and are dropped with it.
#[async_trait]
pub trait AgentFactory: Send + Sync + 'static {
    async fn build(
        &self,
        observer: Arc<Observer>,
        stop: StopSignal,
    ) -> Result<CodeAgent, AgentError>;
}

/// Everything needed to start a streamed run.
pub struct AgentRunInfo {
    pub query: String,
    /// Earlier turns replayed into memory before the run.
    pub history: Vec<ChatMessage>,
    pub factory: Arc<dyn AgentFactory>,
    pub observer: Arc<Observer>,
    pub stop: StopSignal,
    pub options: RunOptions,
    pub streaming: StreamingSettings,
}

impl AgentRunInfo {
    pub fn new(query: impl Into<String>, factory: Arc<dyn AgentFactory>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
            factory,
            observer: Arc::new(Observer::new()),
            stop: StopSignal::new(),
            options: RunOptions::continuing(),
            streaming: StreamingSettings::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_streaming(mut self, streaming: StreamingSettings) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Start a run on a dedicated thread and stream its events.
///
/// The stream ends once the run thread has finished and every event it
/// recorded has been yielded.
pub fn agent_run(
    info: AgentRunInfo,
) -> Result<impl Stream<Item = AgentEvent> + Send + 'static, AgentError> {
    let run_id = RunId::new();
    let AgentRunInfo {
        query,
        history,
        factory,
        observer,
        stop,
        mut options,
        streaming,
    } = info;
    // A fresh agent only has the history we replay into it.
    options.reset = false;

    let thread_observer = observer.clone();
    let handle = std::thread::Builder::new()
        .name(format!("agent-run-{run_id}"))
        .spawn(move || {
            run_on_thread(query, history, factory, thread_observer, stop, options)
        })
        .map_err(|e| AgentError::Internal(format!("failed to spawn run thread: {e}")))?;

    info!(run_id = %run_id, "Agent run thread started");

    let state = BridgeState {
        run_id,
        observer,
        handle: Some(handle),
        pending: VecDeque::new(),
        pace: None,
        delay_next: None,
        settings: streaming,
        drained: false,
    };

    Ok(futures::stream::unfold(state, |mut state| async move {
        let event = state.next_event().await?;
        Some((event, state))
    }))
}

fn run_on_thread(
    query: String,
    history: Vec<ChatMessage>,
    factory: Arc<dyn AgentFactory>,
    observer: Arc<Observer>,
    stop: StopSignal,
    options: RunOptions,
) {
    let run = || -> Result<(), AgentError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentError::Internal(format!("failed to start run runtime: {e}")))?;
        runtime.block_on(async {
            let mut agent = factory.build(observer.clone(), stop).await?;
            agent.add_history(&history);
            agent.run_with_observer(&query, options).await?;
            Ok::<(), AgentError>(())
        })
    };

    let result = match std::panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result,
        Err(_) => Err(AgentError::Internal("agent run panicked".into())),
    };

    if let Err(e) = result {
        error!(error = %e, "Agent run failed");
        let message = match &e {
            AgentError::ToolServerUnreachable(_) => TOOL_SERVER_UNREACHABLE_MESSAGE.to_string(),
            other => format!("Run Agent Error: {other}"),
        };
        observer.record("", EventKind::FinalAnswer, message);
    }
}

struct BridgeState {
    run_id: RunId,
    observer: Arc<Observer>,
    handle: Option<JoinHandle<()>>,
    pending: VecDeque<AgentEvent>,
    /// Delay between events of the batch being yielded.
    pace: Option<Duration>,
    /// Delay owed before the next event is yielded.
    delay_next: Option<Duration>,
    settings: StreamingSettings,
    drained: bool,
}

impl BridgeState {
    async fn next_event(&mut self) -> Option<AgentEvent> {
        loop {
            if !self.pending.is_empty() {
                if let Some(delay) = self.delay_next.take() {
                    tokio::time::sleep(delay).await;
                }
                let event = self.pending.pop_front()?;
                self.delay_next = self.pace;
                return Some(event);
            }
            if self.drained {
                return None;
            }

            let finished = self.handle.as_ref().is_none_or(|h| h.is_finished());
            if finished {
                if let Some(handle) = self.handle.take()
                    && handle.join().is_err()
                {
                    error!(run_id = %self.run_id, "Agent run thread panicked");
                }
                // Everything the thread recorded is visible after join.
                let batch = self.observer.drain();
                debug!(run_id = %self.run_id, events = batch.len(), "Final drain");
                self.pending.extend(batch);
                self.pace = None;
                self.delay_next = None;
                self.drained = true;
                continue;
            }

            let batch = self.observer.drain();
            if batch.is_empty() {
                tokio::time::sleep(self.settings.poll_interval()).await;
                continue;
            }
            self.pace = (batch.len() < self.settings.burst_threshold)
                .then(|| self.settings.event_interval());
            self.pending.extend(batch);
        }
    }
}
