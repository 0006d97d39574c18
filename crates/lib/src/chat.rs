//! # Conversation Engine
//!
//! Drives one request/response cycle per conversation: `Idle ->
//! AwaitingResponse -> Idle`. A second send on a conversation with an
//! exchange in flight is rejected with `Busy`; conversations on different
//! targets proceed independently. The assistant's answer is relayed to the
//! caller chunk by chunk as it streams in, and history only ever records
//! fully completed exchanges: on failure, timeout, or cancellation the
//! partial answer is discarded, the user's question is kept so it can be
//! resubmitted, and the conversation returns to idle.

use crate::{
    context::{ContextAssembler, ContextBudget, ContextError},
    errors::ProviderError,
    providers::{
        ai::AiProvider,
        db::{sqlite::SqliteProvider, StorageError},
    },
    registry::{create_provider, ModelRegistry},
    types::{Conversation, Role, TargetRef, Turn},
};
use std::{collections::HashSet, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

/// Default ceiling for acquiring the stream and for each inter-chunk wait.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Buffer size for the caller-facing event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum ChatError {
    /// The conversation already has an exchange in flight. Retry the whole
    /// send after it completes; the engine never queues or interleaves.
    #[error("Conversation {0} already has an exchange in flight")]
    Busy(String),
    #[error("Context assembly failed: {0}")]
    Context(#[from] ContextError),
    #[error("AI capability failed: {0}")]
    Capability(#[from] ProviderError),
    #[error("AI call exceeded the timeout of {0:?}")]
    Timeout(Duration),
    #[error("Exchange was cancelled by the caller")]
    Cancelled,
    #[error("Storage error during the exchange: {0}")]
    Storage(#[from] StorageError),
}

/// Incremental view of one exchange. `Delta` chunks arrive while the model
/// streams; exactly one terminal event follows.
#[derive(Debug)]
pub enum ChatEvent {
    Delta(String),
    /// The exchange completed and this assistant turn was recorded.
    Completed(Turn),
    /// The exchange failed; no assistant turn was recorded.
    Failed(ChatError),
    /// The caller cancelled; no assistant turn was recorded.
    Cancelled,
}

/// The caller's handle on a streamed answer.
#[derive(Debug)]
pub struct AnswerStream {
    rx: mpsc::Receiver<ChatEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl AnswerStream {
    /// Next event, or `None` once a terminal event has been delivered.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }

    /// Requests cancellation. The engine stops relaying chunks, discards the
    /// partial answer, and emits [`ChatEvent::Cancelled`]. Dropping the
    /// stream has the same effect.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Drains the stream to its terminal event and returns the recorded
    /// assistant turn on success.
    pub async fn collect(mut self) -> Result<Turn, ChatError> {
        while let Some(event) = self.next_event().await {
            match event {
                ChatEvent::Delta(_) => {}
                ChatEvent::Completed(turn) => return Ok(turn),
                ChatEvent::Failed(err) => return Err(err),
                ChatEvent::Cancelled => return Err(ChatError::Cancelled),
            }
        }
        Err(ChatError::Capability(ProviderError::StreamTruncated))
    }
}

/// Per-conversation dialogue state and the request/response cycle.
pub struct ChatEngine {
    store: Arc<SqliteProvider>,
    registry: Arc<ModelRegistry>,
    assembler: ContextAssembler,
    in_flight: Arc<Mutex<HashSet<String>>>,
    call_timeout: Duration,
    provider_override: Option<Box<dyn AiProvider>>,
}

impl ChatEngine {
    pub fn new(
        store: Arc<SqliteProvider>,
        registry: Arc<ModelRegistry>,
        budget: ContextBudget,
    ) -> Self {
        let assembler = ContextAssembler::new(Arc::clone(&store), budget);
        Self {
            store,
            registry,
            assembler,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            provider_override: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Pins the engine to one provider instance instead of resolving the
    /// registry default per exchange.
    pub fn with_provider(mut self, provider: Box<dyn AiProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    /// The conversation for a target, created on first use.
    pub async fn open_conversation(
        &self,
        target: &TargetRef,
    ) -> Result<Conversation, StorageError> {
        self.store.open_conversation(target).await
    }

    /// Sends a user message and returns the streamed assistant response.
    ///
    /// Returns [`ChatError::Busy`] without touching history when the
    /// conversation already has an exchange in flight.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<AnswerStream, ChatError> {
        let conversation = self.store.get_conversation(conversation_id).await?;

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(conversation.id.clone()) {
                return Err(ChatError::Busy(conversation.id));
            }
        }
        debug!("Conversation {} -> awaiting response", conversation.id);

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let exchange = Exchange {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            assembler: self.assembler.clone(),
            call_timeout: self.call_timeout,
            provider_override: self.provider_override.clone(),
            conversation,
            user_text: user_text.to_string(),
        };
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let conversation_id = exchange.conversation.id.clone();
            let terminal = match exchange.run(cancel_rx, &events_tx).await {
                Outcome::Completed(turn) => ChatEvent::Completed(turn),
                Outcome::Cancelled => ChatEvent::Cancelled,
                Outcome::Failed(err) => {
                    warn!("Exchange on conversation {conversation_id} failed: {err}");
                    ChatEvent::Failed(err)
                }
            };
            // Back to idle before the terminal event is visible, so a caller
            // reacting to it can immediately send the next message.
            in_flight.lock().await.remove(&conversation_id);
            debug!("Conversation {conversation_id} -> idle");
            let _ = events_tx.send(terminal).await;
        });

        Ok(AnswerStream {
            rx: events_rx,
            cancel: Some(cancel_tx),
        })
    }
}

enum Outcome {
    Completed(Turn),
    Cancelled,
    Failed(ChatError),
}

/// Everything one spawned exchange task needs.
struct Exchange {
    store: Arc<SqliteProvider>,
    registry: Arc<ModelRegistry>,
    assembler: ContextAssembler,
    call_timeout: Duration,
    provider_override: Option<Box<dyn AiProvider>>,
    conversation: Conversation,
    user_text: String,
}

impl Exchange {
    async fn run(
        &self,
        mut cancel_rx: oneshot::Receiver<()>,
        events: &mpsc::Sender<ChatEvent>,
    ) -> Outcome {
        // History before this exchange feeds the assembler; the question is
        // recorded first so it survives a failed exchange and can be
        // resubmitted.
        let history = match self.store.list_turns(&self.conversation.id).await {
            Ok(turns) => turns,
            Err(e) => return Outcome::Failed(e.into()),
        };
        if let Err(e) = self.record_user_turn().await {
            return Outcome::Failed(e.into());
        }

        let payload = match self
            .assembler
            .assemble(&self.conversation.target, &history, &self.user_text)
            .await
        {
            Ok(payload) => payload,
            Err(e) => return Outcome::Failed(e.into()),
        };

        let provider = match self.resolve_provider().await {
            Ok(provider) => provider,
            Err(e) => return Outcome::Failed(e),
        };

        let user_prompt = payload.user_prompt();
        let stream_result = tokio::time::timeout(
            self.call_timeout,
            provider.generate_stream(&payload.system_prompt, &user_prompt),
        )
        .await;
        let mut stream = match stream_result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Outcome::Failed(e.into()),
            Err(_) => return Outcome::Failed(ChatError::Timeout(self.call_timeout)),
        };

        let mut answer = String::new();
        loop {
            tokio::select! {
                // Fires on an explicit cancel and when the caller drops the
                // stream; either way the partial answer is discarded.
                _ = &mut cancel_rx => return Outcome::Cancelled,
                chunk = tokio::time::timeout(self.call_timeout, stream.next_chunk()) => {
                    match chunk {
                        Err(_) => return Outcome::Failed(ChatError::Timeout(self.call_timeout)),
                        Ok(None) => break,
                        Ok(Some(Err(e))) => return Outcome::Failed(e.into()),
                        Ok(Some(Ok(text))) => {
                            answer.push_str(&text);
                            if events.send(ChatEvent::Delta(text)).await.is_err() {
                                return Outcome::Cancelled;
                            }
                        }
                    }
                }
            }
        }

        match self
            .store
            .append_turn(&self.conversation.id, Role::Assistant, &answer)
            .await
        {
            Ok(turn) => {
                info!(
                    "Recorded exchange on conversation {} ({} answer chars)",
                    self.conversation.id,
                    answer.chars().count()
                );
                Outcome::Completed(turn)
            }
            Err(e) => Outcome::Failed(e.into()),
        }
    }

    /// Appends the user turn, coalescing with a preceding user turn (the
    /// leftover of a failed exchange) so the stored sequence keeps
    /// alternating instead of corrupting order.
    async fn record_user_turn(&self) -> Result<(), StorageError> {
        match self.store.last_turn(&self.conversation.id).await? {
            Some(last) if last.role == Role::User => {
                let merged = format!("{}\n\n{}", last.content, self.user_text);
                self.store.update_turn_content(last.id, &merged).await
            }
            _ => self
                .store
                .append_turn(&self.conversation.id, Role::User, &self.user_text)
                .await
                .map(|_| ()),
        }
    }

    async fn resolve_provider(&self) -> Result<Box<dyn AiProvider>, ChatError> {
        if let Some(provider) = &self.provider_override {
            return Ok(provider.clone());
        }
        let config = self
            .registry
            .default_config()
            .await
            .ok_or(ChatError::Capability(ProviderError::MissingModelConfig))?;
        Ok(create_provider(&config)?)
    }
}
