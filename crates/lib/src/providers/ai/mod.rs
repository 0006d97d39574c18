pub mod gemini;
pub mod local;

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;
use tokio::sync::mpsc;

/// A trait for interacting with an AI provider.
///
/// This trait defines a common interface for issuing prompt completions
/// against different model endpoints (Gemini, local OpenAI-compatible
/// servers), in both one-shot and streamed form.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a complete response from a system and user prompt.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError>;

    /// Streams a completion as a finite sequence of text chunks.
    ///
    /// The default implementation delegates to [`AiProvider::generate`] and
    /// delivers the whole answer as a single chunk, for providers without a
    /// streaming endpoint.
    async fn generate_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CompletionStream, ProviderError> {
        let text = self.generate(system_prompt, user_prompt).await?;
        Ok(CompletionStream::from_text(text))
    }
}

dyn_clone::clone_trait_object!(AiProvider);

/// Buffer size for completion chunk channels.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// A finite, cancellable sequence of completion chunks with a single
/// terminal success or error outcome.
///
/// The producer is a spawned task feeding an mpsc channel. Dropping the
/// stream closes the channel; the producer observes the failed send and
/// stops reading from the provider, which cancels the exchange mid-stream.
pub struct CompletionStream {
    rx: mpsc::Receiver<Result<String, ProviderError>>,
}

impl CompletionStream {
    /// Next chunk of answer text. `None` marks successful completion;
    /// `Some(Err(_))` is terminal.
    pub async fn next_chunk(&mut self) -> Option<Result<String, ProviderError>> {
        self.rx.recv().await
    }

    /// Drains the stream into the full answer text.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut out = String::new();
        while let Some(chunk) = self.next_chunk().await {
            out.push_str(&chunk?);
        }
        Ok(out)
    }

    /// A stream that yields the given text as a single chunk and completes.
    pub fn from_text(text: String) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Ok(text));
        Self { rx }
    }
}

/// Creates the channel pair used by streaming provider implementations.
pub fn completion_channel() -> (
    mpsc::Sender<Result<String, ProviderError>>,
    CompletionStream,
) {
    let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
    (tx, CompletionStream { rx })
}

/// Pops the next non-empty `data:` payload from an SSE byte buffer, or
/// `None` when no complete frame is buffered yet. Carriage returns must be
/// stripped before bytes are appended to the buffer.
pub(crate) fn next_sse_data(buffer: &mut Vec<u8>) -> Option<String> {
    while let Some(sep) = buffer.windows(2).position(|w| w == b"\n\n") {
        let frame: Vec<u8> = buffer.drain(..sep + 2).take(sep).collect();
        let frame = String::from_utf8_lossy(&frame);
        let mut data = String::new();
        for line in frame.lines() {
            if let Some(rest) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.trim_start());
            }
        }
        if !data.is_empty() {
            return Some(data);
        }
    }
    None
}
