use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::llm::{BackendError, ReplyStream, SuggestionTask};

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
    Suggestions(Vec<String>),
}

/// An opened reply stream tagged with the id of the turn it belongs to.
pub struct ReplyRequest {
    pub stream_id: u64,
    pub stream: ReplyStream,
    pub cancel_token: CancellationToken,
}

impl std::fmt::Debug for ReplyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyRequest")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

/// A pending follow-up suggestion fetch for the turn `stream_id`.
pub struct SuggestionRequest {
    pub stream_id: u64,
    pub task: SuggestionTask,
}

impl std::fmt::Debug for SuggestionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionRequest")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    idle_timeout: Option<Duration>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                idle_timeout: None,
            },
            rx,
        )
    }

    /// Abort transfers that stay silent for longer than `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Forward every fragment of the reply to the channel. A failure is sent
    /// as `Error` followed by `End`. Nothing is sent after the token fires.
    pub fn spawn_stream(&self, request: ReplyRequest) {
        let tx = self.tx.clone();
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            let ReplyRequest {
                stream_id,
                mut stream,
                cancel_token,
            } = request;

            tokio::select! {
                _ = async {
                    loop {
                        let next = match idle_timeout {
                            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                                Ok(item) => item,
                                Err(_) => Some(Err(BackendError::Timeout)),
                            },
                            None => stream.next().await,
                        };

                        if cancel_token.is_cancelled() {
                            return;
                        }

                        match next {
                            Some(Ok(chunk)) => {
                                let _ = tx.send((StreamMessage::Chunk(chunk), stream_id));
                            }
                            Some(Err(err)) => {
                                let _ = tx.send((StreamMessage::Error(err.to_string()), stream_id));
                                let _ = tx.send((StreamMessage::End, stream_id));
                                return;
                            }
                            None => {
                                let _ = tx.send((StreamMessage::End, stream_id));
                                return;
                            }
                        }
                    }
                } => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "reply transfer cancelled");
                }
            }
        });
    }

    pub fn spawn_suggestions(&self, request: SuggestionRequest) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let SuggestionRequest { stream_id, task } = request;
            let suggestions = task.await;
            let _ = tx.send((StreamMessage::Suggestions(suggestions), stream_id));
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}
