//! Session Management
//!
//! Per-thread conversation state and the in-memory checkpointer that keeps
//! one state per thread id for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};

/// Conversation thread identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image attached to a request, waiting for the vision model
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub const DEFAULT_MIME: &'static str = "image/jpeg";

    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Decode base64 text, with or without a `data:<mime>;base64,` prefix
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let (mime, data) = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| AgentError::Other("image data URL has no payload".into()))?;
                let mime = header.strip_suffix(";base64").unwrap_or(header);
                (if mime.is_empty() { Self::DEFAULT_MIME } else { mime }, data)
            }
            None => (Self::DEFAULT_MIME, encoded),
        };

        let bytes = STANDARD
            .decode(data)
            .map_err(|e| AgentError::Other(format!("image is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(AgentError::Other("image payload is empty".into()));
        }
        Ok(Self::new(bytes, mime))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything remembered about one conversation thread
#[derive(Clone, Debug)]
pub struct ConversationState {
    /// Stable key
    pub thread_id: ThreadId,

    /// Append-only transcript replayed to the model every turn
    conversation: Conversation,

    /// Image waiting for the next run
    pending_image: Option<ImagePayload>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(thread_id: ThreadId) -> Self {
        let now = Utc::now();
        Self {
            thread_id,
            conversation: Conversation::new(),
            pending_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Append messages produced by a completed run
    pub fn commit(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.conversation.extend(messages);
        self.touch();
    }

    /// Set or clear the image for the next run
    pub fn apply_image(&mut self, image: Option<ImagePayload>) {
        self.pending_image = image;
        self.touch();
    }

    pub const fn pending_image(&self) -> Option<&ImagePayload> {
        self.pending_image.as_ref()
    }

    /// Take the pending image, leaving none behind
    pub fn take_pending_image(&mut self) -> Option<ImagePayload> {
        self.pending_image.take()
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

type SharedState = Arc<AsyncMutex<ConversationState>>;

/// In-memory store of conversation states, one per thread id.
///
/// Each state sits behind its own async mutex: holding [`Checkpointer::lock`]
/// serializes every request against that thread, while different threads
/// proceed in parallel. States are never evicted.
#[derive(Debug, Default)]
pub struct Checkpointer {
    threads: Mutex<HashMap<ThreadId, SharedState>>,
}

impl Checkpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to a thread's state, creating it on first reference
    pub fn get_or_create(&self, thread_id: &ThreadId) -> SharedState {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        threads
            .entry(thread_id.clone())
            .or_insert_with(|| {
                tracing::debug!(thread_id = %thread_id, "Creating conversation thread");
                Arc::new(AsyncMutex::new(ConversationState::new(thread_id.clone())))
            })
            .clone()
    }

    /// Enter the thread's critical section; released when the guard drops
    pub async fn lock(&self, thread_id: &ThreadId) -> OwnedMutexGuard<ConversationState> {
        self.get_or_create(thread_id).lock_owned().await
    }

    /// Set or clear the pending image for a thread
    pub async fn apply_image(&self, thread_id: &ThreadId, image: Option<ImagePayload>) {
        self.lock(thread_id).await.apply_image(image);
    }

    /// Copy of a thread's state, if the thread exists
    pub async fn snapshot(&self, thread_id: &ThreadId) -> Option<ConversationState> {
        let shared = {
            let threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
            threads.get(thread_id).cloned()
        }?;
        let state = shared.lock().await;
        Some(state.clone())
    }

    /// Known thread ids, sorted
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        let threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = threads.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
