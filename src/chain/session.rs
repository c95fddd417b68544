use std::error::Error;
use std::fmt;

use crate::chain::messages::{Role, Turn};

/// External capability that maps a transcript to a new assistant reply.
///
/// Implementations own their transport concerns (authentication, timeouts,
/// retries); the session treats every failure uniformly.
pub trait LanguageModel {
    fn reply(
        &self,
        transcript: &[Turn],
    ) -> impl Future<Output = Result<String, Box<dyn Error + Send + Sync>>> + Send;
}

/// Errors surfaced by [`ConversationSession`].
#[derive(Debug)]
pub enum SessionError {
    /// Submitted user content was empty or whitespace-only.
    EmptyInput,
    /// The model collaborator failed; the transcript is unchanged and the
    /// call may be retried.
    ModelUnavailable {
        source: Box<dyn Error + Send + Sync>,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "user turn is empty or whitespace-only"),
            Self::ModelUnavailable { source } => write!(f, "model call failed: {source}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ModelUnavailable { source } => Some(source.as_ref()),
            Self::EmptyInput => None,
        }
    }
}

/// How much of the transcript is presented to the model on each request.
///
/// The transcript itself is append-only and never trimmed; the window only
/// bounds the context sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextWindow {
    /// Send the whole transcript (may exceed the model's context limit in
    /// long sessions).
    Unbounded,
    /// Send the system turn, if any, plus the last `n` non-system turns.
    LastTurns(usize),
}

/// Owns an ordered transcript of role-tagged turns and mediates exchanges
/// with a [`LanguageModel`] collaborator.
///
/// Single-threaded and synchronous in shape: one outstanding request at a
/// time, no shared state across sessions.
pub struct ConversationSession<M> {
    model: M,
    transcript: Vec<Turn>,
    exit_word: String,
    window: ContextWindow,
}

impl<M: LanguageModel> ConversationSession<M> {
    /// Starts a session with an empty transcript.
    pub fn new(model: M) -> Self {
        Self {
            model,
            transcript: Vec::new(),
            exit_word: "exit".to_string(),
            window: ContextWindow::Unbounded,
        }
    }

    /// Starts a session whose first turn is a system prompt.
    pub fn with_system_prompt(model: M, prompt: impl Into<String>) -> Self {
        let mut session = Self::new(model);
        session.transcript.push(Turn::system(prompt));
        session
    }

    /// Replaces the exit sentinel (default `"exit"`).
    pub fn exit_word(mut self, word: impl Into<String>) -> Self {
        self.exit_word = word.into();
        self
    }

    /// Bounds the context presented to the model.
    pub fn context_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    /// Appends a user turn. Fails on empty or whitespace-only content,
    /// leaving the transcript untouched. Triggers no network call.
    pub fn submit_user_turn(&mut self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        self.transcript.push(Turn::user(text));
        Ok(())
    }

    /// Sends the current (windowed) transcript to the model. On success the
    /// reply is appended as an assistant turn and returned. On failure the
    /// transcript is left exactly as the model saw it, so the caller may
    /// retry without data loss.
    pub async fn request_reply(&mut self) -> Result<String, SessionError> {
        let context = self.windowed_context();
        let content = self
            .model
            .reply(&context)
            .await
            .map_err(|source| SessionError::ModelUnavailable { source })?;
        self.transcript.push(Turn::assistant(content.clone()));
        Ok(content)
    }

    /// Read-only view of the full transcript, in conversation order.
    pub fn history(&self) -> &[Turn] {
        &self.transcript
    }

    /// Whether `text` is the exit sentinel: whitespace-trimmed, ASCII
    /// case-insensitive. Pure, no side effects.
    pub fn is_exit_signal(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(&self.exit_word)
    }

    fn windowed_context(&self) -> Vec<Turn> {
        match self.window {
            ContextWindow::Unbounded => self.transcript.clone(),
            ContextWindow::LastTurns(n) => {
                let mut context: Vec<Turn> = self
                    .transcript
                    .iter()
                    .filter(|turn| turn.role == Role::System)
                    .cloned()
                    .collect();
                let skip = self
                    .transcript
                    .iter()
                    .filter(|turn| turn.role != Role::System)
                    .count()
                    .saturating_sub(n);
                context.extend(
                    self.transcript
                        .iter()
                        .filter(|turn| turn.role != Role::System)
                        .skip(skip)
                        .cloned(),
                );
                context
            }
        }
    }
}
