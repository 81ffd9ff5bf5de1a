use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

/// Asks the user a yes/no question. Used before destructive actions.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Always gives the same answer and records what it was asked.
#[derive(Debug, Default)]
pub struct StaticPrompt {
    answer: bool,
    asked: AtomicUsize,
    last_message: Mutex<Option<String>>,
}

impl StaticPrompt {
    #[must_use]
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn accepting() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn declining() -> Self {
        Self::new(false)
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn last_message(&self) -> Option<String> {
        self.last_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for StaticPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
        self.answer
    }
}
