//! In-process doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::broadcast::{Broadcaster, PipelineEvent};
use crate::llm::{CompletionFuture, LlmClient, LlmError, LlmResult, Reply};

/// Scripted language model. Unscripted calls answer `"ok"`.
pub struct StubLlm {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    prompts: Mutex<Vec<String>>,
    model: Mutex<String>,
    models: Vec<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            model: Mutex::new("llama3.2".to_string()),
            models: vec!["llama3.2".to_string(), "mistral:7b".to_string()],
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(ToString::to_string).collect();
        self
    }

    pub fn reply(&self, content: &str) {
        self.lock_replies().push_back(Ok(content.to_string()));
    }

    pub fn fail(&self, err: LlmError) {
        self.lock_replies().push_back(Err(err));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<LlmResult<String>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LlmClient for StubLlm {
    fn try_complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a, LlmResult<Reply>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(prompt.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = self.lock_replies().pop_front();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match scripted {
                Some(Ok(content)) => Ok(Reply::new(content, Some(self.model()))),
                Some(Err(err)) => Err(err),
                None => Ok(Reply::new("ok", Some(self.model()))),
            }
        })
    }

    fn set_model(&self, model: &str) {
        *self.model.lock().unwrap_or_else(PoisonError::into_inner) = model.to_string();
    }

    fn model(&self) -> String {
        self.model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn list_models(&self) -> CompletionFuture<'_, LlmResult<Vec<String>>> {
        Box::pin(async move { Ok(self.models.clone()) })
    }
}

/// Broadcaster that records every event.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingBroadcaster {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Summary { summary } => Some(summary),
                _ => None,
            })
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
