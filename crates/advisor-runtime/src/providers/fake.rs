//! Scripted generators for tests and offline runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::{Generation, GenerationConfig, ProviderError, TextGenerator, TokenUsage};

/// What a [`FakeGenerator`] does when asked to generate.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Return the text as-is
    Reply(String),

    /// Return the prompt followed by the text, like a causal LM decode
    EchoThenReply(String),

    /// Fail with an HTTP error
    Fail(String),

    /// Sleep before replying
    Delay(Duration, String),

    /// Panic inside `generate`
    Panic,
}

/// A [`TextGenerator`] with scripted behavior.
#[derive(Debug)]
pub struct FakeGenerator {
    behavior: FakeBehavior,
    available: bool,
    calls: AtomicU32,
}

impl FakeGenerator {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            available: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(FakeBehavior::Reply(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(FakeBehavior::Fail(message.into()))
    }

    /// A generator that reports itself unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::replying("")
        }
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = match &self.behavior {
            FakeBehavior::Reply(text) => text.clone(),
            FakeBehavior::EchoThenReply(text) => format!("{}{}", prompt, text),
            FakeBehavior::Fail(message) => {
                return Err(ProviderError::HttpError(message.clone()));
            }
            FakeBehavior::Delay(delay, text) => {
                tokio::time::sleep(*delay).await;
                text.clone()
            }
            FakeBehavior::Panic => panic!("fake generator panicked"),
        };

        Ok(Generation {
            usage: TokenUsage {
                prompt_tokens: self.estimate_tokens(prompt),
                completion_tokens: self.estimate_tokens(&text),
            },
            text,
            model: "fake".to_string(),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn health_check(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "fake"
    }
}
