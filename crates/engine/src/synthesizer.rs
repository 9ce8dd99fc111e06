//! Turns the merged context into the final answer.

use crate::budget::Budget;
use crate::merger::MergedContext;
use sleuth_client::{GenerationOptions, TextGenerator};
use sleuth_core::{AnswerOutcome, AppConfig, Query};
use std::sync::Arc;
use std::time::Duration;

/// Answer returned when nothing usable was gathered.
pub const INSUFFICIENT_ANSWER: &str = "I could not find enough information to answer this question. \
     Try rephrasing it or asking again later.";

/// Items quoted by the snippet-only fallback.
const FALLBACK_ITEMS: usize = 3;

/// Generation attempts before falling back to snippets.
const MAX_ATTEMPTS: u32 = 2;

/// Characters quoted per item in the fallback.
const FALLBACK_ITEM_CHARS: usize = 400;

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl From<&AppConfig> for SynthesisConfig {
    fn from(config: &AppConfig) -> Self {
        Self { timeout: config.generation_timeout(), max_tokens: config.answer_max_tokens }
    }
}

/// Answer text plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub text: String,
    pub outcome: AnswerOutcome,
    /// Urls present in the context, in context order.
    pub sources: Vec<String>,
}

#[derive(Clone)]
pub struct AnswerSynthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
    config: SynthesisConfig,
}

impl AnswerSynthesizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: SynthesisConfig) -> Self {
        Self { generator, config }
    }

    /// Produce an answer for `query` from `context`.
    ///
    /// Generation gets at most two attempts and never outlives `budget`:
    /// an attempt still running when the budget fires is dropped, and none
    /// starts after it, so the answer falls back to snippets.
    pub async fn synthesize(
        &self, query: &Query, context: &MergedContext, prior: &[String], budget: &Budget,
    ) -> Synthesis {
        if context.is_empty() {
            return Synthesis {
                text: INSUFFICIENT_ANSWER.to_string(),
                outcome: AnswerOutcome::Insufficient,
                sources: Vec::new(),
            };
        }

        let sources = context.urls();

        let Some(generator) = &self.generator else {
            return Synthesis { text: snippet_answer(context), outcome: AnswerOutcome::SnippetFallback, sources };
        };

        let prompt = build_prompt(&query.text, context, prior);
        let options = GenerationOptions::new(self.config.max_tokens, 0.7);

        for attempt in 1..=MAX_ATTEMPTS {
            let generation = tokio::time::timeout(self.config.timeout, generator.generate(&prompt, options));
            let outcome = tokio::select! {
                biased;
                _ = budget.token().cancelled() => None,
                reply = generation => Some(reply),
            };

            match outcome {
                Some(Ok(Ok(text))) if !text.trim().is_empty() => {
                    return Synthesis { text: text.trim().to_string(), outcome: AnswerOutcome::Generated, sources };
                }
                Some(Ok(Ok(_))) => tracing::warn!(query = %query.fingerprint, attempt, "generator returned empty answer"),
                Some(Ok(Err(e))) => {
                    tracing::warn!(query = %query.fingerprint, attempt, error = %e, "answer generation failed")
                }
                Some(Err(_)) => tracing::warn!(query = %query.fingerprint, attempt, "answer generation timed out"),
                None => {
                    tracing::warn!(query = %query.fingerprint, attempt, "budget elapsed before an answer was generated");
                    break;
                }
            }
        }

        Synthesis { text: snippet_answer(context), outcome: AnswerOutcome::SnippetFallback, sources }
    }
}

/// Instructions, prior turns, numbered sources, then the question.
pub fn build_prompt(question: &str, context: &MergedContext, prior: &[String]) -> String {
    let mut prompt = String::from(
        "You are a concise research assistant. Answer the question using only the sources below. \
         Cite sources by their number like [1]. If the sources do not contain the answer, say so.\n\n",
    );

    if !prior.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for turn in prior {
            prompt.push_str(turn);
            prompt.push_str("\n\n");
        }
    }

    for (idx, item) in context.items.iter().enumerate() {
        prompt.push_str(&format!("[Source {}: {}]\n{}\n\n", idx + 1, item.url, item.text));
    }

    prompt.push_str(&format!("Question: {}\nAnswer:", question.trim()));
    prompt
}

/// Answer built straight from the top items when generation is unavailable.
pub fn snippet_answer(context: &MergedContext) -> String {
    let mut lines = vec!["Here is what the top sources say:".to_string()];

    for (idx, item) in context.items.iter().take(FALLBACK_ITEMS).enumerate() {
        let excerpt: String = item.text.chars().take(FALLBACK_ITEM_CHARS).collect();
        let heading = if item.title.trim().is_empty() { item.url.as_str() } else { item.title.trim() };
        lines.push(format!("[{}] {} ({})\n{}", idx + 1, heading, item.url, excerpt.trim()));
    }

    lines.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::ContextItem;
    use sleuth_client::GenerationError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str, _options: GenerationOptions) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() { Err(GenerationError::Empty) } else { replies.remove(0) }
        }
    }

    fn item(n: usize) -> ContextItem {
        ContextItem {
            url: format!("https://s{n}.example/"),
            title: format!("Source {n}"),
            text: format!("fact number {n}"),
            source: "fake".into(),
            rank: n,
            has_content: false,
        }
    }

    fn context(n: usize) -> MergedContext {
        MergedContext { items: (1..=n).map(item).collect() }
    }

    fn config() -> SynthesisConfig {
        SynthesisConfig { timeout: Duration::from_millis(200), max_tokens: 600 }
    }

    fn budget() -> Budget {
        Budget::start(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_empty_context_is_insufficient_without_generation() {
        let generator = Scripted::new(vec![Ok("should not be used".into())]);
        let synth = AnswerSynthesizer::new(Some(generator.clone()), config());

        let out = synth.synthesize(&Query::new("q"), &MergedContext::default(), &[], &budget()).await;
        assert_eq!(out.outcome, AnswerOutcome::Insufficient);
        assert_eq!(out.text, INSUFFICIENT_ANSWER);
        assert!(out.sources.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generated_answer_and_prompt_shape() {
        let generator = Scripted::new(vec![Ok("  The answer [1]. ".into())]);
        let synth = AnswerSynthesizer::new(Some(generator.clone()), config());
        let prior = vec!["User: earlier\nAssistant: reply".to_string()];

        let out = synth.synthesize(&Query::new("what is it?"), &context(2), &prior, &budget()).await;
        assert_eq!(out.outcome, AnswerOutcome::Generated);
        assert_eq!(out.text, "The answer [1].");
        assert_eq!(out.sources, vec!["https://s1.example/", "https://s2.example/"]);

        let prompt = generator.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("[Source 1: https://s1.example/]\nfact number 1"));
        assert!(prompt.contains("[Source 2: https://s2.example/]"));
        assert!(prompt.contains("Previous conversation:\nUser: earlier"));
        assert!(prompt.ends_with("Question: what is it?\nAnswer:"));
    }

    #[tokio::test]
    async fn test_retry_once_then_succeed() {
        let generator = Scripted::new(vec![Err(GenerationError::RateLimited), Ok("second try".into())]);
        let synth = AnswerSynthesizer::new(Some(generator.clone()), config());

        let out = synth.synthesize(&Query::new("q"), &context(1), &[], &budget()).await;
        assert_eq!(out.text, "second try");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_after_two_failures() {
        let generator =
            Scripted::new(vec![Err(GenerationError::Timeout), Err(GenerationError::Timeout), Ok("late".into())]);
        let synth = AnswerSynthesizer::new(Some(generator.clone()), config());

        let out = synth.synthesize(&Query::new("q"), &context(5), &[], &budget()).await;
        assert_eq!(out.outcome, AnswerOutcome::SnippetFallback);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(out.text.contains("[3] Source 3"));
        assert!(!out.text.contains("Source 4"));
        assert_eq!(out.sources.len(), 5);
    }

    #[tokio::test]
    async fn test_no_generation_once_budget_spent() {
        let generator = Scripted::new(vec![Ok("unused".into())]);
        let synth = AnswerSynthesizer::new(Some(generator.clone()), config());
        let spent = Budget::start(Duration::ZERO);
        spent.token().cancelled().await;

        let out = synth.synthesize(&Query::new("q"), &context(1), &[], &spent).await;
        assert_eq!(out.outcome, AnswerOutcome::SnippetFallback);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    /// Fails every call after a delay.
    struct SlowFailing {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextGenerator for SlowFailing {
        async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Err(GenerationError::Http { status: 503 })
        }
    }

    #[tokio::test]
    async fn test_retry_is_cut_short_by_budget() {
        let generator = Arc::new(SlowFailing { delay: Duration::from_millis(250), calls: AtomicUsize::new(0) });
        let synth = AnswerSynthesizer::new(
            Some(generator.clone()),
            SynthesisConfig { timeout: Duration::from_secs(1), max_tokens: 600 },
        );
        let budget = Budget::start(Duration::from_millis(300));

        let start = std::time::Instant::now();
        let out = synth.synthesize(&Query::new("q"), &context(1), &[], &budget).await;

        assert!(start.elapsed() < Duration::from_millis(450), "took {:?}", start.elapsed());
        assert!(budget.is_exhausted());
        assert_eq!(out.outcome, AnswerOutcome::SnippetFallback);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_generator_uses_snippets() {
        let synth = AnswerSynthesizer::new(None, config());
        let out = synth.synthesize(&Query::new("q"), &context(1), &[], &budget()).await;
        assert_eq!(out.outcome, AnswerOutcome::SnippetFallback);
        assert!(out.text.contains("fact number 1"));
    }
}
