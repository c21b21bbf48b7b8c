//! Prompt generator: request → prompt → one completion call, with a panic-safe boundary.

use crate::{
    catalog::{CatalogError, TemplateCatalog},
    llm_client::{ChatMessage, CompletionClient, CompletionRequest, GenerationError},
    prompt_builder::PromptEngine,
    request::GenerationRequest,
};
use futures::FutureExt;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const SAMPLING_TEMPERATURE: f64 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 500;
pub const EMPTY_SUBJECT_WARNING: &str = "Please enter a description before generating.";

/// User-facing channel for warnings and errors, separate from results.
pub trait Feedback: Send + Sync {
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes feedback to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleFeedback;

impl Feedback for ConsoleFeedback {
    fn warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(String),
    /// Input failed validation; no request was made.
    NeedsInput(String),
    Failed(GenerationError),
}

impl GenerationOutcome {
    pub fn content(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Generated(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

pub struct PromptGenerator<C> {
    catalog: Arc<TemplateCatalog>,
    prompts: PromptEngine,
    client: C,
    feedback: Arc<dyn Feedback>,
}

impl<C: CompletionClient> PromptGenerator<C> {
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        client: C,
        feedback: Arc<dyn Feedback>,
    ) -> anyhow::Result<Self> {
        let prompts = PromptEngine::new()?;
        info!(
            "Prompt generator ready for catalog '{}' (persona optional: {})",
            catalog.name,
            catalog.persona_optional()
        );
        Ok(Self { catalog, prompts, client, feedback })
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, CatalogError> {
        if !request.has_subject() {
            warn!("Rejected request with empty subject");
            self.feedback.warning(EMPTY_SUBJECT_WARNING);
            return Ok(GenerationOutcome::NeedsInput(EMPTY_SUBJECT_WARNING.to_string()));
        }

        let resolved = self.catalog.resolve(request).map_err(|e| {
            error!("Catalog lookup failed: {}", e);
            e
        })?;

        // A panic anywhere below becomes a reported failure instead of unwinding into the caller.
        let fut = async {
            let prompt = self
                .prompts
                .render_prompt(&self.catalog, &resolved, request)
                .map_err(|e| GenerationError::Prompt(format!("{:#}", e)))?;
            let completion = CompletionRequest {
                messages: vec![
                    ChatMessage::system(self.catalog.system_prompt()),
                    ChatMessage::user(prompt),
                ],
                temperature: SAMPLING_TEMPERATURE,
                max_tokens: MAX_OUTPUT_TOKENS,
            };
            self.client.complete(&completion).await
        };
        let result = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                error!("panic in generate: {:?}", panic);
                Err(GenerationError::Panicked)
            }
        };

        match result {
            Ok(text) => {
                info!(
                    "Generated {} for {} ({} chars)",
                    resolved.content_type.name,
                    resolved.segment.name,
                    text.len()
                );
                Ok(GenerationOutcome::Generated(text))
            }
            Err(err) => {
                error!("LLM generation failed: {}", err);
                self.feedback.error(&format!("Error generating content: {}", err));
                Ok(GenerationOutcome::Failed(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Variant, NO_PERSONA};
    use crate::llm_client::{LlmClient, LlmConfig, Provider};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFeedback {
        warnings: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl Feedback for RecordingFeedback {
        fn warning(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    enum Reply {
        Text(String),
        Fail(GenerationError),
        Panic,
    }

    struct FakeClient {
        reply: Reply,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeClient {
        fn new(reply: Reply) -> Self {
            Self { reply, requests: Mutex::new(Vec::new()) }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for FakeClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Fail(err) => Err(err.clone()),
                Reply::Panic => panic!("client exploded"),
            }
        }
    }

    fn setup(
        variant: Variant,
        reply: Reply,
    ) -> (PromptGenerator<FakeClient>, Arc<RecordingFeedback>) {
        let feedback = Arc::new(RecordingFeedback::default());
        let catalog = Arc::new(TemplateCatalog::builtin(variant).unwrap());
        let generator =
            PromptGenerator::new(catalog, FakeClient::new(reply), feedback.clone()).unwrap();
        (generator, feedback)
    }

    #[tokio::test]
    async fn success_returns_first_choice_unmodified() {
        let (generator, feedback) =
            setup(Variant::SaasFeatures, Reply::Text("  Ship faster.\n".into()));
        let request = GenerationRequest::new("Audit log export", "Startups", "Blog Post", "Casual");

        let outcome = generator.generate(&request).await.unwrap();
        assert_eq!(outcome.content(), Some("  Ship faster.\n"));

        let sent = generator.client().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].temperature, SAMPLING_TEMPERATURE);
        assert_eq!(sent[0].max_tokens, MAX_OUTPUT_TOKENS);
        assert_eq!(sent[0].system_prompt(), Some(generator.catalog().system_prompt()));
        assert!(sent[0].system_prompt().unwrap().contains("copywriter"));
        assert!(feedback.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_catalog_pair_sends_one_complete_instruction() {
        for variant in Variant::ALL {
            let (generator, _) = setup(variant, Reply::Text("ok".into()));
            let catalog = generator.catalog();
            let tone = catalog.tones()[0].clone();
            let mut expected = 0;

            for segment_name in catalog.segment_names() {
                let segment = catalog.lookup_segment(segment_name).unwrap();
                let persona = catalog.personas_for(segment_name).unwrap()[0].clone();
                for content_name in catalog.content_type_names() {
                    let content_type = catalog.lookup_content_type(content_name).unwrap();
                    let request = GenerationRequest::new(
                        "A new feature",
                        segment_name,
                        content_name,
                        tone.as_str(),
                    )
                    .with_persona(persona.as_str());

                    let outcome = generator.generate(&request).await.unwrap();
                    assert_eq!(outcome.content(), Some("ok"));
                    expected += 1;

                    let sent = generator.client().requests();
                    assert_eq!(sent.len(), expected);
                    let prompt = sent[expected - 1].user_prompt().unwrap().to_string();
                    assert!(prompt.contains(content_type.length.word_range()), "{prompt}");
                    assert!(prompt.contains(&format!("{tone} tone")), "{prompt}");
                    assert!(prompt.contains(&segment.specific_needs), "{prompt}");
                }
            }
        }
    }

    #[tokio::test]
    async fn blank_subject_makes_no_request() {
        for subject in ["", "   ", "\n\t"] {
            let (generator, feedback) = setup(Variant::SaasFeatures, Reply::Text("x".into()));
            let request = GenerationRequest::new(subject, "Startups", "Blog Post", "Casual");

            let outcome = generator.generate(&request).await.unwrap();
            assert!(matches!(outcome, GenerationOutcome::NeedsInput(_)));
            assert_eq!(outcome.content(), None);
            assert!(generator.client().requests().is_empty());
            assert_eq!(feedback.warnings.lock().unwrap().len(), 1);
            assert!(feedback.errors.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn transport_error_reports_exactly_once() {
        let (generator, feedback) = setup(
            Variant::SaasFeatures,
            Reply::Fail(GenerationError::Network("connection reset".into())),
        );
        let request = GenerationRequest::new("Webhooks", "SMBs", "Email Campaign", "Friendly");

        let outcome = generator.generate(&request).await.unwrap();
        assert_eq!(
            outcome,
            GenerationOutcome::Failed(GenerationError::Network("connection reset".into()))
        );
        assert_eq!(generator.client().requests().len(), 1);

        let errors = feedback.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn panicking_client_is_contained() {
        let (generator, feedback) = setup(Variant::SaasFeatures, Reply::Panic);
        let request = GenerationRequest::new("Webhooks", "SMBs", "Email Campaign", "Friendly");

        let outcome = generator.generate(&request).await.unwrap();
        assert_eq!(outcome, GenerationOutcome::Failed(GenerationError::Panicked));
        assert_eq!(feedback.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_names_are_configuration_errors() {
        let (generator, feedback) = setup(Variant::SaasFeatures, Reply::Text("x".into()));

        let request = GenerationRequest::new("Webhooks", "Governments", "Blog Post", "Casual");
        assert_eq!(
            generator.generate(&request).await,
            Err(CatalogError::UnknownSegment("Governments".into()))
        );

        let request = GenerationRequest::new("Webhooks", "SMBs", "Podcast", "Casual");
        assert_eq!(
            generator.generate(&request).await,
            Err(CatalogError::UnknownContentType("Podcast".into()))
        );
        assert!(generator.client().requests().is_empty());
        assert!(feedback.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sentinel_persona_omits_benefit_clause() {
        let (generator, _) = setup(Variant::SaasFeatures, Reply::Text("x".into()));
        let base = GenerationRequest::new("Usage-based billing", "Startups", "Landing Page", "Persuasive");

        generator.generate(&base.clone().with_persona(NO_PERSONA)).await.unwrap();
        generator.generate(&base.with_persona("Technical Founder")).await.unwrap();

        let sent = generator.client().requests();
        assert!(!sent[0].user_prompt().unwrap().contains("Highlight the specific benefits"));
        assert!(sent[1]
            .user_prompt()
            .unwrap()
            .contains("Highlight the specific benefits a Technical Founder gets"));
    }

    #[tokio::test]
    async fn reported_failures_do_not_expose_credentials() {
        let mut config = LlmConfig::new(Provider::Gemini, "SECRET-KEY-123");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.transport.max_retries = 0;
        config.transport.connect_timeout = std::time::Duration::from_millis(200);

        let feedback = Arc::new(RecordingFeedback::default());
        let catalog = Arc::new(TemplateCatalog::builtin(Variant::SaasFeatures).unwrap());
        let generator =
            PromptGenerator::new(catalog, LlmClient::new(config).unwrap(), feedback.clone())
                .unwrap();
        let request = GenerationRequest::new("Webhooks", "SMBs", "Email Campaign", "Friendly");

        let outcome = generator.generate(&request).await.unwrap();
        match outcome {
            GenerationOutcome::Failed(err) => assert!(err.is_transient(), "{err:?}"),
            other => panic!("expected a transport failure, got {other:?}"),
        }

        let errors = feedback.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].contains("SECRET-KEY-123"), "{}", errors[0]);
    }
}
