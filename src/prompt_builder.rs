use crate::catalog::{Resolved, TemplateCatalog};
use crate::request::GenerationRequest;
use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};
use tracing::debug;

const MARKETING_COPY_TEMPLATE: &str = "prompts/marketing_copy.tera";

/// Renders the user-role instruction sent to the model.
#[derive(Debug, Clone)]
pub struct PromptEngine {
    tera: Tera,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            MARKETING_COPY_TEMPLATE,
            include_str!("../templates/prompts/marketing_copy.tera"),
        )
        .context("Failed to load prompt templates")?;
        tera.autoescape_on(vec![]); // we're not rendering HTML
        Ok(Self { tera })
    }

    pub fn render_prompt(
        &self,
        catalog: &TemplateCatalog,
        resolved: &Resolved<'_>,
        request: &GenerationRequest,
    ) -> Result<String> {
        let mut context = TeraContext::new();
        context.insert("subject_label", catalog.subject_label());
        context.insert("subject", &request.subject);
        context.insert("tone", &request.tone);
        context.insert("segment", resolved.segment);
        context.insert("content_type", resolved.content_type);
        context.insert("persona", &resolved.persona);
        context.insert("word_range", resolved.content_type.length.word_range());

        let prompt = self
            .tera
            .render(MARKETING_COPY_TEMPLATE, &context)
            .context(format!("Failed to render template: {}", MARKETING_COPY_TEMPLATE))?;
        debug!("Rendered prompt ({} chars)", prompt.len());
        Ok(prompt)
    }
}
