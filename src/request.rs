use serde::{Deserialize, Serialize};

use crate::catalog::NO_PERSONA;

/// One form submission. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Product information or feature description.
    pub subject: String,
    pub segment: String,
    #[serde(default)]
    pub persona: Option<String>,
    pub content_type: String,
    pub tone: String,
}

impl GenerationRequest {
    pub fn new(
        subject: impl Into<String>,
        segment: impl Into<String>,
        content_type: impl Into<String>,
        tone: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            segment: segment.into(),
            persona: None,
            content_type: content_type.into(),
            tone: tone.into(),
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// The persona to tailor for, `None` when absent, blank or [`NO_PERSONA`].
    pub fn selected_persona(&self) -> Option<&str> {
        self.persona
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != NO_PERSONA)
    }

    pub fn has_subject(&self) -> bool {
        !self.subject.trim().is_empty()
    }
}
