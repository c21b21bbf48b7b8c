//! Template catalog: segments, personas and content types for one variant.
//! - Built-in variants are TOML documents embedded at compile time
//! - Tables are validated once on load and never mutated afterwards

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::request::GenerationRequest;

/// Persona label meaning "do not tailor to a persona".
pub const NO_PERSONA: &str = "No Persona";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),
    #[error("Persona '{persona}' is not offered for segment '{segment}'")]
    UnknownPersona { segment: String, persona: String },
    #[error("A persona must be selected for segment '{0}'")]
    PersonaRequired(String),
    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

/// Target length of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    Medium,
    Long,
}

impl Length {
    pub fn word_range(self) -> &'static str {
        match self {
            Length::Short => "50-75 words",
            Length::Medium => "100-150 words",
            Length::Long => "200-250 words",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Length::Short => "short",
            Length::Medium => "medium",
            Length::Long => "long",
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub focus: String,
    pub personas: Vec<String>,
    pub specific_needs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub name: String,
    pub focus: String,
    pub length: Length,
    pub style: String,
    pub call_to_action: String,
}

/// Catalog entries a request resolved to.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub segment: &'a Segment,
    pub content_type: &'a ContentType,
    pub persona: Option<&'a str>,
}

/// Read-only lookup tables for one variant (top-level catalog document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub name: String,
    system_prompt: String,
    subject_label: String,
    #[serde(default)]
    persona_optional: bool,
    tones: Vec<String>,
    segments: Vec<Segment>,
    content_types: Vec<ContentType>,
}

impl TemplateCatalog {
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let catalog: TemplateCatalog =
            toml::from_str(source).map_err(|e| CatalogError::Invalid(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn builtin(variant: Variant) -> Result<Self, CatalogError> {
        Self::from_toml_str(variant.source())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.segments.is_empty() {
            return Err(CatalogError::Invalid(format!("'{}' defines no segments", self.name)));
        }
        if self.content_types.is_empty() {
            return Err(CatalogError::Invalid(format!(
                "'{}' defines no content types",
                self.name
            )));
        }
        if self.tones.is_empty() {
            return Err(CatalogError::Invalid(format!("'{}' defines no tones", self.name)));
        }

        let mut seen = HashSet::new();
        for segment in &self.segments {
            if !seen.insert(segment.name.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate segment '{}'",
                    segment.name
                )));
            }
            if segment.personas.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "segment '{}' has no personas",
                    segment.name
                )));
            }
            if segment.personas.iter().any(|p| p == NO_PERSONA) {
                return Err(CatalogError::Invalid(format!(
                    "segment '{}' lists the reserved persona '{NO_PERSONA}'",
                    segment.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for content_type in &self.content_types {
            if !seen.insert(content_type.name.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate content type '{}'",
                    content_type.name
                )));
            }
        }
        Ok(())
    }

    pub fn lookup_segment(&self, name: &str) -> Result<&Segment, CatalogError> {
        self.segments
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CatalogError::UnknownSegment(name.to_string()))
    }

    pub fn lookup_content_type(&self, name: &str) -> Result<&ContentType, CatalogError> {
        self.content_types
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CatalogError::UnknownContentType(name.to_string()))
    }

    /// Persona choices for a segment, led by [`NO_PERSONA`] when a persona may be omitted.
    pub fn personas_for(&self, segment_name: &str) -> Result<Vec<String>, CatalogError> {
        let segment = self.lookup_segment(segment_name)?;
        let mut personas = Vec::with_capacity(segment.personas.len() + 1);
        if self.persona_optional {
            personas.push(NO_PERSONA.to_string());
        }
        personas.extend(segment.personas.iter().cloned());
        Ok(personas)
    }

    pub fn resolve<'a>(&'a self, request: &'a GenerationRequest) -> Result<Resolved<'a>, CatalogError> {
        let segment = self.lookup_segment(&request.segment)?;
        let content_type = self.lookup_content_type(&request.content_type)?;

        let persona = match request.selected_persona() {
            Some(persona) if segment.personas.iter().any(|p| p == persona) => Some(persona),
            Some(persona) => {
                return Err(CatalogError::UnknownPersona {
                    segment: segment.name.clone(),
                    persona: persona.to_string(),
                })
            }
            None if self.persona_optional => None,
            None => return Err(CatalogError::PersonaRequired(segment.name.clone())),
        };

        Ok(Resolved { segment, content_type, persona })
    }

    pub fn segment_names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn content_type_names(&self) -> Vec<&str> {
        self.content_types.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn tones(&self) -> &[String] {
        &self.tones
    }

    pub fn persona_optional(&self) -> bool {
        self.persona_optional
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn subject_label(&self) -> &str {
        &self.subject_label
    }
}

/// Catalogs shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    ProductDescriptions,
    #[default]
    SaasFeatures,
    DeveloperTools,
    Ecommerce,
    ProfessionalServices,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::ProductDescriptions,
        Variant::SaasFeatures,
        Variant::DeveloperTools,
        Variant::Ecommerce,
        Variant::ProfessionalServices,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::ProductDescriptions => "product-descriptions",
            Variant::SaasFeatures => "saas-features",
            Variant::DeveloperTools => "developer-tools",
            Variant::Ecommerce => "ecommerce",
            Variant::ProfessionalServices => "professional-services",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Variant::ProductDescriptions => include_str!("../catalogs/product_descriptions.toml"),
            Variant::SaasFeatures => include_str!("../catalogs/saas_features.toml"),
            Variant::DeveloperTools => include_str!("../catalogs/developer_tools.toml"),
            Variant::Ecommerce => include_str!("../catalogs/ecommerce.toml"),
            Variant::ProfessionalServices => include_str!("../catalogs/professional_services.toml"),
        }
    }
}

impl FromStr for Variant {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| CatalogError::Invalid(format!("unknown catalog variant '{s}'")))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
