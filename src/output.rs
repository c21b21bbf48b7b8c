//! Download artifact for generated copy.
//! - File name is derived from segment, content type and tone, lower-cased
//! - The text is written exactly as the model returned it

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::request::GenerationRequest;

lazy_static! {
    static ref NON_SLUG_RE: Regex = Regex::new(r"[^a-z0-9]+").expect("valid NON_SLUG_RE");
}

pub const TEXT_MIME: &str = "text/plain";

fn slug(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    NON_SLUG_RE
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: &'static str,
    pub data: String,
}

impl Download {
    pub fn for_request(request: &GenerationRequest, text: &str) -> Self {
        let parts: Vec<String> = [&request.segment, &request.content_type, &request.tone]
            .into_iter()
            .map(|p| slug(p))
            .filter(|p| !p.is_empty())
            .collect();
        let stem = if parts.is_empty() { "generated_content".to_string() } else { parts.join("_") };

        Self {
            file_name: format!("{}.txt", stem),
            mime: TEXT_MIME,
            data: text.to_string(),
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create download directory {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved generated content ({}) to {}", self.mime, path.display());
        Ok(path)
    }
}
