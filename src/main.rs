use anyhow::{Context, Result};
use copygen::{
    config::Settings, output::Download, ConsoleFeedback, GenerationOutcome, GenerationRequest,
    LlmClient, PromptGenerator, TemplateCatalog,
};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Routes panics through the log before the default hook prints the backtrace hint.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        error!("copygen panicked at {location}");
        default_hook(info);
    }));
}

fn read_request() -> Result<GenerationRequest> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    GenerationRequest::from_toml_str(&input).context("Invalid request TOML on stdin")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Keep stdout clean for the generated text.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    install_panic_hook();

    let settings = Settings::from_env()?;
    let catalog = Arc::new(TemplateCatalog::builtin(settings.variant)?);
    let client = LlmClient::new(settings.llm.clone())?;
    info!("Completion client: {:?}", client.config());
    let generator = PromptGenerator::new(catalog, client, Arc::new(ConsoleFeedback))?;

    let request = read_request()?;
    info!(
        "Generating {} for {} ({} tone)",
        request.content_type, request.segment, request.tone
    );

    match generator.generate(&request).await? {
        GenerationOutcome::Generated(text) => {
            print!("{text}");
            if let Some(dir) = &settings.download_dir {
                Download::for_request(&request, &text).write_to(dir)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        GenerationOutcome::NeedsInput(_) | GenerationOutcome::Failed(_) => Ok(ExitCode::FAILURE),
    }
}
