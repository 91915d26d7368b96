use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use citedesk::config::AppConfig;
use citedesk::models::{CitationAction, RawAnswer};
use citedesk::render::AnswerRenderer;

#[derive(Parser, Debug)]
#[command(name = "citedesk-render")]
#[command(about = "Render a stored answer payload and list its citations")]
struct Cli {
    /// Answer JSON as returned by the conversation endpoint.
    #[arg(long)]
    file: String,
    #[arg(long, default_value_t = false)]
    sanitize: bool,
    /// Organization whose document namespace PDF links point into.
    #[arg(long)]
    organization: Option<String>,
    /// Print the rendered answer as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if cli.sanitize {
        config.render.sanitize_answer = true;
    }
    let renderer = AnswerRenderer::new(&config);

    let body = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("failed reading {}", cli.file))?;
    let mut answer: RawAnswer =
        serde_json::from_str(&body).with_context(|| format!("invalid answer json in {}", cli.file))?;
    if cli.organization.is_some() {
        answer.organization = cli.organization;
    }

    let rendered = renderer.render(&answer);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    println!("{}", rendered.html);
    for entry in &rendered.citations {
        let target = match &entry.action {
            Some(CitationAction::OpenPdf { url }) => format!("pdf {}", url),
            Some(CitationAction::OpenViewer { url }) => format!("viewer {}", url),
            Some(CitationAction::ShowContent { .. }) => "inline content".to_string(),
            None => "not clickable".to_string(),
        };
        println!("[{}] {} -> {}", entry.ordinal, entry.label, target);
    }
    for question in &rendered.followups {
        println!("? {}", question);
    }
    if rendered.chart_data_uri.is_some() {
        println!("(chart attached)");
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
