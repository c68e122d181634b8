use clap::Parser;
use slack_transcript::cli::Cli;
use slack_transcript::config::load_settings;
use slack_transcript::error::Result;
use slack_transcript::{Exporter, logging};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Configuration errors surface here, before any network call
    let settings = load_settings(&cli)?;
    tracing::debug!(
        channel = %settings.export.channel,
        days = settings.export.lookback_days,
        cache = %settings.cache.path.display(),
        "Configuration loaded"
    );

    let exporter = Exporter::new(settings)?;
    let summary = exporter.run().await?;

    if summary.failed_threads > 0 {
        tracing::warn!(
            failed_threads = summary.failed_threads,
            "Some threads were exported without their replies"
        );
    }

    println!(
        "Exported #{}: {} threads, {} replies -> {}",
        summary.channel_name,
        summary.threads,
        summary.replies,
        summary.markdown_path.display()
    );
    if let Some(json) = &summary.json_path {
        println!("Raw thread data -> {}", json.display());
    }

    Ok(())
}
