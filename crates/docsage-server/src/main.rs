//! DocSage — upload a PDF or DOCX, ask an LLM about it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod session;
mod state;

use docsage_analyze::{AnalysisClient, ClientConfig};
use docsage_core::DocSageConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "models" => {
                let client = AnalysisClient::new(ClientConfig::from_env()?)?;
                let models = client.list_models().await?;
                for model in &models {
                    match &model.display_name {
                        Some(display) => println!("{}  ({})", model.name, display),
                        None => println!("{}", model.name),
                    }
                }
                info!("{} models available", models.len());
                return Ok(());
            }
            "extract" => {
                if args.len() < 3 {
                    eprintln!("Usage: docsage extract <file.pdf|file.docx>");
                    std::process::exit(1);
                }
                let config = DocSageConfig::from_env()?;
                let options = docsage_extract::ExtractOptions {
                    pdf_password: std::env::var("DOCSAGE_PDF_PASSWORD").ok(),
                    textless_pages: config.textless_pages,
                    staging_dir: config.staging_dir,
                };
                let path = PathBuf::from(&args[2]);
                let document = docsage_extract::extract_file(&path, &options)?;
                if document.is_blank() {
                    eprintln!("No text could be extracted from {}", path.display());
                    std::process::exit(1);
                }
                print!("{}", document.text);
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("DocSage — document analysis with Gemini or OpenAI");
                println!();
                println!("Usage: docsage [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  models                   List models visible to the configured key");
                println!("  extract <file>           Print the text extracted from a PDF or DOCX");
                println!("  help                     Show this help message");
                println!();
                println!("Environment:");
                println!("  DOCSAGE_PROVIDER         gemini (default) or openai");
                println!("  GEMINI_API_KEY / OPENAI_API_KEY");
                println!("  PORT                     HTTP port (default 5000)");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'docsage help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let config = DocSageConfig::from_env()?;
    let port = config.port;

    let client_config = ClientConfig::from_env()?;
    if !client_config.has_credential() {
        tracing::warn!(
            "{} is not set; analysis requests will fail until it is",
            ClientConfig::api_key_var(client_config.provider)
        );
    }
    let analyzer = AnalysisClient::new(client_config)?;

    let state = Arc::new(AppState::new(config, analyzer));

    // Start background session expiry
    state::start_session_sweeper(state.clone());

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("DocSage server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
