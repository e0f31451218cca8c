mod aggregate;
mod config;
mod error;
mod extract;
mod lexicon;
mod model;
mod nlu;
mod pipeline;
mod resolver;
mod server;
mod store;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use review_common::openai::{OpenAiClient, OpenAiClientConfig};

use config::{Config, NluMode, PresenterMode};
use extract::ReviewExtractor;
use lexicon::Lexicon;
use nlu::{
    LiteralInterpreter, LlmInterpreter, LlmPresenter, PlainPresenter, QueryInterpreter,
    ScorePresenter,
};
use pipeline::Pipeline;
use resolver::QueryResolver;
use server::ReviewScorerServer;
use store::ReviewStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP JSON-RPC or the one-shot answer
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting review-scorer");

    let config = Config::from_env()?;
    info!(
        reviews_path = %config.reviews_path.display(),
        name_matching = ?config.name_matching,
        scoring_policy = config.scoring_policy.name(),
        nlu_mode = ?config.nlu_mode,
        presenter_mode = ?config.presenter_mode,
        "configuration loaded"
    );

    let store = Arc::new(ReviewStore::load(&config.reviews_path, config.name_matching)?);
    if store.is_empty() {
        warn!(path = %config.reviews_path.display(), "review corpus is empty");
    }
    info!(
        reviews = store.len(),
        restaurants = store.restaurants().len(),
        "review corpus loaded"
    );

    let openai = if config.needs_llm() {
        let openai_config = OpenAiClientConfig::from_env();
        info!(
            base_url = %openai_config.base_url,
            model = %config.nlu_model,
            timeout_ms = openai_config.default_timeout.as_millis(),
            max_retries = openai_config.max_retries,
            "openai client configured"
        );
        Some(Arc::new(OpenAiClient::new(openai_config)?))
    } else {
        None
    };

    let interpreter: Arc<dyn QueryInterpreter> = match (config.nlu_mode, &openai) {
        (NluMode::Llm, Some(client)) => {
            Arc::new(LlmInterpreter::new(Arc::clone(client), config.nlu_model.clone()))
        }
        _ => Arc::new(LiteralInterpreter),
    };
    let presenter: Arc<dyn ScorePresenter> = match (config.presenter_mode, &openai) {
        (PresenterMode::Llm, Some(client)) => {
            Arc::new(LlmPresenter::new(Arc::clone(client), config.nlu_model.clone()))
        }
        _ => Arc::new(PlainPresenter),
    };

    let pipeline = Pipeline::new(
        QueryResolver::new(interpreter),
        store,
        Arc::new(ReviewExtractor::new(Lexicon::standard())),
        config.scoring_policy,
    );

    if let Some(query) = std::env::args().nth(1) {
        let result = pipeline.run(&query).await?;
        let answer = presenter.present(&result).await?;
        println!("{answer}");
        return Ok(());
    }

    let server = ReviewScorerServer::new(pipeline, presenter);

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
