mod app;
mod completion;
mod config;
mod embedding;
mod ingest;
mod models;
mod parser;
mod prompt;
mod relay;
mod retrieval;
mod routes;
mod selector;
mod vector_store;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::AppState;
use completion::openai::OpenAICompletionModel;
use config::{load_dotenv, load_settings};
use embedding::huggingface::HuggingFaceEmbeddingModel;
use ingest::Ingestor;
use prompt::SystemPrompt;
use relay::ChatRelay;
use retrieval::VectorContextRetriever;
use selector::ModelSelector;
use vector_store::pinecone::PineconeIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting support-relay server...");

    // Load configuration.
    load_dotenv();
    let config_path = std::env::var("SUPPORT_CONFIG").ok();
    let settings = load_settings(config_path.as_deref())?;
    info!(
        "Configuration loaded: environment={}, host={}, port={}",
        settings.environment, settings.host, settings.port
    );

    // Initialize embedding model.
    let embedding_model: Arc<dyn embedding::EmbeddingModel> =
        Arc::new(HuggingFaceEmbeddingModel::new(
            &settings.embedding_model,
            &settings.huggingface_api_key,
            &settings.embedding_base_url,
        ));
    info!("Embedding model initialized: {}", embedding_model.model_name());

    // Initialize vector index.
    let index = match &settings.index_host {
        Some(host) => PineconeIndex::new(&settings.pinecone_api_key, host, settings.vector_dimensions),
        None => {
            PineconeIndex::connect(
                &settings.pinecone_api_key,
                &settings.control_plane_url,
                &settings.index_name,
                settings.vector_dimensions,
            )
            .await?
        }
    };
    info!("Vector index initialized: {} ({})", settings.index_name, index.host());
    let vector_store: Arc<dyn vector_store::VectorStore> = Arc::new(index);

    // Initialize completion model.
    let completion_model: Arc<dyn completion::CompletionModel> = Arc::new(
        OpenAICompletionModel::new(&settings.completion_base_url, &settings.openrouter_api_key)
            .with_attribution(
                settings.completion_referer.clone(),
                settings.completion_title.clone(),
            ),
    );
    info!("Completion endpoint: {}", settings.completion_base_url);

    // Model routing and retrieval.
    let selector = Arc::new(ModelSelector::new(
        embedding_model.clone(),
        settings.model_categories.clone(),
    )?);
    info!("Model selector initialized with {} categories", selector.categories().len());

    let retriever = Arc::new(VectorContextRetriever::new(
        embedding_model.clone(),
        vector_store.clone(),
        settings.top_k,
    ));
    let prompt = SystemPrompt::new(settings.system_template.clone())?;

    // Build application state.
    let state = Arc::new(AppState {
        chat_relay: ChatRelay::new(retriever, selector, completion_model, prompt),
        ingestor: Ingestor::new(embedding_model, vector_store),
        settings: settings.clone(),
    });

    // Build router.
    let app = routes::build_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
