use catalog_search::{
    api::{build_router, AppState},
    config::{Config, ObservabilityConfig},
    messaging::{NatsEventSource, ProductEvent, ProductEventConsumer},
    search::{connect_engine, ElasticsearchBackend, EngineKind, ProductIndexer, SearchService},
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Faceted product catalog search", long_about = None, version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Serve the HTTP API, consuming product events when messaging is enabled
    Serve,

    /// Only consume product events into the index
    Consume,

    /// Create the Elasticsearch index with its mapping
    Provision,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config.observability);

    tracing::info!("Starting catalog-search v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Consume => consume(config).await,
        Command::Provision => provision(config).await,
    }
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("catalog_search={},tower_http=info", observability.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = catalog_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    let engine = connect_engine(&config.search, &config.elasticsearch)
        .await
        .context("failed to initialize search engine")?;
    tracing::info!("✅ Search engine ready: {}", engine.name());

    let consumer_handle = if config.messaging.enabled {
        let consumer = ProductEventConsumer::new(ProductIndexer::new(engine.clone()));
        let messaging = config.messaging.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = run_consumer(consumer, messaging).await {
                tracing::error!("Product event consumer error: {}", e);
            }
        }))
    } else {
        tracing::info!("⚠️  Product event consumer disabled in configuration");
        None
    };

    let search = SearchService::new(engine, &config.search);
    let app_state = AppState::new(search, &config.search)
        .with_metrics(config.observability.prometheus_enabled);
    let app = build_router(app_state);

    let http_addr = config.bind_address();
    let http_listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/v1/search", http_addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if let Some(handle) = consumer_handle {
        handle.abort();
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

async fn consume(config: Config) -> anyhow::Result<()> {
    let engine = connect_engine(&config.search, &config.elasticsearch)
        .await
        .context("failed to initialize search engine")?;
    let consumer = ProductEventConsumer::new(ProductIndexer::new(engine));

    tokio::select! {
        result = run_consumer(consumer, config.messaging) => {
            result.context("product event consumer failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn run_consumer(
    consumer: ProductEventConsumer,
    messaging: catalog_search::messaging::MessagingConfig,
) -> Result<(), catalog_search::messaging::MessagingError> {
    let source = NatsEventSource::connect(messaging).await?;
    let mut stream = source.subscribe::<ProductEvent>().await?;
    tracing::info!("✅ Product event consumer started");

    let stats = consumer.run(&mut stream).await;
    tracing::warn!(
        processed = stats.processed,
        dropped = stats.dropped,
        "Product event subscription ended"
    );
    Ok(())
}

async fn provision(config: Config) -> anyhow::Result<()> {
    if config.search.engine != EngineKind::Elasticsearch {
        // The embedded index creates its own schema on open
        connect_engine(&config.search, &config.elasticsearch).await?;
        tracing::info!("✅ Embedded index ready, nothing to provision");
        return Ok(());
    }

    let backend = ElasticsearchBackend::new(&config.elasticsearch)?;
    let created = backend
        .provision()
        .await
        .with_context(|| format!("failed to provision index '{}'", backend.index_name()))?;
    if created {
        tracing::info!("✅ Created index '{}'", backend.index_name());
    } else {
        tracing::info!("Index '{}' already exists", backend.index_name());
    }

    Ok(())
}
