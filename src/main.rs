use replygraph::Config;
use replygraph::bot::run_bot;
use replygraph::db::{Db, migrate};
use replygraph::http::HttpServer;
use replygraph::render::{GraphRenderer, HtmlRenderer};
use std::sync::Arc;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => run_http_server().await?,
        "bot" => run_listener().await?,
        "run" => run_all().await?,
        _ => run_schema_verification().await?,
    }

    Ok(())
}

/// Load config and bring the event store schema up to date
async fn init_store() -> Result<(Config, Db)> {
    let config = Config::load()?;
    log::info!("Configuration loaded (database: {})", config.db_path().display());

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    Ok((config, db))
}

fn build_http_server(config: &Config, db: Db) -> HttpServer {
    let renderer: Arc<dyn GraphRenderer> = Arc::new(HtmlRenderer::new(config.output_dir()));
    HttpServer::new(
        db,
        renderer,
        config.graph.reply_scope,
        config.http_server.allowed_origins.clone(),
    )
}

/// Run the HTTP facade
async fn run_http_server() -> Result<()> {
    log::info!("Starting replygraph HTTP server v{}", env!("CARGO_PKG_VERSION"));
    let (config, db) = init_store().await?;

    build_http_server(&config, db).run(config.http_server.port).await?;
    Ok(())
}

/// Run the Discord ingestion listener
async fn run_listener() -> Result<()> {
    log::info!("Starting replygraph listener v{}", env!("CARGO_PKG_VERSION"));
    let (config, db) = init_store().await?;
    let token = config.discord_token()?;

    run_bot(db, &token).await?;
    Ok(())
}

/// Run listener and HTTP facade in one process
async fn run_all() -> Result<()> {
    log::info!("Starting replygraph v{} (listener + HTTP)", env!("CARGO_PKG_VERSION"));
    let (config, db) = init_store().await?;
    let token = config.discord_token()?;

    let server = build_http_server(&config, db.clone());
    tokio::try_join!(
        run_bot(db, &token),
        server.run(config.http_server.port),
    )?;
    Ok(())
}

/// Migrate and verify the event store schema
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting replygraph v{}", env!("CARGO_PKG_VERSION"));
    let (_config, db) = init_store().await?;

    db.with_connection(|conn| migrate::verify_schema(conn)).await?;

    log::info!("✓ Event store schema verification complete");
    Ok(())
}
