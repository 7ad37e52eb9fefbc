use clap::Parser;
use replygraph::Config;
use replygraph::db::{Db, migrate};
use replygraph::graph::ReplyScope;
use replygraph::render::{render_server, HtmlRenderer};
use replygraph::store::list_servers;
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Regenerate interaction graphs from the event store")]
struct Args {
    /// Server to render; omit with --all to render every known server
    server_name: Option<String>,

    /// Render every server present in the store
    #[arg(short, long, conflicts_with = "server_name")]
    all: bool,

    /// Override graph.reply_scope from config.toml
    #[arg(long, value_enum)]
    scope: Option<ReplyScope>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let config = Config::load()?;
    let scope = args.scope.unwrap_or(config.graph.reply_scope);

    let db = Db::new(config.db_path());
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| {
        migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    let servers = match (args.server_name, args.all) {
        (Some(name), _) => vec![name],
        (None, true) => list_servers(&db).await?,
        (None, false) => anyhow::bail!("Pass a server name or --all"),
    };

    if servers.is_empty() {
        log::warn!("No servers found in {}", config.db_path().display());
        return Ok(());
    }

    let renderer = Arc::new(HtmlRenderer::new(config.output_dir()));
    let start = Instant::now();
    let mut errors = 0usize;

    for (idx, server_name) in servers.iter().enumerate() {
        match render_server(&db, renderer.clone(), server_name, scope).await {
            Ok(summary) => println!(
                "[{}/{}] {}: {} nodes, {} edges -> {}",
                idx + 1,
                servers.len(),
                server_name,
                summary.nodes,
                summary.edges,
                summary.path.display()
            ),
            Err(e) => {
                errors += 1;
                log::error!("[{}/{}] {}: {}", idx + 1, servers.len(), server_name, e);
            }
        }
    }

    log::info!(
        "Rendered {} of {} graph(s) in {:.2?}",
        servers.len() - errors,
        servers.len(),
        start.elapsed()
    );

    if errors > 0 {
        anyhow::bail!("{} graph(s) failed to render", errors);
    }
    Ok(())
}
