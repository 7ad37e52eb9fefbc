use replygraph::{config::Config, db::Db, store::server_stats};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    println!("\n=== replygraph Event Store Statistics ===\n");

    let stats = server_stats(&db).await?;

    if stats.is_empty() {
        println!("No messages recorded yet.");
        println!("\nStart the listener with `replygraph bot` to collect activity.");
        return Ok(());
    }

    println!("{:-<100}", "");
    println!(
        "{:<30} {:>10} {:>8} {:>12} {:>20} {:>20}",
        "Server", "Messages", "Authors", "Replies", "First", "Last"
    );
    println!("{:-<100}", "");

    for s in &stats {
        println!(
            "{:<30} {:>10} {:>8} {:>12} {:>20} {:>20}",
            s.server_name,
            s.messages,
            s.authors,
            s.interactions,
            s.first_message_at.as_deref().unwrap_or("-"),
            s.last_message_at.as_deref().unwrap_or("-"),
        );
    }
    println!("{:-<100}", "");

    let total_messages: i64 = stats.iter().map(|s| s.messages).sum();
    let total_replies: i64 = stats.iter().map(|s| s.interactions).sum();
    println!("\nTotals:");
    println!("  Servers: {}", stats.len());
    println!("  Messages: {}", total_messages);
    println!("  Replies: {}", total_replies);
    if total_messages > 0 {
        println!(
            "  Reply ratio: {:.1}%",
            total_replies as f64 * 100.0 / total_messages as f64
        );
    }
    println!();

    Ok(())
}
