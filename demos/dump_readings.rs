// Dump the most recent miner readings as JSON.
//
// Usage: cargo run --example dump_readings -- [DB_PATH] [LIMIT]
//   DB_PATH  default: ./data/miners.db
//   LIMIT    default: 10

use minerhist::history_repo::HistoryRepo;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/miners.db");
    let limit: u32 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let repo = HistoryRepo::connect(path, 2, 90).await?;
    let readings = repo.recent_readings(limit).await?;

    println!("{}", serde_json::to_string_pretty(&readings)?);
    Ok(())
}
