use rowgrid::app;
use std::env;
use std::path::PathBuf;

/// Entry point for the grid editor server
///
/// Configuration comes from the environment:
/// * `PORT` - listening port (default 8000)
/// * `DB_PATH` - location of the JSON database file (default
///   `database/store.json`)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let db_path = PathBuf::from(
        env::var("DB_PATH").unwrap_or_else(|_| "database/store.json".to_string()),
    );

    app::run(port, &db_path).await
}
