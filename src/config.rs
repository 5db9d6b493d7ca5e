use std::env;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub max_connections: u32,
}

impl Config {
  pub fn from_env() -> Result<Self, String> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let database_url = env::var("DATABASE_URL")
      .unwrap_or_else(|_| "sqlite:vocalog.db?mode=rwc".to_string());

    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
      .unwrap_or_else(|_| "5".to_string())
      .parse()
      .map_err(|e| format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e))?;

    Ok(Self {
      database_url,
      max_connections,
    })
  }
}
