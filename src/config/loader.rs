use super::types::Config;

/// Load configuration: `config.json` (or the file named by
/// `RANK_RALLY_CONFIG`) if present, otherwise code defaults, then a small
/// set of environment overrides on top.
///
/// Logging is not initialized yet when this runs, so problems go to stderr.
pub fn load() -> Config {
    let path =
        std::env::var("RANK_RALLY_CONFIG").unwrap_or_else(|_| "config.json".to_string());

    let mut config = match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<Config>(&contents) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Failed to parse {path}: {error}; using defaults");
                Config::default()
            }
        },
        Err(_) => Config::default(),
    };

    apply_env_overrides(&mut config);
    config
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(port) = std::env::var("PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.port = port,
            Err(_) => eprintln!("Ignoring non-numeric PORT override: {port}"),
        }
    }
    if let Ok(url) = std::env::var("ITEM_STORE_URL") {
        if !url.trim().is_empty() {
            config.providers.item_store_url = Some(url);
        }
    }
    if let Ok(url) = std::env::var("EMOJI_SERVICE_URL") {
        if !url.trim().is_empty() {
            config.providers.emoji_service_url = Some(url);
        }
    }
}
