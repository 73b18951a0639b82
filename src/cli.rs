//! Command Line Interface (CLI) arguments.

use clap::Parser;
use url::Url;

/// Weather statistics server command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "WEATHER_STATS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "WEATHER_STATS_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "WEATHER_STATS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/weather-stats/certs/cert.pem",
        env = "WEATHER_STATS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/weather-stats/certs/key.pem",
        env = "WEATHER_STATS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "WEATHER_STATS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "WEATHER_STATS_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Whether to use Rayon for execution of CPU-bound tasks.
    #[arg(long, default_value_t = false, env = "WEATHER_STATS_USE_RAYON")]
    pub use_rayon: bool,
    /// Path of the reading database
    #[arg(
        long,
        default_value = "~/.local/share/weather-stats/db",
        env = "WEATHER_STATS_DATABASE_PATH"
    )]
    pub database_path: String,
    /// Geocoding search endpoint
    #[arg(
        long,
        default_value = "https://geocoding-api.open-meteo.com/v1/search",
        env = "WEATHER_STATS_GEOCODING_URL"
    )]
    pub geocoding_url: Url,
    /// Historical archive endpoint
    #[arg(
        long,
        default_value = "https://archive-api.open-meteo.com/v1/archive",
        env = "WEATHER_STATS_ARCHIVE_URL"
    )]
    pub archive_url: Url,
    /// Language of geocoding results
    #[arg(long, default_value = "es", env = "WEATHER_STATS_LANGUAGE")]
    pub language: String,
    /// Timezone in which hourly timestamps are requested
    #[arg(long, default_value = "Europe/Madrid", env = "WEATHER_STATS_TIMEZONE")]
    pub timezone: String,
    /// Maximum number of concurrent connections to the weather service
    #[arg(long, env = "WEATHER_STATS_UPSTREAM_CONNECTION_LIMIT")]
    pub upstream_connection_limit: Option<usize>,
    /// Maximum number of concurrent aggregation tasks. Defaults to the number of CPUs minus one.
    #[arg(long, env = "WEATHER_STATS_TASK_LIMIT")]
    pub task_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
