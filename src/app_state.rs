use crate::cli::CommandLineArgs;
use crate::data_source::OpenMeteoClient;
use crate::error::WeatherStatsError;
use crate::resource_manager::ResourceManager;
use crate::storage::SledStore;

use expanduser::expanduser;
use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Resource manager.
    pub resource_manager: ResourceManager,

    /// Reading store.
    pub store: SledStore,

    /// Weather service client used by ingestion.
    pub source: OpenMeteoClient,
}

impl AppState {
    /// Create and return an [AppState], opening the database at `args.database_path`.
    pub fn new(args: &CommandLineArgs) -> Result<Self, WeatherStatsError> {
        let path = expanduser(&args.database_path).map_err(sled::Error::Io)?;
        let store = SledStore::open(path)?;
        Ok(Self::with_store(args, store))
    }

    /// Create and return an [AppState] using an already opened store.
    pub fn with_store(args: &CommandLineArgs, store: SledStore) -> Self {
        let resource_manager =
            ResourceManager::new(args.upstream_connection_limit, Some(task_limit(args)));
        Self {
            args: args.clone(),
            resource_manager,
            store,
            source: OpenMeteoClient::from_args(args),
        }
    }
}

/// Number of concurrent aggregation tasks, defaulting to one less than the number of CPUs.
pub fn task_limit(args: &CommandLineArgs) -> usize {
    args.task_limit
        .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
        .max(1)
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
