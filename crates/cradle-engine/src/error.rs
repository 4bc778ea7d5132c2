//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup, the run, and
//! the shutdown save.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cradle_core::config::ConfigError,
    },

    /// The world rejected a spawned agent.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: cradle_core::world::WorldError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: cradle_core::runner::RunnerError,
    },

    /// Reading or writing the save file failed.
    #[error("persist error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: cradle_core::persist::PersistError,
    },

    /// Population spawning failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
