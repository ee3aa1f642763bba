use std::path::PathBuf;

use thiserror::Error;
use vsrcheck_recon::ReconError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("cannot serialize settings: {0}")]
    Serialize(String),

    #[error(transparent)]
    Recon(#[from] ReconError),
}
