use mdprep::analysis::ss_stats::StatsError;
use mdprep::core::io::{mdp::MdpError, xpm::XpmError};
use mdprep::core::models::params::ParamError;
use mdprep::workflows::recipe::RecipeError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Mdp(#[from] MdpError),

    #[error(transparent)]
    Xpm(#[from] XpmError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
