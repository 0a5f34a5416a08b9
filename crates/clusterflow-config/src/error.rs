use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Looked in:\n\
        - CLUSTERFLOW_CONFIG_PATH\n\
        - current directory: clusterflow.local.yaml, .clusterflow.local.yaml, clusterflow.yaml, .clusterflow.yaml\n\
        - ./.clusterflow/ directory\n\
        - ~/.config/clusterflow/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
