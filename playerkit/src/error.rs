use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Invalid player configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
