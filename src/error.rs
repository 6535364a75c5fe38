use crate::config::ConfigError;

/// Errors raised while building a [`Renderer`](crate::Renderer). Rendering itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The tag-name matcher could not be compiled.
    #[error("Tag pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
