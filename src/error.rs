use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The cancel flag was raised while clusters were being reconciled.
    /// Nothing from the pass should be rendered.
    #[error("layout pass cancelled")]
    Cancelled,
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
}
