use thiserror::Error;

/// Errors raised while building or querying a particle population.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SmcError {
    #[error("at least one parameter is required")]
    NoParameters,

    #[error("parameter `{0}` appears more than once")]
    DuplicateParameter(String),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("length of {what} is {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("log weights contain NaN or +inf, or are all -inf")]
    InvalidLogWeights,

    #[error("invalid inference kernel: {0}")]
    InvalidKernel(String),

    #[error("invalid communicator: rank {rank} with size {size}")]
    InvalidCommunicator { rank: usize, size: usize },

    #[error("inference kernel failed")]
    Kernel(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SmcError>;
