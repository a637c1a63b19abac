use thiserror::Error;

/// Reasons a solve is refused before any iteration takes place.
///
/// Trouble found while iterating never surfaces here: the engine recovers
/// locally or reports it through [`crate::SolveStatus`] alongside the best
/// roots it has.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("equation has degree 0, there are no roots to find")]
    DegenerateModel,

    #[error("invalid equation: {0}")]
    InvalidModel(String),

    #[error("stated degree {stated} does not match the equation's degree {actual}")]
    DegreeMismatch { stated: usize, actual: usize },

    #[error("invalid solver option: {0}")]
    InvalidContext(&'static str),

    #[error("could not build the worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("unexpected error while solving")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
