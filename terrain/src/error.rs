use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("profile needs at least two elevation samples, got {0}")]
    TooFewSamples(usize),

    #[error("profile step must be positive, got {0}")]
    NonPositiveStep(f64),

    #[error("elevation sample {0} is not finite")]
    NonFiniteSample(usize),
}
