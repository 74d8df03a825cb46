pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Metrics(#[from] stampede_metrics::Error),

    #[error("`stages` must be a non-empty array of {{ duration, target }}")]
    InvalidStages,

    #[error("stage {index} has a zero duration")]
    ZeroDurationStage { index: usize },

    #[error("total stage duration is too long (stage {index} overflows the run clock)")]
    StagesTooLong { index: usize },

    #[error("at least one scenario is required")]
    NoScenarios,

    #[error("scenario name must not be empty")]
    EmptyScenarioName,

    #[error("duplicate scenario name `{0}`")]
    DuplicateScenario(String),

    #[error(
        "scenario `{name}` has an invalid weight {weight} (expected a positive, finite number with a finite sum across scenarios)"
    )]
    InvalidWeight { name: String, weight: f64 },

    #[error("invalid think time: min {min:?} is greater than max {max:?}")]
    InvalidThinkTime {
        min: std::time::Duration,
        max: std::time::Duration,
    },

    #[error("invalid threshold expression for metric `{metric}`: {error}")]
    InvalidThreshold { metric: String, error: String },

    #[error("invalid base url `{0}` (expected http://host[:port][/path])")]
    InvalidBaseUrl(String),

    #[error("`tick` must be a positive duration")]
    InvalidTick,

    #[error("`request_timeout` must be a positive duration")]
    InvalidRequestTimeout,
}
