use crate::metrics::MetricKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("metric name must not be empty")]
    EmptyName,

    #[error("metric `{name}` is registered as {registered}, not {requested}")]
    KindMismatch {
        name: String,
        registered: MetricKind,
        requested: MetricKind,
    },

    #[error("metric `{name}` received a non-finite value")]
    NonFiniteValue { name: String },
}
