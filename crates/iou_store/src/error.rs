use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("diesel error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored {field} could not be decoded: {reason}")]
    Decode { field: &'static str, reason: String },
}

impl Error {
    pub(crate) fn decode(field: &'static str) -> impl FnOnce(String) -> Error {
        move |reason| Error::Decode { field, reason }
    }
}

/// Parses a column stored as text back into its domain type.
pub(crate) fn parse<T>(field: &'static str, s: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| e.to_string())
        .map_err(Error::decode(field))
}
