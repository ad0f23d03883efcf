use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("no record under key '{0}'")]
    NotFound(String),
    #[error("remote feed unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("invalid page address '{0}'")]
    BadAddress(String),
    #[error("address '{addr}' is rank {rank}, but the current page has {page_len} items")]
    AddressOutOfRange {
        addr: String,
        rank: u64,
        page_len: usize,
    },
    #[error("page size {0} is outside the allowed range 5..100")]
    PageSizeOutOfRange(usize),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;
