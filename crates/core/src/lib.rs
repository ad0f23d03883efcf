mod address;
mod distance;
mod error;
mod record;
mod remote;
mod store;
mod view;
mod vocab;

pub use address::{decode, encode};
pub use distance::distance;
pub use error::{Result, TrackError};
pub use record::{Metrics, NameRow, PostRow, Record, TagRow, DATE_FMT};
pub use remote::{RemoteFeed, RemoteItem};
pub use store::{RecordKey, RecordStore, SyncOutcome};
pub use view::{
    truncate, ListEntry, ListingRow, PagedView, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
pub use vocab::{
    normalize_term, Resolution, TagMeta, TaxonomyRow, TermCheck, VocabularyGate, SUGGESTION_COUNT,
};
