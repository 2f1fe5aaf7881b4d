//! Service layer: date resolution, identity, classification, ingestion and
//! queries over the activity store.

pub mod classify;
pub mod date_detection;
pub mod export;
pub mod ingest;
pub mod query;
pub mod stable_id;

pub use classify::{
    classify, ActivityStatus, Classification, DayBoundary, Thresholds, TimeRangeError, TimeWindow,
};
pub use date_detection::{
    detect_event_date, extract_candidates, parse_timestamp, resolve_event_date, DateCandidate,
    DateResolution, Notation,
};
pub use ingest::{prepare_activity, IngestError, IngestRunner, IngestStats, RecordError};
pub use query::{ClassifiedActivity, QueryError, QueryKind, QueryResult, TemporalQueryEngine};
pub use stable_id::{resolve_stable_id, StableId};
