//! Reserved field names and filter control keys.

/// Reserved document field holding the store-assigned identifier.
pub const DOC_ID: &str = "_id";

/// Human-facing identifier field on model records.
pub const MODEL_ID_FIELD: &str = "id";

/// Reserved filter key carrying an inclusion/exclusion projection document.
pub const PROJECTION_KEY: &str = "projection";

/// Reserved filter key for the number of documents to omit from results.
pub const SKIP_KEY: &str = "skip";

/// Reserved filter key for the maximum number of results (0 = unbounded).
pub const LIMIT_KEY: &str = "limit";
