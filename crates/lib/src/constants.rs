//! Constants used throughout the crate.

/// Top-level collection holding one document per user.
pub const USERS_COLLECTION: &str = "users";

/// Per-user collection holding the generic key/value documents.
pub const DATA_COLLECTION: &str = "data";

/// Per-user collection holding one document per lesson.
pub const PROGRESS_COLLECTION: &str = "progress";

/// Document field carrying the caller-supplied value.
pub const VALUE_FIELD: &str = "value";

/// Document field stamped by the store on every merge write.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Session key for the lesson progress map.
pub const PROGRESS_KEY: &str = "progress";

/// Session key for the streak counter.
pub const STREAK_KEY: &str = "studyStreak";

/// Session key for the last local study date (`YYYY-MM-DD`).
pub const LAST_STUDY_DATE_KEY: &str = "lastStudyDate";

/// Session key for the user profile blob.
pub const USER_PROFILE_KEY: &str = "userProfile";

/// Maximum accepted text length for the speech and translation proxies.
pub const MAX_PROXY_TEXT_LEN: usize = 5000;
