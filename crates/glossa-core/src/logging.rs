//! Structured logging field names shared by every glossa crate.
//!
//! Log aggregators query on these names. Event macros spell the field
//! inline (`subsystem = "api"`); code that fills a span field after the
//! fact goes through `Span::record` with the constants below.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied (e.g. cache down) |
//! | INFO  | Lifecycle events (startup, shutdown), write completions |
//! | DEBUG | Decision points, cache hit/miss, config choices |
//! | TRACE | Per-row iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID attached to every request span. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "cache", "auth", "seed"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "translations", "export_cache", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "search", "export", "invalidate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

pub const TRANSLATION_ID: &str = "translation_id";

pub const LOCALE_ID: &str = "locale_id";

/// Locale code, e.g. "en".
pub const LOCALE_CODE: &str = "locale_code";

pub const TAG_ID: &str = "tag_id";

pub const USER_ID: &str = "user_id";

/// Export cache key being read, written or evicted.
pub const CACHE_KEY: &str = "cache_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a search or export.
pub const RESULT_COUNT: &str = "result_count";

/// Total matching rows across all pages.
pub const TOTAL: &str = "total";

/// Rows written by a bulk operation.
pub const ROW_COUNT: &str = "row_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Maximum connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether an export was served from cache.
pub const CACHE_HIT: &str = "cache_hit";

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let all = [
            REQUEST_ID,
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            TRANSLATION_ID,
            LOCALE_ID,
            LOCALE_CODE,
            TAG_ID,
            USER_ID,
            CACHE_KEY,
            DURATION_MS,
            RESULT_COUNT,
            TOTAL,
            ROW_COUNT,
            POOL_SIZE,
            DB_TABLE,
            CACHE_HIT,
            SUCCESS,
            ERROR_MSG,
        ];
        let mut seen = std::collections::HashSet::new();
        for name in all {
            assert!(seen.insert(name), "duplicate field name {}", name);
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
