//! Classification of PostgreSQL constraint violations.

use glossa_core::validation::{already_taken, invalid_selection};
use glossa_core::Error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a sqlx error to the domain error it represents.
///
/// Unique and foreign-key violations on known constraints become
/// `Conflict`/`Validation`; everything else stays `Database`.
pub(crate) fn classify(err: sqlx::Error) -> Error {
    let classified = match &err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            match (code.as_deref(), db.constraint()) {
                (Some(UNIQUE_VIOLATION), Some("translation_locale_key_unique")) => {
                    Some(Error::duplicate_key())
                }
                (Some(UNIQUE_VIOLATION), Some("locale_code_unique")) => {
                    Some(Error::invalid_field("code", already_taken("code")))
                }
                (Some(UNIQUE_VIOLATION), Some("tag_name_unique")) => {
                    Some(Error::invalid_field("name", already_taken("name")))
                }
                (Some(UNIQUE_VIOLATION), Some("app_user_email_unique")) => {
                    Some(Error::invalid_field("email", already_taken("email")))
                }
                (Some(FOREIGN_KEY_VIOLATION), Some("translation_locale_id_fkey")) => {
                    Some(Error::invalid_field("locale_id", invalid_selection("locale_id")))
                }
                (Some(FOREIGN_KEY_VIOLATION), Some("translation_tag_tag_id_fkey")) => {
                    Some(Error::invalid_field("tags", invalid_selection("tags")))
                }
                _ => None,
            }
        }
        _ => None,
    };
    classified.unwrap_or(Error::Database(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = classify(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(sqlx::Error::RowNotFound)));
    }
}
