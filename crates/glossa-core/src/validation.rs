//! Declarative request validation.
//!
//! Each resource declares a [`RuleTable`]: a static list of fields and the
//! [`Rule`]s that apply to them. A single generic [`validate`] walks the table
//! against the values supplied by a request and collects per-field messages.
//!
//! ```rust
//! use glossa_core::validation::{validate, FieldValue, Mode, TAG_RULES};
//!
//! let errors = validate(TAG_RULES, Mode::Full, &[("name", FieldValue::Text(""))]);
//! assert!(errors.has("name"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// A single constraint on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Must be present and, for text, not blank.
    Required,
    /// Must be present; blank text is accepted.
    Present,
    /// Text length may not exceed this many characters.
    MaxChars(usize),
    /// Text must look like an email address.
    Email,
}

/// Rules attached to one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

/// A static constraint table for a resource.
pub type RuleTable = &'static [FieldRules];

/// How absent fields are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every field in the table is evaluated; absent fields fail `Required`/`Present`.
    Full,
    /// Absent fields are skipped (partial update semantics).
    Partial,
}

/// Value of a field as seen by the validator.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Missing,
    /// Sent as an explicit JSON `null`; checked even in [`Mode::Partial`].
    Null,
    Text(&'a str),
    Id(i64),
    Ids(&'a [i64]),
}

impl<'a> FieldValue<'a> {
    pub fn text(value: Option<&'a str>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Text)
    }

    pub fn id(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Id)
    }

    pub fn ids(value: Option<&'a [i64]>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Ids)
    }

    /// Outer `None` is an absent field, inner `None` an explicit `null`.
    pub fn nullable_text(value: Option<Option<&'a str>>) -> Self {
        match value {
            None => FieldValue::Missing,
            Some(None) => FieldValue::Null,
            Some(Some(text)) => FieldValue::Text(text),
        }
    }

    pub fn nullable_id(value: Option<Option<i64>>) -> Self {
        match value {
            None => FieldValue::Missing,
            Some(None) => FieldValue::Null,
            Some(Some(id)) => FieldValue::Id(id),
        }
    }
}

pub const LOCALE_RULES: RuleTable = &[
    FieldRules {
        field: "code",
        rules: &[Rule::Required, Rule::MaxChars(10)],
    },
    FieldRules {
        field: "name",
        rules: &[Rule::Required, Rule::MaxChars(50)],
    },
];

pub const TAG_RULES: RuleTable = &[FieldRules {
    field: "name",
    rules: &[Rule::Required, Rule::MaxChars(255)],
}];

pub const TRANSLATION_RULES: RuleTable = &[
    FieldRules {
        field: "locale_id",
        rules: &[Rule::Required],
    },
    FieldRules {
        field: "key",
        rules: &[Rule::Required, Rule::MaxChars(255)],
    },
    FieldRules {
        field: "value",
        rules: &[Rule::Required],
    },
];

/// Translation rules used when `ALLOW_EMPTY_VALUES` is enabled.
pub const TRANSLATION_RULES_EMPTY_VALUES: RuleTable = &[
    FieldRules {
        field: "locale_id",
        rules: &[Rule::Required],
    },
    FieldRules {
        field: "key",
        rules: &[Rule::Required, Rule::MaxChars(255)],
    },
    FieldRules {
        field: "value",
        rules: &[Rule::Present],
    },
];

pub const LOGIN_RULES: RuleTable = &[
    FieldRules {
        field: "email",
        rules: &[Rule::Required, Rule::Email],
    },
    FieldRules {
        field: "password",
        rules: &[Rule::Required],
    },
];

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// First message of the first failing field, for one-line summaries.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .next()
            .and_then(|m| m.first())
            .map(String::as_str)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when empty, otherwise `Err(Error::Validation(self))`.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Evaluate `table` against `values`.
///
/// Fields not listed in `values` are treated as [`FieldValue::Missing`].
/// Evaluation of a field stops at its first failing rule.
pub fn validate(table: RuleTable, mode: Mode, values: &[(&str, FieldValue<'_>)]) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for spec in table {
        let value = values
            .iter()
            .find(|(name, _)| *name == spec.field)
            .map(|(_, v)| *v)
            .unwrap_or(FieldValue::Missing);

        if matches!(value, FieldValue::Missing) && mode == Mode::Partial {
            continue;
        }

        for rule in spec.rules {
            if let Some(message) = check(spec.field, *rule, value) {
                errors.add(spec.field, message);
                break;
            }
        }
    }

    errors
}

/// Message for a reference to a row that does not exist.
pub fn invalid_selection(field: &str) -> String {
    format!("The selected {} is invalid.", field)
}

/// Message for a value that collides with a unique column.
pub fn already_taken(field: &str) -> String {
    format!("The {} has already been taken.", field)
}

fn check(field: &str, rule: Rule, value: FieldValue<'_>) -> Option<String> {
    match (rule, value) {
        (Rule::Required, FieldValue::Missing | FieldValue::Null) => {
            Some(format!("The {} field is required.", field))
        }
        (Rule::Required, FieldValue::Text(text)) if text.trim().is_empty() => {
            Some(format!("The {} field is required.", field))
        }
        (Rule::Present, FieldValue::Missing) => Some(format!("The {} field must be present.", field)),
        (Rule::Present, FieldValue::Null) => Some(format!("The {} field must be a string.", field)),
        (Rule::MaxChars(max), FieldValue::Text(text)) if text.chars().count() > max => Some(format!(
            "The {} field must not be greater than {} characters.",
            field, max
        )),
        (Rule::Email, FieldValue::Text(text)) if !looks_like_email(text) => {
            Some(format!("The {} field must be a valid email address.", field))
        }
        _ => None,
    }
}

fn looks_like_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !text.contains(' ')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_missing() {
        let errors = validate(
            TRANSLATION_RULES,
            Mode::Full,
            &[
                ("key", FieldValue::Text("home.title")),
                ("value", FieldValue::Text("Home")),
            ],
        );
        assert!(errors.has("locale_id"));
        assert!(!errors.has("key"));
        assert!(!errors.has("value"));
        assert_eq!(errors.messages("locale_id"), ["The locale_id field is required."]);
    }

    #[test]
    fn test_blank_text_fails_required() {
        let errors = validate(TAG_RULES, Mode::Full, &[("name", FieldValue::Text("   "))]);
        assert!(errors.has("name"));
    }

    #[test]
    fn test_max_chars_counts_characters_not_bytes() {
        // Ten multi-byte characters are within a ten character limit.
        let code = "éééééééééé";
        let errors = validate(
            LOCALE_RULES,
            Mode::Full,
            &[("code", FieldValue::Text(code)), ("name", FieldValue::Text("x"))],
        );
        assert!(errors.is_empty());

        let errors = validate(
            LOCALE_RULES,
            Mode::Full,
            &[
                ("code", FieldValue::Text("abcdefghijk")),
                ("name", FieldValue::Text("x")),
            ],
        );
        assert_eq!(
            errors.messages("code"),
            ["The code field must not be greater than 10 characters."]
        );
    }

    #[test]
    fn test_stops_at_first_failing_rule() {
        let errors = validate(TAG_RULES, Mode::Full, &[]);
        assert_eq!(errors.messages("name").len(), 1);
    }

    #[test]
    fn test_partial_mode_skips_missing_fields() {
        let errors = validate(
            TRANSLATION_RULES,
            Mode::Partial,
            &[("value", FieldValue::Text("New value"))],
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_partial_mode_still_rejects_blank_present_fields() {
        let errors = validate(TRANSLATION_RULES, Mode::Partial, &[("key", FieldValue::Text(""))]);
        assert!(errors.has("key"));
    }

    #[test]
    fn test_partial_mode_rejects_explicit_null() {
        let errors = validate(
            TRANSLATION_RULES,
            Mode::Partial,
            &[
                ("locale_id", FieldValue::nullable_id(Some(None))),
                ("key", FieldValue::nullable_text(None)),
                ("value", FieldValue::nullable_text(Some(Some("v")))),
            ],
        );
        assert_eq!(errors.fields().collect::<Vec<_>>(), ["locale_id"]);
        assert_eq!(errors.messages("locale_id"), ["The locale_id field is required."]);

        let errors = validate(
            TRANSLATION_RULES_EMPTY_VALUES,
            Mode::Partial,
            &[("value", FieldValue::Null)],
        );
        assert_eq!(errors.messages("value"), ["The value field must be a string."]);
    }

    #[test]
    fn test_present_rule_accepts_empty_value() {
        let errors = validate(
            TRANSLATION_RULES_EMPTY_VALUES,
            Mode::Full,
            &[
                ("locale_id", FieldValue::Id(1)),
                ("key", FieldValue::Text("empty.value")),
                ("value", FieldValue::Text("")),
            ],
        );
        assert!(errors.is_empty());

        let errors = validate(
            TRANSLATION_RULES_EMPTY_VALUES,
            Mode::Full,
            &[("locale_id", FieldValue::Id(1)), ("key", FieldValue::Text("k"))],
        );
        assert_eq!(errors.messages("value"), ["The value field must be present."]);
    }

    #[test]
    fn test_email_rule() {
        let ok = validate(
            LOGIN_RULES,
            Mode::Full,
            &[
                ("email", FieldValue::Text("test@example.com")),
                ("password", FieldValue::Text("secret")),
            ],
        );
        assert!(ok.is_empty());

        let bad = validate(
            LOGIN_RULES,
            Mode::Full,
            &[
                ("email", FieldValue::Text("not-an-email")),
                ("password", FieldValue::Text("secret")),
            ],
        );
        assert!(bad.has("email"));
    }

    #[test]
    fn test_reference_messages() {
        assert_eq!(invalid_selection("tags.1"), "The selected tags.1 is invalid.");
        assert_eq!(already_taken("code"), "The code has already been taken.");
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::default().into_result().is_ok());

        let mut errors = ValidationErrors::default();
        errors.add("tags.0", "The selected tags.0 is invalid.");
        assert!(matches!(errors.into_result(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_serializes_as_field_map() {
        let mut errors = ValidationErrors::default();
        errors.add("key", "The key field is required.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "key": ["The key field is required."] }));
    }

    #[test]
    fn test_merge_and_display() {
        let mut a = ValidationErrors::default();
        a.add("code", "taken");
        let mut b = ValidationErrors::default();
        b.add("name", "too long");
        a.merge(b);
        assert_eq!(a.to_string(), "code: taken; name: too long");
        assert_eq!(a.first_message(), Some("taken"));
        assert_eq!(a.fields().collect::<Vec<_>>(), ["code", "name"]);
    }
}
