use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// One recognized filter field: identity is `name`, `description` is shown
/// next to the field in the suggestion overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub description: String,
}

/// Ordered, immutable set of fields one filter bar recognizes. Supplied once
/// per widget instance; an empty catalog accepts any field name and offers
/// no suggestions.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    names: Vec<String>,
}

const SUGGESTION_LIMIT: usize = 5;

impl FieldCatalog {
    pub fn field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        self.names.push(name.clone());
        self.fields.push(FieldDescriptor {
            name,
            description: description.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Candidate fields for the suggestion overlay: the first five catalog
    /// entries in catalog order, no relevance ranking.
    pub fn suggestions(&self) -> &[FieldDescriptor] {
        &self.fields[..self.fields.len().min(SUGGESTION_LIMIT)]
    }

    /// Prompt text shown while the input is empty.
    pub fn placeholder(&self) -> String {
        if self.names.is_empty() {
            "Filter".to_string()
        } else {
            format!("Filter by {}", self.names.join(", "))
        }
    }
}

/// One `field:value` predicate extracted from a filter query. The value is
/// the raw matched text with surrounding quotes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub field: String,
    pub value: String,
}

/// Successful parse outcome: predicates sorted by field name plus the query
/// text that produced them. Duplicate fields are legal and all kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub fields: Vec<FieldValue>,
    pub query: String,
}

impl ParsedQuery {
    /// Structural equality used for change detection: same pairs in the same
    /// sorted order, independent of the query text.
    pub fn same_fields(&self, other: &ParsedQuery) -> bool {
        self.fields == other.fields
    }
}

/// User-correctable parse failures. Neither aborts the application; the
/// caller keeps the input open so the query can be fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("\"{field}\" is not a valid filter field (expected one of: {allowed})")]
    UnknownField { field: String, allowed: String },
    #[error("missing closing quote in the value for \"{field}\"")]
    QuoteMismatch { field: String },
}

static FIELD_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" ([A-Za-z0-9\s-]+):[ \t]*").expect("field segment pattern is valid")
});

/// Parses a free-text query into `field:value` predicates.
///
/// Field segments are `name:` tokens preceded by a space (the query is
/// padded with one leading space so a segment at position zero still
/// matches). Field names are normalized to camelCase before validation
/// against `allowed`; an empty `allowed` slice accepts every name. Values
/// run to the next field segment and may be single- or double-quoted to
/// carry spaces and colons. Predicates with empty values are dropped.
pub fn parse(query: &str, allowed: &[String]) -> Result<ParsedQuery, QueryError> {
    let padded = format!(" {query}");
    let matches = FIELD_SEGMENT.captures_iter(&padded).collect::<Vec<_>>();

    let mut fields = Vec::new();
    for (index, segment) in matches.iter().enumerate() {
        let raw = segment
            .get(1)
            .map(|group| group.as_str())
            .unwrap_or_default();
        let field = normalize_field_name(raw);
        if !allowed.is_empty() && !allowed.iter().any(|name| name == &field) {
            return Err(QueryError::UnknownField {
                field,
                allowed: allowed.join(", "),
            });
        }

        let span_start = segment
            .get(0)
            .map(|whole| whole.end())
            .unwrap_or_default();
        let span_end = matches
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map(|whole| whole.start())
            .unwrap_or(padded.len());
        let value = extract_value(&padded[span_start..span_end], &field)?;
        if !value.is_empty() {
            fields.push(FieldValue { field, value });
        }
    }

    fields.sort_by(|left, right| left.field.cmp(&right.field));
    Ok(ParsedQuery {
        fields,
        query: query.to_string(),
    })
}

/// Canonical form of a raw field token: trimmed, internal whitespace runs
/// collapsed to single hyphens, then hyphen-lowercase pairs beyond position
/// zero camel-cased (`last connected` and `last-connected` both become
/// `lastConnected`). Already-canonical names pass through unchanged.
pub fn normalize_field_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join("-");

    let mut name = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    let mut position = 0usize;
    while let Some(ch) = chars.next() {
        if position > 0
            && ch == '-'
            && let Some(next) = chars.peek().copied()
            && next.is_ascii_lowercase()
        {
            chars.next();
            name.push(next.to_ascii_uppercase());
            position += 2;
            continue;
        }
        name.push(ch);
        position += 1;
    }
    name
}

fn extract_value(span: &str, field: &str) -> Result<String, QueryError> {
    let trimmed = span.trim_start();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(quote @ ('\'' | '"')) => {
            let rest = chars.as_str();
            match rest.find(quote) {
                Some(end) => Ok(rest[..end].to_string()),
                None => Err(QueryError::QuoteMismatch {
                    field: field.to_string(),
                }),
            }
        }
        _ => Ok(trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldCatalog, FieldValue, ParsedQuery, QueryError, normalize_field_name, parse};

    fn allowed(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn pairs(parsed: &ParsedQuery) -> Vec<(&str, &str)> {
        parsed
            .fields
            .iter()
            .map(|pair| (pair.field.as_str(), pair.value.as_str()))
            .collect()
    }

    #[test]
    fn empty_query_parses_to_empty_result() {
        let parsed = parse("", &allowed(&["name"])).expect("empty query parses");
        assert!(parsed.fields.is_empty());
        assert_eq!(parsed.query, "");
    }

    #[test]
    fn single_predicate_is_extracted() {
        let parsed = parse("name: backend", &allowed(&["name"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "backend")]);
    }

    #[test]
    fn predicate_without_space_after_colon_is_extracted() {
        let parsed = parse("name:backend", &allowed(&["name"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "backend")]);
    }

    #[test]
    fn predicates_are_sorted_by_field_name() {
        let parsed = parse("zone: east name: backend", &allowed(&["name", "zone"]))
            .expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "backend"), ("zone", "east")]);
        assert_eq!(parsed.query, "zone: east name: backend");
    }

    #[test]
    fn duplicate_fields_are_all_kept() {
        let parsed = parse("zone: east zone: west", &allowed(&["zone"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("zone", "east"), ("zone", "west")]);
    }

    #[test]
    fn unknown_field_fails_and_lists_allowed_fields_in_order() {
        let error = parse("color: red", &allowed(&["name", "zone"])).unwrap_err();
        assert_eq!(
            error,
            QueryError::UnknownField {
                field: "color".to_string(),
                allowed: "name, zone".to_string(),
            }
        );
        let message = error.to_string();
        assert!(message.contains("color"));
        assert!(message.contains("name, zone"));
    }

    #[test]
    fn one_invalid_field_invalidates_the_whole_query() {
        let error = parse("name: backend color: red", &allowed(&["name", "zone"])).unwrap_err();
        assert!(matches!(error, QueryError::UnknownField { field, .. } if field == "color"));
    }

    #[test]
    fn empty_allowed_set_accepts_any_field() {
        let parsed = parse("anything: goes", &[]).expect("parses");
        assert_eq!(pairs(&parsed), vec![("anything", "goes")]);
    }

    #[test]
    fn double_quoted_value_keeps_spaces() {
        let parsed = parse("name: \"john smith\"", &allowed(&["name"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "john smith")]);
    }

    #[test]
    fn single_quoted_value_keeps_colons() {
        let parsed = parse("tag: 'kuma.io/service: backend'", &allowed(&["tag"]))
            .expect("parses");
        assert_eq!(pairs(&parsed), vec![("tag", "kuma.io/service: backend")]);
    }

    #[test]
    fn unterminated_quote_reports_the_field() {
        let error = parse("name: \"unterminated", &allowed(&["name"])).unwrap_err();
        assert_eq!(
            error,
            QueryError::QuoteMismatch {
                field: "name".to_string(),
            }
        );
        assert!(error.to_string().contains("name"));
    }

    #[test]
    fn unquoted_value_is_the_first_word() {
        let parsed = parse("name: backend extra words", &allowed(&["name"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "backend")]);
    }

    #[test]
    fn empty_value_is_dropped_silently() {
        let parsed = parse("name:", &allowed(&["name"])).expect("parses");
        assert!(parsed.fields.is_empty());

        let parsed = parse("name: zone: east", &allowed(&["name", "zone"])).expect("parses");
        assert_eq!(pairs(&parsed), vec![("name", "zone:")]);
    }

    #[test]
    fn multi_word_field_names_are_camel_cased() {
        let parsed = parse("last connected: today", &allowed(&["lastConnected"]))
            .expect("parses");
        assert_eq!(pairs(&parsed), vec![("lastConnected", "today")]);
    }

    #[test]
    fn normalization_is_idempotent_on_canonical_names() {
        assert_eq!(normalize_field_name("lastConnected"), "lastConnected");
        assert_eq!(normalize_field_name("name"), "name");
    }

    #[test]
    fn normalization_collapses_whitespace_and_camel_cases() {
        assert_eq!(normalize_field_name("last   connected"), "lastConnected");
        assert_eq!(normalize_field_name(" last-connected "), "lastConnected");
        assert_eq!(normalize_field_name("zone cp version"), "zoneCpVersion");
    }

    #[test]
    fn normalization_leaves_position_zero_intact() {
        assert_eq!(normalize_field_name("-name"), "-name");
    }

    #[test]
    fn parse_is_deterministic() {
        let fields = allowed(&["name", "zone"]);
        let first = parse("zone: east name: backend", &fields).expect("parses");
        let second = parse("zone: east name: backend", &fields).expect("parses");
        assert_eq!(first, second);
    }

    #[test]
    fn structural_equality_ignores_query_text() {
        let left = ParsedQuery {
            fields: vec![FieldValue {
                field: "name".to_string(),
                value: "backend".to_string(),
            }],
            query: "name: backend".to_string(),
        };
        let right = ParsedQuery {
            fields: left.fields.clone(),
            query: "name:backend".to_string(),
        };
        assert!(left.same_fields(&right));
    }

    #[test]
    fn suggestions_are_truncated_to_five_in_catalog_order() {
        let catalog = FieldCatalog::default()
            .field("a", "")
            .field("b", "")
            .field("c", "")
            .field("d", "")
            .field("e", "")
            .field("f", "");
        let names = catalog
            .suggestions()
            .iter()
            .map(|field| field.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn placeholder_joins_field_names() {
        let catalog = FieldCatalog::default().field("name", "").field("zone", "");
        assert_eq!(catalog.placeholder(), "Filter by name, zone");
        assert_eq!(FieldCatalog::default().placeholder(), "Filter");
    }
}
