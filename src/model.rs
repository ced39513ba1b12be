use crate::query::FieldValue;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceTab {
    Meshes,
    Zones,
    Dataplanes,
    Services,
    Policies,
}

impl ResourceTab {
    pub const ALL: [Self; 5] = [
        Self::Meshes,
        Self::Zones,
        Self::Dataplanes,
        Self::Services,
        Self::Policies,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Meshes => "Meshes",
            Self::Zones => "Zones",
            Self::Dataplanes => "Dataplanes",
            Self::Services => "Services",
            Self::Policies => "Policies",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "m" | "mesh" | "meshes" => Some(Self::Meshes),
            "z" | "zone" | "zones" => Some(Self::Zones),
            "dp" | "dpp" | "dataplane" | "dataplanes" | "data-plane" | "data-planes"
            | "proxy" | "proxies" => Some(Self::Dataplanes),
            "svc" | "service" | "services" => Some(Self::Services),
            "pol" | "policy" | "policies" => Some(Self::Policies),
            _ => None,
        }
    }

}

#[derive(Debug, Clone, Default)]
pub struct RowData {
    pub name: String,
    pub mesh: Option<String>,
    pub columns: Vec<String>,
    /// Matchable `(field, value)` facts about this row; `tag` entries carry
    /// one `key:value` string per tag.
    pub attributes: Vec<(String, String)>,
    pub detail: String,
}

impl RowData {
    /// Applies parsed filter predicates: every distinct field must match,
    /// and within one field any of its values may match.
    pub fn matches(&self, predicates: &[FieldValue]) -> bool {
        if predicates.is_empty() {
            return true;
        }

        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for predicate in predicates {
            grouped
                .entry(predicate.field.as_str())
                .or_default()
                .push(predicate.value.as_str());
        }

        grouped.iter().all(|(field, wanted)| {
            wanted
                .iter()
                .any(|value| self.attribute_matches(field, value))
        })
    }

    fn attribute_matches(&self, field: &str, wanted: &str) -> bool {
        self.attributes
            .iter()
            .filter(|(name, _)| name == field)
            .any(|(_, attr)| {
                if field == "tag" {
                    tag_matches(attr, wanted)
                } else {
                    contains_ignore_case(attr, wanted)
                }
            })
    }
}

/// Tag predicates may be written `key:value` or `key: value`; the key must
/// match exactly and the value by substring. A bare word matches anywhere in
/// the rendered tag.
fn tag_matches(attr: &str, wanted: &str) -> bool {
    match wanted.split_once(':') {
        Some((key, value)) => {
            let Some((attr_key, attr_value)) = attr.split_once(':') else {
                return false;
            };
            attr_key.trim().eq_ignore_ascii_case(key.trim())
                && contains_ignore_case(attr_value.trim(), value.trim())
        }
        None => contains_ignore_case(attr, wanted),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<RowData>,
    pub selected: usize,
    pub last_refreshed: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl TableData {
    pub fn set_rows(
        &mut self,
        headers: Vec<String>,
        rows: Vec<RowData>,
        refreshed_at: DateTime<Local>,
    ) {
        self.headers = headers;
        self.rows = rows;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<Local>) {
        self.rows.clear();
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
        self.selected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{ResourceTab, RowData};
    use crate::query::FieldValue;

    fn predicate(field: &str, value: &str) -> FieldValue {
        FieldValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    fn dataplane_row() -> RowData {
        RowData {
            name: "backend-7df6".to_string(),
            mesh: Some("default".to_string()),
            columns: Vec::new(),
            attributes: vec![
                ("name".to_string(), "backend-7df6".to_string()),
                ("mesh".to_string(), "default".to_string()),
                ("zone".to_string(), "east".to_string()),
                ("service".to_string(), "backend".to_string()),
                ("protocol".to_string(), "http".to_string()),
                ("status".to_string(), "Online".to_string()),
                ("lastConnected".to_string(), "2026-02-11 09:14".to_string()),
                ("tag".to_string(), "kuma.io/service:backend".to_string()),
                ("tag".to_string(), "kuma.io/zone:east".to_string()),
                ("tag".to_string(), "version:v2".to_string()),
            ],
            detail: String::new(),
        }
    }

    #[test]
    fn resource_aliases_map_to_expected_tabs() {
        assert_eq!(ResourceTab::from_token("dp"), Some(ResourceTab::Dataplanes));
        assert_eq!(
            ResourceTab::from_token("data-planes"),
            Some(ResourceTab::Dataplanes)
        );
        assert_eq!(ResourceTab::from_token("svc"), Some(ResourceTab::Services));
        assert_eq!(ResourceTab::from_token("MESHES"), Some(ResourceTab::Meshes));
        assert_eq!(ResourceTab::from_token("pol"), Some(ResourceTab::Policies));
        assert_eq!(ResourceTab::from_token("nope"), None);
    }

    #[test]
    fn empty_predicates_match_everything() {
        assert!(dataplane_row().matches(&[]));
    }

    #[test]
    fn predicates_across_fields_are_conjunctive() {
        let row = dataplane_row();
        assert!(row.matches(&[predicate("zone", "east"), predicate("protocol", "http")]));
        assert!(!row.matches(&[predicate("zone", "east"), predicate("protocol", "grpc")]));
    }

    #[test]
    fn duplicate_field_predicates_are_disjunctive() {
        let row = dataplane_row();
        assert!(row.matches(&[predicate("zone", "west"), predicate("zone", "east")]));
        assert!(!row.matches(&[predicate("zone", "west"), predicate("zone", "north")]));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let row = dataplane_row();
        assert!(row.matches(&[predicate("name", "BACKEND")]));
        assert!(row.matches(&[predicate("lastConnected", "09:14")]));
    }

    #[test]
    fn tag_predicates_match_key_and_value() {
        let row = dataplane_row();
        assert!(row.matches(&[predicate("tag", "kuma.io/service: backend")]));
        assert!(row.matches(&[predicate("tag", "kuma.io/service:backend")]));
        assert!(row.matches(&[predicate("tag", "version:v2")]));
        assert!(!row.matches(&[predicate("tag", "kuma.io/service: frontend")]));
        assert!(!row.matches(&[predicate("tag", "version:backend")]));
    }

    #[test]
    fn bare_tag_predicate_matches_anywhere_in_the_tag() {
        let row = dataplane_row();
        assert!(row.matches(&[predicate("tag", "east")]));
        assert!(!row.matches(&[predicate("tag", "somewhere")]));
    }

    #[test]
    fn unknown_attribute_never_matches() {
        let row = dataplane_row();
        assert!(!row.matches(&[predicate("kind", "TrafficRoute")]));
    }
}
