// RecordGate - List Query Engine
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Pure transformations over the store's listed records: filtering,
// search, multi-key ordering, pagination. Runs after access control,
// never inside it. Filter semantics per field kind: exact match on
// integer fields, case-insensitive contains on text fields, __gte and
// __lte ranges on integers.

use crate::error::{FieldErrors, GatewayError};
use crate::record::{Record, RecordView};
use crate::resource::{FieldKind, ResourceSchema};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Params consumed by the engine itself rather than treated as filters
const RESERVED_PARAMS: [&str; 5] = ["id", "search", "ordering", "page", "page_size"];

/// Raw query-string parameters for a List operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub params: BTreeMap<String, String>,
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<RecordView>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Filter, search, order, and paginate the listed records.
    pub fn apply(
        &self,
        schema: &ResourceSchema,
        records: Vec<Record>,
    ) -> Result<Page, GatewayError> {
        let filtered = self.filter(schema, records)?;
        let searched = self.search(schema, filtered);
        let ordered = self.order(schema, searched)?;
        self.paginate(ordered)
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    fn filter(
        &self,
        schema: &ResourceSchema,
        mut records: Vec<Record>,
    ) -> Result<Vec<Record>, GatewayError> {
        let mut errors = FieldErrors::new();

        for (key, raw) in &self.params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let (base, suffix) = split_filter_key(key);

            if base == "owner" {
                match raw.parse::<u64>() {
                    Ok(owner) => records.retain(|r| r.owner == Some(owner)),
                    Err(_) => {
                        errors.insert(key.clone(), "expected an integer".to_string());
                    }
                }
                continue;
            }

            let spec = match schema.field(base) {
                Some(spec) => spec,
                // Unknown query params pass through untouched; they may
                // belong to the transport, not to us
                None => continue,
            };

            match (spec.kind, suffix) {
                (FieldKind::Int, FilterOp::Exact) => match raw.parse::<i64>() {
                    Ok(wanted) => {
                        records.retain(|r| r.field(base).and_then(|v| v.as_int()) == Some(wanted))
                    }
                    Err(_) => {
                        errors.insert(key.clone(), "expected an integer".to_string());
                    }
                },
                (FieldKind::Int, FilterOp::Gte) => match raw.parse::<i64>() {
                    Ok(bound) => records.retain(|r| {
                        r.field(base).and_then(|v| v.as_int()).is_some_and(|v| v >= bound)
                    }),
                    Err(_) => {
                        errors.insert(key.clone(), "expected an integer".to_string());
                    }
                },
                (FieldKind::Int, FilterOp::Lte) => match raw.parse::<i64>() {
                    Ok(bound) => records.retain(|r| {
                        r.field(base).and_then(|v| v.as_int()).is_some_and(|v| v <= bound)
                    }),
                    Err(_) => {
                        errors.insert(key.clone(), "expected an integer".to_string());
                    }
                },
                (FieldKind::Int, FilterOp::IContains) => {
                    errors.insert(
                        key.clone(),
                        "contains filter requires a text field".to_string(),
                    );
                }
                // Plain text param means case-insensitive contains
                (FieldKind::Text, FilterOp::Exact) | (FieldKind::Text, FilterOp::IContains) => {
                    let needle = raw.to_lowercase();
                    records.retain(|r| {
                        r.field(base)
                            .and_then(|v| v.as_text())
                            .is_some_and(|t| t.to_lowercase().contains(&needle))
                    });
                }
                (FieldKind::Text, FilterOp::Gte) | (FieldKind::Text, FilterOp::Lte) => {
                    errors.insert(
                        key.clone(),
                        "range filter requires an integer field".to_string(),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(records)
        } else {
            Err(GatewayError::InvalidPayload(errors))
        }
    }

    // ------------------------------------------------------------------
    // Search: one term OR'd across the schema's declared search fields
    // ------------------------------------------------------------------

    fn search(&self, schema: &ResourceSchema, mut records: Vec<Record>) -> Vec<Record> {
        let term = match self.params.get("search").map(|s| s.trim()) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => return records,
        };
        records.retain(|r| {
            schema.search_fields.iter().any(|field| {
                r.field(field)
                    .and_then(|v| v.as_text())
                    .is_some_and(|t| t.to_lowercase().contains(&term))
            })
        });
        records
    }

    // ------------------------------------------------------------------
    // Ordering: comma-separated keys, '-' prefix for descending, ties
    // broken by the schema's default ordering and finally by id
    // ------------------------------------------------------------------

    fn order(
        &self,
        schema: &ResourceSchema,
        mut records: Vec<Record>,
    ) -> Result<Vec<Record>, GatewayError> {
        let mut keys: Vec<String> = match self.params.get("ordering").map(|s| s.trim()) {
            Some(raw) if !raw.is_empty() => {
                let requested: Vec<String> = raw
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                for key in &requested {
                    let base = key.strip_prefix('-').unwrap_or(key);
                    if base != "id" && !schema.ordering_fields.iter().any(|f| f == base) {
                        let mut errors = FieldErrors::new();
                        errors.insert(
                            "ordering".to_string(),
                            format!("cannot order by {:?}", base),
                        );
                        return Err(GatewayError::InvalidPayload(errors));
                    }
                }
                requested
            }
            _ => schema.default_ordering.clone(),
        };

        // Tie-breakers: default ordering keys not already present, then id
        for fallback in &schema.default_ordering {
            let base = fallback.strip_prefix('-').unwrap_or(fallback);
            if !keys.iter().any(|k| k.strip_prefix('-').unwrap_or(k) == base) {
                keys.push(fallback.clone());
            }
        }
        if !keys.iter().any(|k| k.strip_prefix('-').unwrap_or(k) == "id") {
            keys.push("id".to_string());
        }

        records.sort_by(|a, b| {
            for key in &keys {
                let (base, descending) = match key.strip_prefix('-') {
                    Some(stripped) => (stripped, true),
                    None => (key.as_str(), false),
                };
                let mut ordering = compare_by_key(a, b, base);
                if descending {
                    ordering = ordering.reverse();
                }
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Pagination: 1-based page, bounded page size, 404 past the end
    // ------------------------------------------------------------------

    fn paginate(&self, records: Vec<Record>) -> Result<Page, GatewayError> {
        let page = match self.params.get("page") {
            None => 1,
            Some(raw) => match raw.parse::<usize>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    let mut errors = FieldErrors::new();
                    errors.insert("page".to_string(), "expected a positive integer".to_string());
                    return Err(GatewayError::InvalidPayload(errors));
                }
            },
        };
        let page_size = match self.params.get("page_size") {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.parse::<usize>() {
                Ok(s) if s >= 1 => s.min(MAX_PAGE_SIZE),
                _ => {
                    let mut errors = FieldErrors::new();
                    errors.insert(
                        "page_size".to_string(),
                        "expected a positive integer".to_string(),
                    );
                    return Err(GatewayError::InvalidPayload(errors));
                }
            },
        };

        let count = records.len();
        let start = (page - 1) * page_size;
        if start >= count && page > 1 {
            // Past the end of the collection; page 1 of nothing is fine
            return Err(GatewayError::NotFound);
        }

        let results = records
            .iter()
            .skip(start)
            .take(page_size)
            .map(RecordView::from)
            .collect();

        Ok(Page {
            count,
            page,
            page_size,
            results,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FilterOp {
    Exact,
    Gte,
    Lte,
    IContains,
}

fn split_filter_key(key: &str) -> (&str, FilterOp) {
    if let Some(base) = key.strip_suffix("__gte") {
        (base, FilterOp::Gte)
    } else if let Some(base) = key.strip_suffix("__lte") {
        (base, FilterOp::Lte)
    } else if let Some(base) = key.strip_suffix("__icontains") {
        (base, FilterOp::IContains)
    } else {
        (key, FilterOp::Exact)
    }
}

fn compare_by_key(a: &Record, b: &Record, key: &str) -> Ordering {
    match key {
        "id" => a.id.cmp(&b.id),
        "owner" => a.owner.cmp(&b.owner),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        field => match (a.field(field), b.field(field)) {
            (Some(x), Some(y)) => x.cmp_value(y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::resource::SchemaRegistry;
    use chrono::Utc;

    fn books_schema() -> ResourceSchema {
        SchemaRegistry::default()
            .get("books")
            .expect("books schema")
            .clone()
    }

    fn book(id: u64, title: &str, year: i64, author: i64) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("publication_year".to_string(), FieldValue::Int(year));
        fields.insert("author".to_string(), FieldValue::Int(author));
        Record {
            id,
            owner: None,
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shelf() -> Vec<Record> {
        vec![
            book(1, "Things Fall Apart", 1958, 1),
            book(2, "No Longer at Ease", 1960, 1),
            book(3, "The Fall", 1956, 2),
            book(4, "Brave New World", 1932, 3),
            book(5, "FALLEN LEAVES", 2014, 4),
        ]
    }

    fn titles(page: &Page) -> Vec<String> {
        page.results
            .iter()
            .map(|v| match v.fields.get("title") {
                Some(FieldValue::Text(t)) => t.clone(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn title_contains_is_case_insensitive() {
        let page = ListQuery::new()
            .with_param("title", "fall")
            .apply(&books_schema(), shelf())
            .expect("filter");
        // Exactly the case-insensitive matches, default-ordered by title
        assert_eq!(
            titles(&page),
            vec!["FALLEN LEAVES", "The Fall", "Things Fall Apart"]
        );
    }

    #[test]
    fn default_ordering_is_by_title() {
        let page = ListQuery::new()
            .apply(&books_schema(), shelf())
            .expect("list");
        assert_eq!(titles(&page)[0], "Brave New World");
        assert_eq!(page.count, 5);
    }

    #[test]
    fn explicit_ordering_descends_with_prefix() {
        let page = ListQuery::new()
            .with_param("ordering", "-publication_year")
            .apply(&books_schema(), shelf())
            .expect("ordered");
        assert_eq!(titles(&page)[0], "FALLEN LEAVES");
        assert_eq!(titles(&page)[4], "Brave New World");
    }

    #[test]
    fn ordering_ties_break_on_default_key() {
        let mut records = shelf();
        records.push(book(6, "Arrow of God", 1958, 1));
        let page = ListQuery::new()
            .with_param("ordering", "publication_year")
            .apply(&books_schema(), records)
            .expect("ordered");
        let t = titles(&page);
        // Two 1958 books sort by title between themselves
        let arrow = t.iter().position(|x| x == "Arrow of God").expect("arrow");
        let things = t.iter().position(|x| x == "Things Fall Apart").expect("things");
        assert!(arrow < things);
    }

    #[test]
    fn unknown_ordering_key_is_rejected() {
        let err = ListQuery::new()
            .with_param("ordering", "price")
            .apply(&books_schema(), shelf())
            .expect_err("bad key");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn year_range_filters_combine() {
        let page = ListQuery::new()
            .with_param("publication_year__gte", "1956")
            .with_param("publication_year__lte", "1960")
            .apply(&books_schema(), shelf())
            .expect("range");
        assert_eq!(page.count, 3);
    }

    #[test]
    fn author_filter_is_exact() {
        let page = ListQuery::new()
            .with_param("author", "1")
            .apply(&books_schema(), shelf())
            .expect("author");
        assert_eq!(page.count, 2);
    }

    #[test]
    fn search_covers_declared_fields() {
        let page = ListQuery::new()
            .with_param("search", "world")
            .apply(&books_schema(), shelf())
            .expect("search");
        assert_eq!(titles(&page), vec!["Brave New World"]);
    }

    #[test]
    fn non_numeric_int_filter_is_rejected() {
        let err = ListQuery::new()
            .with_param("publication_year", "old")
            .apply(&books_schema(), shelf())
            .expect_err("bad value");
        match err {
            GatewayError::InvalidPayload(fields) => {
                assert_eq!(fields["publication_year"], "expected an integer");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unknown_filter_params_are_ignored() {
        let page = ListQuery::new()
            .with_param("format", "hardcover")
            .apply(&books_schema(), shelf())
            .expect("ignored");
        assert_eq!(page.count, 5);
    }

    #[test]
    fn pagination_slices_and_reports_count() {
        let page = ListQuery::new()
            .with_param("page", "2")
            .with_param("page_size", "2")
            .apply(&books_schema(), shelf())
            .expect("page 2");
        assert_eq!(page.count, 5);
        assert_eq!(page.page, 2);
        assert_eq!(page.results.len(), 2);
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        let err = ListQuery::new()
            .with_param("page", "9")
            .apply(&books_schema(), shelf())
            .expect_err("past end");
        assert_eq!(err, GatewayError::NotFound);
    }

    #[test]
    fn page_one_of_nothing_is_empty_not_an_error() {
        let page = ListQuery::new()
            .apply(&books_schema(), vec![])
            .expect("empty");
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }

    #[test]
    fn zero_page_is_invalid() {
        let err = ListQuery::new()
            .with_param("page", "0")
            .apply(&books_schema(), shelf())
            .expect_err("zero page");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn page_size_is_capped() {
        let page = ListQuery::new()
            .with_param("page_size", "5000")
            .apply(&books_schema(), shelf())
            .expect("capped");
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }
}
