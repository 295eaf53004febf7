//! List query building
//!
//! Every list endpoint shares the same shape: optional equality filters, a
//! substring search, tag membership checks against JSON array columns, a
//! client-chosen sort restricted to a whitelist, and LIMIT/OFFSET paging.
//! Column names only ever come from `&'static str` whitelists, user input
//! is always bound.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use thiserror::Error;

use crate::models::ListParams;

/// One ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    /// SQL expression taken from a whitelist
    pub expr: &'static str,
    pub descending: bool,
}

/// Whitelist entry: public field name (snake_case) and the SQL it sorts by
pub type SortSpec = (&'static str, &'static str);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("Invalid sort field: {0}")]
    UnknownField(String),
}

/// Value compared by an equality filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

/// A single WHERE condition; conditions are joined with AND
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(&'static str, FilterValue),
    /// JSON array column contains the exact string
    JsonContains(&'static str, String),
    /// Case-insensitive substring match on any of the columns
    Search(&'static [&'static str], String),
}

impl Filter {
    pub fn text(column: &'static str, value: impl Into<String>) -> Self {
        Filter::Eq(column, FilterValue::Text(value.into()))
    }

    pub fn integer(column: &'static str, value: i64) -> Self {
        Filter::Eq(column, FilterValue::Integer(value))
    }

    pub fn flag(column: &'static str, value: bool) -> Self {
        Filter::Eq(column, FilterValue::Bool(value))
    }
}

/// Collects optional filters without `if let` chains at every call site
#[derive(Debug, Default)]
pub struct Filters(Vec<Filter>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) -> &mut Self {
        self.0.push(filter);
        self
    }

    pub fn text(&mut self, column: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push(Filter::text(column, value));
        }
        self
    }

    pub fn flag(&mut self, column: &'static str, value: Option<bool>) -> &mut Self {
        if let Some(value) = value {
            self.0.push(Filter::flag(column, value));
        }
        self
    }

    pub fn contains(&mut self, column: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push(Filter::JsonContains(column, value.to_string()));
        }
        self
    }

    pub fn search(&mut self, columns: &'static [&'static str], term: Option<&str>) -> &mut Self {
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            self.0.push(Filter::Search(columns, term.to_string()));
        }
        self
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.0
    }
}

/// Convert `createdAt` style names to `created_at`
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parse a `sort` parameter such as `-createdAt,title`.
///
/// An absent or blank parameter yields an empty list, which
/// [`order_by_clause`] turns into newest-first.
pub fn parse_sort(raw: Option<&str>, allowed: &[SortSpec]) -> Result<Vec<SortField>, SortError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut fields = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (descending, name) = match part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, part.strip_prefix('+').unwrap_or(part)),
        };
        let key = to_snake_case(name.trim());
        let expr = allowed
            .iter()
            .find(|(field, _)| *field == key)
            .map(|(_, expr)| *expr)
            .ok_or_else(|| SortError::UnknownField(name.to_string()))?;
        fields.push(SortField { expr, descending });
    }
    Ok(fields)
}

/// Build the ORDER BY clause. The row id always closes the ordering so a
/// page boundary never splits ties unpredictably.
pub fn order_by_clause(sort: &[SortField]) -> String {
    if sort.is_empty() {
        return " ORDER BY created_at DESC, id DESC".to_string();
    }

    let mut clause = String::from(" ORDER BY ");
    for field in sort {
        clause.push_str(field.expr);
        clause.push_str(if field.descending { " DESC, " } else { " ASC, " });
    }
    let tiebreak_desc = sort.last().map(|f| f.descending).unwrap_or(true);
    clause.push_str(if tiebreak_desc { "id DESC" } else { "id ASC" });
    clause
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Append `WHERE ... AND ...` for the given filters
pub fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq(column, value) => {
                builder.push(*column).push(" = ");
                match value {
                    FilterValue::Text(text) => builder.push_bind(text.clone()),
                    FilterValue::Integer(n) => builder.push_bind(*n),
                    FilterValue::Bool(b) => builder.push_bind(*b),
                };
            }
            Filter::JsonContains(column, value) => {
                builder
                    .push("EXISTS (SELECT 1 FROM json_each(")
                    .push(*column)
                    .push(") WHERE json_each.value = ")
                    .push_bind(value.clone())
                    .push(")");
            }
            Filter::Search(columns, term) => {
                let pattern = escape_like(term);
                builder.push("(");
                for (j, column) in columns.iter().enumerate() {
                    if j > 0 {
                        builder.push(" OR ");
                    }
                    builder
                        .push(*column)
                        .push(" LIKE ")
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\'");
                }
                builder.push(")");
            }
        }
    }
}

/// Count and fetch one page of `table`.
pub async fn fetch_page(
    pool: &SqlitePool,
    table: &'static str,
    filters: &[Filter],
    sort: &[SortField],
    params: &ListParams,
) -> Result<(Vec<SqliteRow>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS count FROM ");
    count.push(table);
    push_filters(&mut count, filters);
    let total: i64 = count
        .build()
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to count {}", table))?
        .get("count");

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
    select.push(table);
    push_filters(&mut select, filters);
    select.push(order_by_clause(sort));
    select
        .push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    tracing::debug!(table, total, page = params.page, "list query");

    let rows = select
        .build()
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {}", table))?;

    Ok((rows, total))
}

/// Decode a JSON array column, treating malformed data as empty
pub fn decode_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Encode a list for a JSON array column
pub fn encode_string_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).context("Failed to encode list")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use proptest::prelude::*;

    const SORTS: &[SortSpec] = &[
        ("created_at", "created_at"),
        ("title", "title"),
        ("views", "views"),
    ];

    #[test]
    fn test_parse_sort_default_is_empty() {
        assert!(parse_sort(None, SORTS).unwrap().is_empty());
        assert!(parse_sort(Some("  "), SORTS).unwrap().is_empty());
        assert_eq!(
            order_by_clause(&[]),
            " ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn test_parse_sort_camel_and_descending() {
        let fields = parse_sort(Some("-createdAt,title"), SORTS).unwrap();
        assert_eq!(
            fields,
            vec![
                SortField { expr: "created_at", descending: true },
                SortField { expr: "title", descending: false },
            ]
        );
        assert_eq!(
            order_by_clause(&fields),
            " ORDER BY created_at DESC, title ASC, id ASC"
        );
    }

    #[test]
    fn test_parse_sort_rejects_unknown() {
        let err = parse_sort(Some("title,password_hash"), SORTS).unwrap_err();
        assert_eq!(err, SortError::UnknownField("password_hash".to_string()));
        assert!(parse_sort(Some("title; DROP TABLE users"), SORTS).is_err());
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("reading_time"), "reading_time");
        assert_eq!(to_snake_case("dueDate"), "due_date");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "%50\\%%");
        assert_eq!(escape_like("a_b"), "%a\\_b%");
    }

    async fn setup_items(count: i64) -> crate::db::DynDatabasePool {
        let pool = create_test_pool().await.unwrap();
        pool.execute(
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, \
             tags TEXT NOT NULL DEFAULT '[]', featured INTEGER NOT NULL DEFAULT 0, \
             created_at TEXT NOT NULL)",
        )
        .await
        .unwrap();
        for i in 0..count {
            let tags = if i % 2 == 0 { r#"["rust","web"]"# } else { r#"["go"]"# };
            sqlx::query("INSERT INTO items (title, tags, featured, created_at) VALUES (?, ?, ?, ?)")
                .bind(format!("Item {}", i))
                .bind(tags)
                .bind(i % 3 == 0)
                // identical timestamps force the id tiebreaker to matter
                .bind("2024-01-01T00:00:00+00:00")
                .execute(pool.sqlite())
                .await
                .unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_complete() {
        let pool = setup_items(23).await;
        let mut seen = Vec::new();

        for page in 1..=3 {
            let params = ListParams::new(page, 10);
            let (rows, total) = fetch_page(pool.sqlite(), "items", &[], &[], &params)
                .await
                .unwrap();
            assert_eq!(total, 23);
            seen.extend(rows.iter().map(|r| r.get::<i64, _>("id")));
        }

        let mut sorted = seen.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        assert_eq!(seen.len(), 23);
        assert_eq!(seen, sorted, "pages must be ordered newest first without overlap");
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let pool = setup_items(12).await;
        let mut filters = Filters::new();
        filters
            .contains("tags", Some("rust"))
            .flag("featured", Some(true))
            .search(&["title"], Some("item"));

        let (rows, total) = fetch_page(
            pool.sqlite(),
            "items",
            filters.as_slice(),
            &[],
            &ListParams::default(),
        )
        .await
        .unwrap();

        // even and divisible by three: 0, 6
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_filters_are_skipped() {
        let mut filters = Filters::new();
        filters.text("category", Some("  ")).contains("tags", None).search(&["title"], Some(""));
        assert!(filters.as_slice().is_empty());
    }

    proptest! {
        #[test]
        fn prop_order_by_always_ends_with_id(
            picks in proptest::collection::vec((0usize..3, any::<bool>()), 0..6)
        ) {
            let raw: Vec<String> = picks
                .iter()
                .map(|(i, desc)| format!("{}{}", if *desc { "-" } else { "" }, SORTS[*i].0))
                .collect();
            let joined = raw.join(",");
            let fields = parse_sort(Some(&joined), SORTS).unwrap();
            prop_assert_eq!(fields.len(), picks.len());

            let clause = order_by_clause(&fields);
            prop_assert!(clause.ends_with("id DESC") || clause.ends_with("id ASC"));
        }

        #[test]
        fn prop_unknown_names_never_reach_sql(name in "[a-z_]{1,12}") {
            prop_assume!(!SORTS.iter().any(|(f, _)| *f == name));
            prop_assert!(parse_sort(Some(&name), SORTS).is_err());
        }
    }
}
