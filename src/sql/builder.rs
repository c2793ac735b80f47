//! Compiles fetch/insert/update/delete statements from an entity schema.
//!
//! Statements use `:Column` named parameters; identifiers come only from the registry and are
//! always quoted. Nothing here touches the database.

use crate::config::{EntitySchema, ForeignKeyRef};
use crate::error::AppError;
use crate::sql::Record;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Quote identifier for SQLite (safe: only from the registry).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A compiled statement: SQL with named placeholders plus the parameter names in bind order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySpec {
    pub sql: String,
    pub params: Vec<String>,
}

impl QuerySpec {
    fn new() -> Self {
        QuerySpec {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, name: &str) -> String {
        if !self.params.iter().any(|p| p == name) {
            self.params.push(name.to_string());
        }
        format!(":{}", name)
    }

    /// Wraps hand-written SQL, collecting its `:name` placeholders.
    pub fn from_sql(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let mut params: Vec<String> = Vec::new();
        scan_placeholders(&sql, |name| {
            if !params.iter().any(|p| p == name) {
                params.push(name.to_string());
            }
            None
        });
        QuerySpec { sql, params }
    }

    /// Renders the statement with `?N` placeholders, N being the 1-based position in `params`.
    pub fn positional_sql(&self) -> Result<String, AppError> {
        let mut unknown = None;
        let out = scan_placeholders(&self.sql, |name| match self.params.iter().position(|p| p == name) {
            Some(i) => Some(format!("?{}", i + 1)),
            None => {
                unknown.get_or_insert_with(|| name.to_string());
                None
            }
        });
        match unknown {
            Some(name) => Err(AppError::Validation(format!("unbound parameter :{}", name))),
            None => Ok(out),
        }
    }

    /// Values in bind order; parameters the record does not carry bind as NULL.
    pub fn bind_values(&self, values: &Record) -> Vec<Value> {
        self.params
            .iter()
            .map(|p| values.get(p).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Walks `sql` outside quoted regions and lets `replace` rewrite each `:name` placeholder.
/// Returns the rewritten SQL; placeholders for which `replace` returns None are kept as-is.
fn scan_placeholders<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            out.push(c);
            i += 1;
            continue;
        }
        if c == ':' && i + 1 < chars.len() && is_ident_start(chars[i + 1]) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            match replace(&name) {
                Some(r) => out.push_str(&r),
                None => {
                    out.push(':');
                    out.push_str(&name);
                }
            }
            i = end;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Byte offset of the first top-level occurrence of keyword `kw`, case-insensitive.
/// Quoted text and parenthesised subexpressions are skipped.
fn find_keyword(sql: &str, kw: &str) -> Option<usize> {
    let upper = sql.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let kw = kw.to_ascii_uppercase();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => {
                quote = Some(b);
                i += 1;
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && bytes[i..].starts_with(kw.as_bytes()) {
            let before_ok = i == 0 || !is_ident_char(bytes[i - 1] as char);
            let after = i + kw.len();
            let after_ok = after >= bytes.len() || !is_ident_char(bytes[after] as char);
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Replaces any WHERE clause of `base` with `where_clause` (which must not include the keyword).
pub fn replace_where_clause(base: &str, where_clause: &str) -> String {
    let head = match find_keyword(base, "WHERE") {
        Some(pos) => &base[..pos],
        None => base,
    };
    format!("{} WHERE {}", head.trim_end().trim_end_matches(';').trim_end(), where_clause)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(AppError::Validation(format!(
                "invalid sort direction '{}' (expected ASC or DESC)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        OrderBy {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        OrderBy {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Shape of a SELECT, as named by datasheet callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    Basic,
    Where,
    Sort,
    WhereAndSort,
}

impl FromStr for FetchMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Basic" => Ok(FetchMode::Basic),
            "Where" => Ok(FetchMode::Where),
            "Sort" => Ok(FetchMode::Sort),
            "WhereAndSort" => Ok(FetchMode::WhereAndSort),
            other => Err(AppError::InvalidMode(format!(
                "'{}' (valid modes: Basic, Where, Sort, WhereAndSort)",
                other
            ))),
        }
    }
}

/// Equality filters, optional sort and admin visibility for a SELECT.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchRequest {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
    pub include_admin: bool,
}

impl FetchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn with_admin(mut self) -> Self {
        self.include_admin = true;
        self
    }

    /// The mode this request degrades to.
    pub fn mode(&self) -> FetchMode {
        match (self.filters.is_empty(), self.order_by.is_some()) {
            (true, false) => FetchMode::Basic,
            (false, false) => FetchMode::Where,
            (true, true) => FetchMode::Sort,
            (false, true) => FetchMode::WhereAndSort,
        }
    }

    /// Filter values keyed by parameter name.
    pub fn filter_values(&self) -> Record {
        self.filters.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

fn select_column_list(entity: &EntitySchema, include_admin: bool) -> String {
    entity
        .visible_columns(include_admin)
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT visible columns with optional ANDed equality filters and a single-column ORDER BY.
pub fn compile_fetch(entity: &EntitySchema, request: &FetchRequest) -> Result<QuerySpec, AppError> {
    let mut q = QuerySpec::new();
    let mut where_parts = Vec::new();
    let mut seen = HashSet::new();
    for (col, _) in &request.filters {
        if !entity.has_column(col) {
            return Err(AppError::Validation(format!(
                "unknown filter column {}.{}",
                entity.name, col
            )));
        }
        if !seen.insert(col.as_str()) {
            return Err(AppError::Validation(format!("duplicate filter on {}", col)));
        }
        let ph = q.push_param(col);
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }

    let order_clause = match &request.order_by {
        Some(order) => {
            if !entity.has_column(&order.column) {
                return Err(AppError::InvalidSortColumn {
                    entity: entity.name.clone(),
                    column: order.column.clone(),
                });
            }
            format!(" ORDER BY {} {}", quoted(&order.column), order.direction.as_sql())
        }
        None => String::new(),
    };
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    q.sql = format!(
        "SELECT {} FROM {}{}{}",
        select_column_list(entity, request.include_admin),
        quoted(&entity.name),
        where_clause,
        order_clause
    );
    Ok(q)
}

/// Like [`compile_fetch`] but with the mode named explicitly by the caller.
/// The mode must agree with what the request carries.
pub fn compile_fetch_mode(
    entity: &EntitySchema,
    mode: &str,
    request: &FetchRequest,
) -> Result<QuerySpec, AppError> {
    let mode: FetchMode = mode.parse()?;
    let needs_filters = matches!(mode, FetchMode::Where | FetchMode::WhereAndSort);
    let needs_sort = matches!(mode, FetchMode::Sort | FetchMode::WhereAndSort);
    if needs_filters && request.filters.is_empty() {
        return Err(AppError::Validation(format!("mode {:?} requires filter conditions", mode)));
    }
    if needs_sort && request.order_by.is_none() {
        return Err(AppError::Validation(format!("mode {:?} requires an ORDER BY column", mode)));
    }
    let mut narrowed = request.clone();
    if !needs_filters {
        narrowed.filters.clear();
    }
    if !needs_sort {
        narrowed.order_by = None;
    }
    compile_fetch(entity, &narrowed)
}

/// SELECT one row by primary key.
pub fn compile_select_by_id(entity: &EntitySchema, include_admin: bool) -> Result<QuerySpec, AppError> {
    let pk = entity.primary_key()?;
    let mut q = QuerySpec::new();
    let ph = q.push_param(&pk.name);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity, include_admin),
        quoted(&entity.name),
        quoted(&pk.name),
        ph
    );
    Ok(q)
}

/// INSERT every column except the primary key and admin columns, each bound by name.
pub fn compile_insert(entity: &EntitySchema) -> Result<QuerySpec, AppError> {
    entity.primary_key()?;
    let mut q = QuerySpec::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.columns.iter().filter(|c| !c.is_primary_key && !c.is_admin) {
        cols.push(quoted(&c.name));
        placeholders.push(q.push_param(&c.name));
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quoted(&entity.name))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(&entity.name),
            cols.join(", "),
            placeholders.join(", ")
        )
    };
    Ok(q)
}

fn update_set_clause(entity: &EntitySchema, q: &mut QuerySpec) -> Result<String, AppError> {
    let sets: Vec<String> = entity
        .columns
        .iter()
        .filter(|c| !c.is_primary_key && !c.is_admin)
        .map(|c| format!("{} = {}", quoted(&c.name), q.push_param(&c.name)))
        .collect();
    if sets.is_empty() {
        return Err(AppError::Validation(format!("{} has no updatable columns", entity.name)));
    }
    Ok(sets.join(", "))
}

/// UPDATE every non-key, non-admin column by name, scoped to the primary key.
pub fn compile_update(entity: &EntitySchema) -> Result<QuerySpec, AppError> {
    let pk = entity.primary_key()?;
    let mut q = QuerySpec::new();
    let set_clause = update_set_clause(entity, &mut q)?;
    let ph = q.push_param(&pk.name);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&entity.name),
        set_clause,
        quoted(&pk.name),
        ph
    );
    Ok(q)
}

/// UPDATE only the named columns, scoped to the primary key. Each must be an editable column.
pub fn compile_update_columns(
    entity: &EntitySchema,
    columns: &[&str],
) -> Result<QuerySpec, AppError> {
    let pk = entity.primary_key()?;
    if columns.is_empty() {
        return Err(AppError::Validation(format!("no columns to update in {}", entity.name)));
    }
    let mut q = QuerySpec::new();
    let mut sets = Vec::with_capacity(columns.len());
    for name in columns {
        match entity.column(name) {
            Some(c) if !c.is_primary_key && !c.is_admin => {
                sets.push(format!("{} = {}", quoted(name), q.push_param(name)));
            }
            Some(_) => {
                return Err(AppError::Validation(format!("{}.{} is not updatable", entity.name, name)));
            }
            None => {
                return Err(AppError::Validation(format!("unknown column {}.{}", entity.name, name)));
            }
        }
    }
    let ph = q.push_param(&pk.name);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&entity.name),
        sets.join(", "),
        quoted(&pk.name),
        ph
    );
    Ok(q)
}

/// Scopes a caller-supplied UPDATE to the primary key. An existing WHERE is replaced, never extended.
pub fn compile_update_with_base(entity: &EntitySchema, base_sql: &str) -> Result<QuerySpec, AppError> {
    let pk = entity.primary_key()?;
    let where_clause = format!("{} = :{}", quoted(&pk.name), pk.name);
    let q = QuerySpec::from_sql(replace_where_clause(base_sql, &where_clause));
    if q.params.iter().any(|p| entity.column(p).is_some_and(|c| c.is_admin)) {
        return Err(AppError::Validation(format!(
            "base statement for {} binds an admin column",
            entity.name
        )));
    }
    Ok(q)
}

/// DELETE by primary key, nothing else.
pub fn compile_delete(entity: &EntitySchema) -> Result<QuerySpec, AppError> {
    let pk = entity.primary_key()?;
    let mut q = QuerySpec::new();
    let ph = q.push_param(&pk.name);
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(&entity.name), quoted(&pk.name), ph);
    Ok(q)
}

/// Existence probe for a referenced row; binds the referenced column's name.
pub fn compile_foreign_key_check(target: &ForeignKeyRef) -> QuerySpec {
    let mut q = QuerySpec::new();
    let ph = q.push_param(&target.column);
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} = {} LIMIT 1",
        quoted(&target.table),
        quoted(&target.column),
        ph
    );
    q
}

/// Existence check for a row sharing every value of `key` (NULL matches NULL). With `exclude_self`
/// the row identified by the primary-key parameter is skipped, for updates.
pub fn compile_unique_check(
    entity: &EntitySchema,
    key: &[String],
    exclude_self: bool,
) -> Result<QuerySpec, AppError> {
    let mut q = QuerySpec::new();
    let mut conds = Vec::with_capacity(key.len() + 1);
    for col in key {
        if !entity.has_column(col) {
            return Err(AppError::Validation(format!("unknown unique column {}.{}", entity.name, col)));
        }
        let ph = q.push_param(col);
        conds.push(format!("{} IS {}", quoted(col), ph));
    }
    if exclude_self {
        let pk = entity.primary_key()?;
        let ph = q.push_param(&pk.name);
        conds.push(format!("{} IS NOT {}", quoted(&pk.name), ph));
    }
    q.sql = format!(
        "SELECT 1 FROM {} WHERE {} LIMIT 1",
        quoted(&entity.name),
        conds.join(" AND ")
    );
    Ok(q)
}
