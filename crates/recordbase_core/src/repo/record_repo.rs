//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable save/remove/find APIs over the generic `records`
//!   storage, typed per entity and type-erased for association lookups.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every stored document is a JSON object; anything else is rejected
//!   as invalid persisted state instead of being masked.
//! - Field names used in filters or ordering must be plain identifiers.
//! - Storage bookkeeping (`__rev`, `__created_at`, `__updated_at`) is
//!   maintained here on every save and never leaks through the
//!   type-erased lookup paths.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::DbError;
use crate::model::entity::{Entity, EntityId, Fields, HydrationError};
use crate::model::value::strip_bookkeeping;

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid"));

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Hydration(HydrationError),
    InvalidField(String),
    InvalidData(String),
    UnknownEntity(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Hydration(err) => write!(f, "{err}"),
            Self::InvalidField(field) => write!(f, "invalid field name `{field}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::UnknownEntity(entity) => write!(f, "unknown entity type `{entity}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Hydration(err) => Some(err),
            Self::InvalidField(_) | Self::InvalidData(_) | Self::UnknownEntity(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<HydrationError> for RepoError {
    fn from(value: HydrationError) -> Self {
        Self::Hydration(value)
    }
}

/// Sort direction for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Listing options for `find_all`-style queries.
///
/// `limit`/`offset` of `None` mean "use the model defaults" (10 and 0).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Fields,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    /// Builds a query from an untyped payload, defaulting leniently:
    /// `filters` must be an object, `order` an array of field names
    /// (`-` prefix for descending), `limit`/`offset` numeric values or
    /// numeric strings. Anything else falls back to the default.
    pub fn from_payload(payload: &Fields) -> Self {
        let filters = match payload.get("filters") {
            Some(Value::Object(map)) => map.clone(),
            _ => Fields::new(),
        };

        let order = match payload.get("order") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|field| match field.strip_prefix('-') {
                    Some(rest) => (rest.to_string(), SortDirection::Desc),
                    None => (field.to_string(), SortDirection::Asc),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            filters,
            order,
            limit: payload.get("limit").and_then(numeric_value),
            offset: payload.get("offset").and_then(numeric_value),
        }
    }
}

fn numeric_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Repository contract for one entity type.
pub trait Repository<E: Entity> {
    /// Persists the entity, assigning identity on first save.
    fn save(&self, entity: E) -> RepoResult<E>;
    /// Deletes by id; `false` when no matching record existed.
    fn remove(&self, id: EntityId) -> RepoResult<bool>;
    fn find_one_by_id(&self, id: EntityId) -> RepoResult<Option<E>>;
    fn find_by(&self, criteria: &Fields) -> RepoResult<Vec<E>>;
    fn find_one_by(&self, criteria: &Fields) -> RepoResult<Option<E>>;
    /// Lists raw stored documents (bookkeeping included) with filtering,
    /// ordering and pagination.
    fn get_simple_list_by(
        &self,
        filters: &Fields,
        order: &[(String, SortDirection)],
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Fields>>;
    fn class_name(&self) -> &'static str;
}

/// Type-erased, `Fields`-level access to one entity partition.
///
/// Used for association resolution, where the target entity type is only
/// known by its registered name.
#[derive(Debug)]
pub struct RawRepository {
    conn: Rc<Connection>,
    entity: &'static str,
}

impl RawRepository {
    pub(crate) fn new(conn: Rc<Connection>, entity: &'static str) -> Self {
        Self { conn, entity }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Finds the first document matching all criteria, bookkeeping
    /// stripped.
    pub fn find_one_by(&self, criteria: &Fields) -> RepoResult<Option<Fields>> {
        let mut docs = self.select_docs(criteria, &[], Some(1), 0)?;
        Ok(docs.pop().map(|mut doc| {
            strip_bookkeeping(&mut doc);
            doc
        }))
    }

    /// Finds all documents matching all criteria, bookkeeping stripped.
    pub fn find_by(&self, criteria: &Fields) -> RepoResult<Vec<Fields>> {
        let mut docs = self.select_docs(criteria, &[], None, 0)?;
        for doc in &mut docs {
            strip_bookkeeping(doc);
        }
        Ok(docs)
    }

    fn select_docs(
        &self,
        criteria: &Fields,
        order: &[(String, SortDirection)],
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Fields>> {
        let mut sql = String::from("SELECT doc FROM records WHERE entity = ?");
        let mut bind_values: Vec<SqlValue> = vec![SqlValue::Text(self.entity.to_string())];

        for (field, value) in criteria {
            let field = validated_field(field)?;
            match criterion_param(field, value)? {
                Some(param) => {
                    sql.push_str(&format!(" AND json_extract(doc, '$.{field}') = ?"));
                    bind_values.push(param);
                }
                None => {
                    sql.push_str(&format!(" AND json_extract(doc, '$.{field}') IS NULL"));
                }
            }
        }

        if order.is_empty() {
            sql.push_str(" ORDER BY json_extract(doc, '$.__updated_at') DESC, id ASC");
        } else {
            sql.push_str(" ORDER BY ");
            for (index, (field, direction)) in order.iter().enumerate() {
                let field = validated_field(field)?;
                if index > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&format!(
                    "json_extract(doc, '$.{field}') {}",
                    direction.as_sql()
                ));
            }
        }

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
            if offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(offset)));
            }
        } else if offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut docs = Vec::new();

        while let Some(row) = rows.next()? {
            let doc_text: String = row.get(0)?;
            docs.push(parse_doc(self.entity, &doc_text)?);
        }

        Ok(docs)
    }

    fn load_doc(&self, id: EntityId) -> RepoResult<Option<Fields>> {
        let mut stmt = self
            .conn
            .prepare("SELECT doc FROM records WHERE entity = ?1 AND id = ?2")?;
        let mut rows = stmt.query(params![self.entity, id.to_string()])?;

        if let Some(row) = rows.next()? {
            let doc_text: String = row.get(0)?;
            return Ok(Some(parse_doc(self.entity, &doc_text)?));
        }

        Ok(None)
    }
}

/// SQLite-backed repository for one statically-known entity type.
pub struct SqliteRepository<E: Entity> {
    raw: RawRepository,
    _entity: PhantomData<E>,
}

impl<E: Entity> SqliteRepository<E> {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self {
            raw: RawRepository::new(conn, E::entity_name()),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> for SqliteRepository<E> {
    fn save(&self, mut entity: E) -> RepoResult<E> {
        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = EntityId::new_v4();
                entity.assign_id(id);
                id
            }
        };

        let mut doc = entity.extract();
        doc.insert("id".to_string(), Value::String(id.to_string()));

        let now = epoch_ms();
        match self.raw.load_doc(id)? {
            None => {
                doc.insert("__rev".to_string(), Value::from(1));
                doc.insert("__created_at".to_string(), Value::from(now));
                doc.insert("__updated_at".to_string(), Value::from(now));
                self.raw.conn.execute(
                    "INSERT INTO records (entity, id, doc) VALUES (?1, ?2, ?3);",
                    params![E::entity_name(), id.to_string(), doc_text(&doc)],
                )?;
            }
            Some(existing) => {
                let rev = existing.get("__rev").and_then(Value::as_i64).unwrap_or(0);
                let created_at = existing
                    .get("__created_at")
                    .and_then(Value::as_i64)
                    .unwrap_or(now);
                doc.insert("__rev".to_string(), Value::from(rev + 1));
                doc.insert("__created_at".to_string(), Value::from(created_at));
                doc.insert("__updated_at".to_string(), Value::from(now));
                self.raw.conn.execute(
                    "UPDATE records SET doc = ?3 WHERE entity = ?1 AND id = ?2;",
                    params![E::entity_name(), id.to_string(), doc_text(&doc)],
                )?;
            }
        }

        Ok(entity)
    }

    fn remove(&self, id: EntityId) -> RepoResult<bool> {
        let changed = self.raw.conn.execute(
            "DELETE FROM records WHERE entity = ?1 AND id = ?2;",
            params![E::entity_name(), id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn find_one_by_id(&self, id: EntityId) -> RepoResult<Option<E>> {
        match self.raw.load_doc(id)? {
            Some(mut doc) => {
                strip_bookkeeping(&mut doc);
                Ok(Some(hydrate_record(&doc)?))
            }
            None => Ok(None),
        }
    }

    fn find_by(&self, criteria: &Fields) -> RepoResult<Vec<E>> {
        self.raw
            .find_by(criteria)?
            .iter()
            .map(hydrate_record)
            .collect()
    }

    fn find_one_by(&self, criteria: &Fields) -> RepoResult<Option<E>> {
        match self.raw.find_one_by(criteria)? {
            Some(doc) => Ok(Some(hydrate_record(&doc)?)),
            None => Ok(None),
        }
    }

    fn get_simple_list_by(
        &self,
        filters: &Fields,
        order: &[(String, SortDirection)],
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Fields>> {
        self.raw.select_docs(filters, order, Some(limit), offset)
    }

    fn class_name(&self) -> &'static str {
        E::entity_name()
    }
}

fn hydrate_record<E: Entity>(doc: &Fields) -> RepoResult<E> {
    let mut entity = E::new_empty();
    entity.hydrate(doc)?;
    Ok(entity)
}

fn parse_doc(entity: &str, doc_text: &str) -> RepoResult<Fields> {
    match serde_json::from_str::<Value>(doc_text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RepoError::InvalidData(format!(
            "stored document for `{entity}` is not a JSON object"
        ))),
        Err(err) => Err(RepoError::InvalidData(format!(
            "stored document for `{entity}` is not valid JSON: {err}"
        ))),
    }
}

fn doc_text(doc: &Fields) -> String {
    Value::Object(doc.clone()).to_string()
}

fn validated_field(field: &str) -> RepoResult<&str> {
    if FIELD_NAME.is_match(field) {
        Ok(field)
    } else {
        Err(RepoError::InvalidField(field.to_string()))
    }
}

/// Maps a criterion value to its SQL parameter. Returns `None` for JSON
/// null, which must be compared with `IS NULL` (json_extract yields SQL
/// NULL for both null and missing keys).
fn criterion_param(field: &str, value: &Value) -> RepoResult<Option<SqlValue>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(SqlValue::Integer(i64::from(*flag)))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(Some(SqlValue::Integer(integer)))
            } else if let Some(real) = number.as_f64() {
                Ok(Some(SqlValue::Real(real)))
            } else {
                Err(RepoError::InvalidData(format!(
                    "unsupported numeric criterion for field `{field}`"
                )))
            }
        }
        Value::String(text) => Ok(Some(SqlValue::Text(text.clone()))),
        Value::Array(_) | Value::Object(_) => Err(RepoError::InvalidData(format!(
            "unsupported criterion value for field `{field}`: expected a scalar"
        ))),
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
