//! Generic entity model: uniform CRUD over any registered entity type.
//!
//! # Responsibility
//! - Map untyped payloads to persisted entity instances through the
//!   hydration seam, resolving association fields on create.
//! - Surface the three update outcomes distinctly: entity, not-found
//!   (`None`), and error.
//!
//! # Invariants
//! - `create` never honors a caller-supplied `id`; identity comes from
//!   the storage layer.
//! - `update` validates identity before any repository access.
//! - The internal payload buffer is transient and reset at the start of
//!   create/update; no entity state is held across calls.
//! - The filtered merge in `populate_object` drops falsy values, so
//!   empty-string/zero/false updates to existing fields are no-ops.
//!   Legacy behavior, kept on purpose.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;
use uuid::Uuid;

use crate::context::PersistenceContext;
use crate::model::entity::{Entity, EntityId, Fields};
use crate::model::metadata::AssociationKind;
use crate::model::value::{filtered_merge, strip_bookkeeping};
use crate::repo::record_repo::{ListQuery, RepoError, RepoResult, Repository};

/// Model operation tag carried by wrapped storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Remove,
}

impl Operation {
    /// Short internal diagnostic code, stable for support traceability.
    pub fn diagnostic_code(self) -> &'static str {
        match self {
            Self::Create => "RBM0001",
            Self::Update => "RBM0002",
            Self::Remove => "RBM0003",
        }
    }
}

/// Error surface of the generic entity model.
#[derive(Debug)]
pub enum ModelError {
    /// `id` key absent from an update payload.
    MissingId,
    /// `id` present but not a syntactically valid UUID.
    MalformedId(String),
    /// Storage failure during create/update/remove, tagged per operation.
    Storage { op: Operation, source: RepoError },
    /// Lower-layer failure propagated unannotated (listing and hydration
    /// helper paths).
    Repo(RepoError),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "`id` value is not set"),
            Self::MalformedId(raw) => write!(f, "`id` value `{raw}` is not a valid UUID"),
            Self::Storage { op, source } => {
                write!(f, "{source} ({})", op.diagnostic_code())
            }
            Self::Repo(source) => write!(f, "{source}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } | Self::Repo(source) => Some(source),
            Self::MissingId | Self::MalformedId(_) => None,
        }
    }
}

impl From<RepoError> for ModelError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Uniform create/update/remove/find over one entity type.
///
/// Bound to a repository at construction; `set_repository` only re-binds.
pub struct EntityModel<E: Entity, R: Repository<E>> {
    context: Rc<PersistenceContext>,
    repository: R,
    /// Transient payload buffer, reset at the start of create/update.
    data: Fields,
    _entity: PhantomData<E>,
}

impl<E: Entity, R: Repository<E>> EntityModel<E, R> {
    /// Default page size for `find_all`.
    pub const LIMIT: u32 = 10;
    /// Default page offset for `find_all`.
    pub const OFFSET: u32 = 0;

    pub fn new(context: Rc<PersistenceContext>, repository: R) -> Self {
        Self {
            context,
            repository,
            data: Fields::new(),
            _entity: PhantomData,
        }
    }

    /// Re-binds the repository; fluent for chained configuration.
    pub fn set_repository(mut self, repository: R) -> Self {
        self.repository = repository;
        self
    }

    /// Persists a new entity hydrated from `payload`.
    ///
    /// Any `id` in the payload is discarded; identity is assigned by the
    /// storage layer. Association fields are resolved to their target
    /// documents before hydration. Storage failures anywhere in the flow
    /// — association lookups included — are wrapped with the `Create`
    /// diagnostic tag; non-storage failures (hydration, unknown target)
    /// propagate unannotated.
    pub fn create(&mut self, payload: Fields) -> Result<E, ModelError> {
        self.data = payload;
        self.data.remove("id");

        let mut entity = E::new_empty();
        self.populate_association()
            .map_err(|source| wrap_storage(Operation::Create, source))?;
        self.populate_object(&mut entity)
            .map_err(|source| wrap_storage(Operation::Create, source))?;

        self.repository.save(entity).map_err(|source| ModelError::Storage {
            op: Operation::Create,
            source,
        })
    }

    /// Updates the entity identified by the payload's `id` field.
    ///
    /// Returns `Ok(None)` when no entity exists for that id, which is a
    /// valid not-found outcome, not an error. Fails with `MissingId` /
    /// `MalformedId` before any repository access. Stored field values
    /// are merged with the payload under the filtered-merge policy.
    pub fn update(&mut self, payload: Fields) -> Result<Option<E>, ModelError> {
        let id = parse_payload_id(&payload)?;
        self.data = payload;

        let mut entity = match self
            .repository
            .find_one_by_id(id)
            .map_err(|source| ModelError::Storage {
                op: Operation::Update,
                source,
            })? {
            Some(entity) => entity,
            None => return Ok(None),
        };

        self.populate_object(&mut entity)
            .map_err(|source| ModelError::Storage {
                op: Operation::Update,
                source,
            })?;

        let saved = self
            .repository
            .save(entity)
            .map_err(|source| ModelError::Storage {
                op: Operation::Update,
                source,
            })?;
        Ok(Some(saved))
    }

    /// Deletes by id. `Ok(false)` when no matching record existed.
    pub fn remove(&self, id: EntityId) -> Result<bool, ModelError> {
        self.repository
            .remove(id)
            .map_err(|source| ModelError::Storage {
                op: Operation::Remove,
                source,
            })
    }

    /// Lists stored entities as plain field mappings.
    ///
    /// Missing limit/offset default to 10 and 0. Storage bookkeeping
    /// keys are stripped from every mapping. Lower-layer errors
    /// propagate unannotated.
    pub fn find_all(&self, query: &ListQuery) -> Result<Vec<Fields>, ModelError> {
        let limit = query.limit.unwrap_or(Self::LIMIT);
        let offset = query.offset.unwrap_or(Self::OFFSET);

        let mut docs =
            self.repository
                .get_simple_list_by(&query.filters, &query.order, limit, offset)?;
        for doc in &mut docs {
            strip_bookkeeping(doc);
        }
        Ok(docs)
    }

    /// Plain extraction of an entity's fields. No filtering.
    pub fn extract_object(&self, entity: &E) -> Fields {
        entity.extract()
    }

    /// Hydrates the buffered payload onto `entity`.
    ///
    /// For already-persisted entities the buffer is first replaced by the
    /// filtered merge of the entity's current fields with the payload.
    fn populate_object(&mut self, entity: &mut E) -> RepoResult<()> {
        if entity.id().is_some() {
            let buffered = std::mem::take(&mut self.data);
            self.data = filtered_merge(entity.extract(), buffered);
        }

        entity.hydrate(&self.data)?;
        Ok(())
    }

    /// Replaces raw join values in the buffer with resolved target
    /// documents: one object (or null) for single-join associations, an
    /// array of objects for collections.
    fn populate_association(&mut self) -> RepoResult<()> {
        for descriptor in E::metadata().associations {
            let Some(raw_value) = self.data.get(descriptor.field).cloned() else {
                continue;
            };

            let target = self.context.raw_repository(descriptor.target_entity)?;
            let mut criteria = Fields::new();
            criteria.insert(descriptor.join_key.to_string(), raw_value);

            let resolved = match descriptor.kind {
                AssociationKind::One => match target.find_one_by(&criteria)? {
                    Some(doc) => Value::Object(doc),
                    None => Value::Null,
                },
                AssociationKind::Many => Value::Array(
                    target
                        .find_by(&criteria)?
                        .into_iter()
                        .map(Value::Object)
                        .collect(),
                ),
            };

            self.data.insert(descriptor.field.to_string(), resolved);
        }

        Ok(())
    }
}

/// Annotates storage-class failures with the operation tag; everything
/// else (hydration, unknown entity) stays unannotated.
fn wrap_storage(op: Operation, source: RepoError) -> ModelError {
    match source {
        source @ RepoError::Db(_) => ModelError::Storage { op, source },
        other => ModelError::Repo(other),
    }
}

fn parse_payload_id(payload: &Fields) -> Result<EntityId, ModelError> {
    match payload.get("id") {
        None | Some(Value::Null) => Err(ModelError::MissingId),
        Some(Value::String(text)) => {
            Uuid::parse_str(text).map_err(|_| ModelError::MalformedId(text.clone()))
        }
        Some(other) => Err(ModelError::MalformedId(other.to_string())),
    }
}
