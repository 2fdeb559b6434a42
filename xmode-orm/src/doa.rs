//! # Data Access Object
//!
//! CRUD façade over an [`Executor`]. Every operation looks the model up
//! through the analyzer, builds one parameterized statement and runs it.
//! There is no transaction scope: each create/save is its own statement.

use std::marker::PhantomData;

use crate::{
    Attributes, Dialect, Error, Executor, Mapper, Model, Params, Result, Row, Value, analyze,
    specification::ClassSpecification,
};

// ============================================================================
// Create Request
// ============================================================================

/// Input of [`Doa::create`]: either an entity or a set of attributes.
///
/// ```rust,ignore
/// doa.create(Create::<Task>::with_attributes(attributes)).await?;
/// let task = doa.create(Create::with_entity(task).returning()).await?;
/// ```
pub struct Create<T> {
    entity: Option<T>,
    attributes: Option<Attributes>,
    return_nothing: bool,
}

impl<T> Default for Create<T> {
    fn default() -> Self {
        Self { entity: None, attributes: None, return_nothing: true }
    }
}

impl<T: Model> Create<T> {
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self::default().attributes(attributes)
    }

    pub fn with_entity(entity: T) -> Self {
        Self::default().entity(entity)
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn entity(mut self, entity: T) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Makes `create` hand back the inserted entity.
    ///
    /// The entity is the in-memory one; values generated by the database are
    /// not read back.
    pub fn returning(mut self) -> Self {
        self.return_nothing = false;
        self
    }
}

// ============================================================================
// Result Iterators
// ============================================================================

/// Objects mapped lazily from an already fetched result set.
pub struct Entities<T> {
    rows: std::vec::IntoIter<Row>,
    _model: PhantomData<fn() -> T>,
}

impl<T> Entities<T> {
    fn new(rows: Vec<Row>) -> Self {
        Self { rows: rows.into_iter(), _model: PhantomData }
    }
}

impl<T: Model> Iterator for Entities<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Mapper::to_object)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// One result of a saved query.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Entity(T),
    Row(Row),
}

impl<T> Fetched<T> {
    pub fn into_entity(self) -> Option<T> {
        match self {
            Fetched::Entity(entity) => Some(entity),
            Fetched::Row(_) => None,
        }
    }

    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            Fetched::Entity(_) => None,
        }
    }
}

/// Results of a saved query, mapped to objects only when the query asks for it.
pub struct Played<T> {
    rows: std::vec::IntoIter<Row>,
    auto_mapping: bool,
    _model: PhantomData<fn() -> T>,
}

impl<T: Model> Iterator for Played<T> {
    type Item = Result<Fetched<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(if self.auto_mapping { Mapper::to_object(row).map(Fetched::Entity) } else { Ok(Fetched::Row(row)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

// ============================================================================
// DOA
// ============================================================================

pub struct Doa<E> {
    db: E,
}

impl<E: Executor> Doa<E> {
    pub fn new(db: E) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &E {
        &self.db
    }

    /// Inserts one row, from an entity or from attributes completed with
    /// defaults and nulls.
    pub async fn create<T: Model>(&self, request: Create<T>) -> Result<Option<T>> {
        let spec = analyze::<T>()?;

        let (entity, attributes) = match (request.entity, request.attributes) {
            (Some(entity), None) => {
                let attributes = Mapper::to_row(&entity, &[])?;
                (entity, attributes)
            }
            (None, Some(mut attributes)) => {
                {
                    let spec = spec.read();
                    for (attr_name, default) in &spec.defaults {
                        if !attributes.contains_key(attr_name) {
                            attributes.insert(attr_name.clone(), default.produce());
                        }
                    }
                    for attr_name in spec.nullable_attribute_names() {
                        attributes.entry(attr_name).or_insert(Value::Null);
                    }
                }
                let entity = T::from_attributes(attributes.clone())?;
                (entity, attributes)
            }
            (Some(_), Some(_)) => {
                return Err(Error::Creation("either an entity or attributes must be given, not both".to_string()));
            }
            (None, None) => return Err(Error::Creation("an entity or attributes must be given".to_string())),
        };

        let (query, params) = {
            let spec = spec.read();
            let mut params = Params::with_capacity(attributes.len());
            for (attr_name, value) in attributes {
                params.insert(spec.field_name(&attr_name)?.to_string(), value);
            }

            let columns: Vec<String> = params.keys().map(|f| format!("`{f}`")).collect();
            let placeholders: Vec<String> = params.keys().map(|f| format!(":{f}")).collect();
            let query = format!("INSERT INTO {} ({}) VALUE ({})", spec.name, columns.join(", "), placeholders.join(", "));
            (query, params)
        };

        self.db.run(&query, params).await?;

        Ok(if request.return_nothing { None } else { Some(entity) })
    }

    /// Writes every mapped attribute of `entity` to its row.
    pub async fn save<T: Model>(&self, entity: &T) -> Result<()> {
        self.save_filtered(entity, None).await
    }

    /// Writes only the listed attributes of `entity` to its row.
    pub async fn save_attributes<T: Model>(&self, entity: &T, saved_attributes: &[&str]) -> Result<()> {
        self.save_filtered(entity, Some(saved_attributes)).await
    }

    async fn save_filtered<T: Model>(&self, entity: &T, saved_attributes: Option<&[&str]>) -> Result<()> {
        let spec = analyze::<T>()?;
        let attributes = Mapper::to_row(entity, &[])?;
        log::debug!("save: attributes = {attributes:?}");

        let (query, params) = {
            let spec = spec.read();

            let mut updates = Params::new();
            for (attr_name, value) in attributes {
                if saved_attributes.is_none_or(|allowed| allowed.contains(&attr_name.as_str())) {
                    updates.insert(spec.field_name(&attr_name)?.to_string(), value);
                }
            }
            log::debug!("save: field_value_map = {updates:?}");

            if updates.is_empty() {
                return Err(Error::NoUpdate(describe(entity, &spec)));
            }

            let identifiers = identifiers(entity, &spec)?;

            let set_clauses: Vec<String> = updates.keys().map(|f| format!("`{f}`=:updated_{f}")).collect();
            let where_clauses: Vec<String> = identifiers.keys().map(|f| format!("`{f}`=:current_{f}")).collect();

            let mut params = Params::with_capacity(identifiers.len() + updates.len());
            params.extend(identifiers.into_iter().map(|(f, v)| (format!("current_{f}"), v)));
            params.extend(updates.into_iter().map(|(f, v)| (format!("updated_{f}"), v)));

            let query = format!("UPDATE {} SET {} WHERE {}", spec.name, set_clauses.join(", "), where_clauses.join(" AND "));
            (query, params)
        };

        self.db.run(&query, params).await
    }

    /// `SELECT * FROM <table>` with an optional raw WHERE clause.
    pub async fn find<T: Model>(&self, where_clause: Option<&str>, params: Params) -> Result<Entities<T>> {
        let spec = analyze::<T>()?;
        let mut query = format!("SELECT * FROM {}", spec.read().name);

        if let Some(where_clause) = where_clause {
            query.push_str(" WHERE ");
            query.push_str(where_clause);
        }

        let rows = self.db.run_and_return(&query, params).await?;
        Ok(Entities::new(rows))
    }

    /// Runs the saved query `saved_query_name` of `T`.
    pub async fn play<T: Model>(&self, saved_query_name: &str, params: Params) -> Result<Played<T>> {
        let spec = analyze::<T>()?;
        let saved_query = spec.read().saved_query(saved_query_name)?.clone();

        let rows = self.db.run_and_return(&saved_query.query, params).await?;
        Ok(Played { rows: rows.into_iter(), auto_mapping: saved_query.auto_mapping, _model: PhantomData })
    }

    /// Reloads every mapped attribute of `entity` from its row.
    pub async fn refresh<T: Model>(&self, entity: &mut T) -> Result<()> {
        let spec = analyze::<T>()?;

        let (query, params) = {
            let spec = spec.read();
            let identifiers = identifiers(entity, &spec)?;
            let where_clauses: Vec<String> = identifiers.keys().map(|f| format!("`{f}`=:{f}")).collect();
            (format!("SELECT * FROM {} WHERE {}", spec.name, where_clauses.join(" AND ")), identifiers)
        };

        let rows = self.db.run_and_return(&query, params).await?;
        let Some(mut updates) = rows.into_iter().next() else {
            return Err(Error::EntityRemoved(describe(entity, &spec.read())));
        };

        let refreshed = {
            let spec = spec.read();
            spec.mappings
                .iter()
                .map(|mapping| {
                    let value = updates.shift_remove(&mapping.field_name).unwrap_or(Value::Null);
                    Ok((mapping.attr_name.clone(), mapping.field_type.coerce(value)?))
                })
                .collect::<Result<Attributes>>()?
        };

        // Every value must convert before `entity` is touched.
        T::from_attributes(refreshed.clone())?;
        for (attr_name, value) in refreshed {
            entity.set_attribute(&attr_name, value)?;
        }
        Ok(())
    }

    /// Runs the CREATE TABLE statement of `T` in `dialect`.
    pub async fn create_table<T: Model>(&self, dialect: &impl Dialect) -> Result<()> {
        let query = dialect.convert_class_to_create_query::<T>()?;
        self.db.run(&query, Params::new()).await
    }
}

/// Column name -> current value of every identifier field.
fn identifiers<T: Model>(entity: &T, spec: &ClassSpecification) -> Result<Params> {
    if spec.id_fields.is_empty() {
        return Err(Error::MissingIdentity(T::model_name().to_string()));
    }

    spec.id_fields
        .iter()
        .map(|attr_name| {
            let value = entity.attribute(attr_name).ok_or_else(|| crate::model::unknown_attribute::<T>(attr_name))?;
            Ok((spec.field_name(attr_name)?.to_string(), value))
        })
        .collect()
}

/// `table(id=..., ...)`, for error messages.
fn describe<T: Model>(entity: &T, spec: &ClassSpecification) -> String {
    let identity: Vec<String> = spec
        .id_fields
        .iter()
        .map(|attr_name| format!("{attr_name}={}", entity.attribute(attr_name).unwrap_or_default()))
        .collect();
    format!("{}({})", spec.name, identity.join(", "))
}
