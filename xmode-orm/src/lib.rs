//! # xmode-orm
//!
//! A small declarative ORM. A data type describes its columns through
//! `#[derive(Model)]` (or a hand-written [`Model`] impl), the [`analyzer`]
//! turns that description into a cached [`ClassSpecification`], and the
//! [`Doa`] translates typed create/save/find/play/refresh calls into
//! parameterized SQL executed by an [`Executor`].
//!
//! ```rust,ignore
//! use xmode_orm::{Core, Create, Doa, Model, MySql, Dialect, Params};
//! use uuid::Uuid;
//!
//! #[derive(Model, Debug, Clone)]
//! #[orm(stored_in = "tasks")]
//! struct Task {
//!     #[orm(id, default_with = Uuid::new_v4)]
//!     id: Uuid,
//!     #[orm(default = "new")]
//!     status: String,
//!     note: Option<String>,
//! }
//!
//! let ddl = MySql.convert_class_to_create_query::<Task>()?;
//! let doa = Doa::new(Core::new("mysql://localhost:3306", "xmode"));
//! let task = doa.create(Create::<Task>::with_attributes(Default::default()).returning()).await?;
//! let open: Vec<Task> = doa.find::<Task>(Some("`status`=:status"), params).await?.collect::<Result<_, _>>()?;
//! ```

pub mod analyzer;
pub mod database;
pub mod definitions;
pub mod dialect;
pub mod doa;
pub mod error;
pub mod installer;
pub mod mapper;
pub mod model;
pub mod specification;
pub mod value;

pub use analyzer::{Registrar, Specification, analyze};
pub use database::{Core, CoreBuilder, Drivers, Executor};
pub use definitions::{Annotation, FieldKind, FieldShape, FieldValue, LongText, Text};
pub use dialect::{Dialect, MySql};
pub use doa::{Create, Doa, Entities, Fetched, Played};
pub use error::{Error, Result};
pub use installer::Installer;
pub use mapper::Mapper;
pub use model::{AttributeDeclaration, Model};
pub use specification::{ClassSpecification, Constraint, DefaultValue, MappingDefinition, SavedQuery};
pub use value::{Attributes, Params, Row, Value};

pub use xmode_orm_macro::Model;
