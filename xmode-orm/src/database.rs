//! # Database Module
//!
//! The database-execution collaborator used by the DOA: the [`Executor`]
//! trait, and [`Core`], its implementation on top of a lazily created SQLx
//! pool. MySQL connections use the native driver; every other URL goes
//! through the `Any` driver. Each call checks out one connection, runs one
//! statement and gives the connection back when it returns, on success or
//! failure.

// ============================================================================
// External Crate Imports
// ============================================================================

use chrono::NaiveDateTime;
use futures::future::BoxFuture;
use sqlx::{
    Any, AnyPool, Arguments, Column, Database, Encode, MySql, MySqlPool, Row as _, Type, TypeInfo,
    any::{AnyPoolOptions, AnyRow},
    mysql::{MySqlPoolOptions, MySqlRow},
};
use std::sync::Arc;
use tokio::sync::OnceCell;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{Error, Params, Result, Row, Value};

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Database drivers recognized from the connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL driver
    MySQL,
    /// SQLite driver
    SQLite,
}

impl Drivers {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") || url.starts_with("mariadb") {
            Drivers::MySQL
        } else {
            Drivers::SQLite
        }
    }
}

// ============================================================================
// Executor Trait
// ============================================================================

/// Runs SQL with `:name` placeholders bound from a parameter map.
pub trait Executor: Send + Sync {
    /// Executes a statement and discards any result.
    fn run<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<()>>;

    /// Executes a query and returns every row.
    fn run_and_return<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<Vec<Row>>>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn run<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<()>> {
        (**self).run(sql, params)
    }

    fn run_and_return<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<Vec<Row>>> {
        (**self).run_and_return(sql, params)
    }
}

// ============================================================================
// Core Struct
// ============================================================================

/// The `Any` driver cannot decode MySQL `TINYINT` and `DATETIME` columns, so
/// MySQL keeps its own pool type.
#[derive(Debug)]
enum Pool {
    Any(AnyPool),
    MySql(MySqlPool),
}

/// SQLx-backed executor.
///
/// The pool is created on first use; constructing a `Core` never touches the
/// network.
#[derive(Debug)]
pub struct Core {
    url: String,
    driver: Drivers,
    max_connections: u32,
    pool: OnceCell<Pool>,
}

impl Core {
    /// Creates a new CoreBuilder for configuring the connection.
    pub fn builder() -> CoreBuilder {
        CoreBuilder::new()
    }

    /// Targets database `db_name` on the server at `base_url`.
    pub fn new(base_url: &str, db_name: &str) -> Self {
        CoreBuilder::new().build(base_url, db_name)
    }

    pub fn from_url(url: &str) -> Self {
        CoreBuilder::new().build_from_url(url)
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn pool(&self) -> Result<&Pool> {
        self.pool
            .get_or_try_init(|| async {
                log::debug!("connecting to {} ({:?})", self.url, self.driver);
                match self.driver {
                    Drivers::MySQL => MySqlPoolOptions::new()
                        .max_connections(self.max_connections)
                        .connect(&self.url)
                        .await
                        .map(Pool::MySql),
                    Drivers::Postgres | Drivers::SQLite => {
                        sqlx::any::install_default_drivers();
                        AnyPoolOptions::new()
                            .max_connections(self.max_connections)
                            .connect(&self.url)
                            .await
                            .map(Pool::Any)
                    }
                }
            })
            .await
            .map_err(Error::from)
    }
}

impl Executor for Core {
    fn run<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log::debug!("run: {sql}");
            let (sql, values) = positional(sql, &params, self.driver)?;
            match self.pool().await? {
                Pool::Any(pool) => {
                    let args = arguments::<Any>(values)?;
                    let mut conn = pool.acquire().await?;
                    sqlx::query_with::<Any, _>(&sql, args).execute(&mut *conn).await?;
                }
                Pool::MySql(pool) => {
                    let args = arguments::<MySql>(values)?;
                    let mut conn = pool.acquire().await?;
                    sqlx::query_with::<MySql, _>(&sql, args).execute(&mut *conn).await?;
                }
            }
            Ok(())
        })
    }

    fn run_and_return<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            log::debug!("run_and_return: {sql}");
            let (sql, values) = positional(sql, &params, self.driver)?;
            match self.pool().await? {
                Pool::Any(pool) => {
                    let args = arguments::<Any>(values)?;
                    let mut conn = pool.acquire().await?;
                    let rows = sqlx::query_with::<Any, _>(&sql, args).fetch_all(&mut *conn).await?;
                    rows.iter().map(decode_any_row).collect()
                }
                Pool::MySql(pool) => {
                    let args = arguments::<MySql>(values)?;
                    let mut conn = pool.acquire().await?;
                    let rows = sqlx::query_with::<MySql, _>(&sql, args).fetch_all(&mut *conn).await?;
                    rows.iter().map(decode_mysql_row).collect()
                }
            }
        })
    }
}

// ============================================================================
// CoreBuilder Struct
// ============================================================================

pub struct CoreBuilder {
    max_connections: u32,
}

impl Default for CoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5 }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn build(self, base_url: &str, db_name: &str) -> Core {
        self.build_from_url(&format!("{}/{}", base_url.trim_end_matches('/'), db_name))
    }

    pub fn build_from_url(self, url: &str) -> Core {
        Core {
            url: url.to_string(),
            driver: Drivers::from_url(url),
            max_connections: self.max_connections,
            pool: OnceCell::new(),
        }
    }
}

// ============================================================================
// Parameter Binding
// ============================================================================

/// Rewrites `:name` placeholders to the driver's positional form and returns
/// the values in placeholder order.
///
/// Text inside quotes (`'`, `"`, `` ` ``) and `::` casts are left untouched.
pub fn positional(sql: &str, params: &Params, driver: Drivers) -> Result<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            out.push(c);
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if chars.peek().is_some_and(|(_, next)| *next == ':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_') => {
                let start = index + 1;
                let mut end = start;
                while let Some((i, next)) = chars.peek().copied() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }

                let name = &sql[start..end];
                let value = params.get(name).ok_or_else(|| Error::MissingParameter(name.to_string()))?;
                values.push(value.clone());

                match driver {
                    Drivers::Postgres => out.push_str(&format!("${}", values.len())),
                    Drivers::MySQL | Drivers::SQLite => out.push('?'),
                }
            }
            _ => out.push(c),
        }
    }

    Ok((out, values))
}

fn arguments<'q, DB>(values: Vec<Value>) -> Result<<DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    let mut args: <DB as Database>::Arguments<'q> = Default::default();
    for value in values {
        let bound = match value {
            Value::Null => args.add(Option::<String>::None),
            Value::Boolean(v) => args.add(v),
            Value::Integer(v) => args.add(v),
            Value::Float(v) => args.add(v),
            Value::String(v) => args.add(v),
            Value::Timestamp(v) => args.add(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        };
        bound.map_err(|e| Error::Database(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

// ============================================================================
// Row Decoding
// ============================================================================

fn text_from_bytes(bytes: Vec<u8>) -> Result<Value> {
    String::from_utf8(bytes).map(Value::String).map_err(|e| Error::conversion("String", e.as_bytes()))
}

fn decode_any_row(row: &AnyRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.map(Value::Integer)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            v.map(Value::Float)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            v.map(Value::Boolean)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.map(Value::String)
        } else {
            row.try_get::<Option<Vec<u8>>, _>(index)?.map(text_from_bytes).transpose()?
        };
        decoded.insert(column.name().to_string(), value.unwrap_or_default());
    }

    Ok(decoded)
}

/// How a MySQL column is read, chosen from its type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    Boolean,
    Integer,
    Unsigned,
    Float,
    Timestamp,
    Text,
}

fn mysql_decoding(type_name: &str) -> Decoding {
    match type_name {
        "BOOLEAN" => Decoding::Boolean,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Decoding::Integer,
        name if name.ends_with(" UNSIGNED") => Decoding::Unsigned,
        "FLOAT" | "DOUBLE" => Decoding::Float,
        "DATETIME" | "TIMESTAMP" => Decoding::Timestamp,
        _ => Decoding::Text,
    }
}

fn decode_mysql_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let value = match mysql_decoding(column.type_info().name()) {
            Decoding::Boolean => row.try_get::<Option<bool>, _>(index)?.map(Value::Boolean),
            Decoding::Integer => row.try_get::<Option<i64>, _>(index)?.map(Value::Integer),
            Decoding::Unsigned => row
                .try_get::<Option<u64>, _>(index)?
                .map(|v| i64::try_from(v).map(Value::Integer).map_err(|_| Error::conversion("Integer", v)))
                .transpose()?,
            Decoding::Float => row.try_get::<Option<f64>, _>(index)?.map(Value::Float),
            Decoding::Timestamp => row.try_get::<Option<NaiveDateTime>, _>(index)?.map(|v| Value::Timestamp(v.and_utc())),
            Decoding::Text => match row.try_get::<Option<String>, _>(index) {
                Ok(v) => v.map(Value::String),
                Err(_) => row.try_get::<Option<Vec<u8>>, _>(index)?.map(text_from_bytes).transpose()?,
            },
        };
        decoded.insert(column.name().to_string(), value.unwrap_or_default());
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::{Decoding, mysql_decoding};

    #[test]
    fn test_mysql_decoding_by_type_name() {
        assert_eq!(mysql_decoding("BOOLEAN"), Decoding::Boolean);
        assert_eq!(mysql_decoding("INT"), Decoding::Integer);
        assert_eq!(mysql_decoding("BIGINT UNSIGNED"), Decoding::Unsigned);
        assert_eq!(mysql_decoding("DOUBLE"), Decoding::Float);
        assert_eq!(mysql_decoding("DATETIME"), Decoding::Timestamp);
        assert_eq!(mysql_decoding("TEXT"), Decoding::Text);
        assert_eq!(mysql_decoding("VARCHAR"), Decoding::Text);
    }
}
