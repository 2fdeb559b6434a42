use crate::{Dialect, Doa, Executor, Model, Params, Result};

/// Builds the CREATE TABLE statement of one registered model.
pub type InstallTask = fn(&dyn Dialect) -> Result<String>;

/// Creates the tables of several models, in registration order.
///
/// Existing tables are not inspected or altered.
pub struct Installer<'a, E, D> {
    pub(crate) doa: &'a Doa<E>,
    pub(crate) dialect: D,
    pub(crate) tasks: Vec<(&'static str, InstallTask)>,
}

impl<'a, E: Executor, D: Dialect> Installer<'a, E, D> {
    /// Creates a new Installer instance running statements through `doa`.
    pub fn new(doa: &'a Doa<E>, dialect: D) -> Self {
        Self { doa, dialect, tasks: Vec::new() }
    }

    /// Registers a Model for installation.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// Installer::new(&doa, MySql)
    ///   .register::<User>()
    ///   .register::<Post>()
    ///   .run()
    ///   .await?;
    /// ```
    pub fn register<T: Model>(mut self) -> Self {
        fn create_query<T: Model>(dialect: &dyn Dialect) -> Result<String> {
            let spec = crate::analyze::<T>()?;
            let spec = spec.read();
            dialect.generate_create_query(&spec)
        }

        self.tasks.push((T::model_name(), create_query::<T>));
        self
    }

    /// Generates every statement first, then runs them one by one.
    pub async fn run(self) -> Result<()> {
        let statements = self
            .tasks
            .iter()
            .map(|(name, task)| task(&self.dialect).map(|query| (*name, query)))
            .collect::<Result<Vec<_>>>()?;

        for (name, query) in statements {
            log::info!("creating table for `{name}`");
            self.doa.db().run(&query, Params::new()).await?;
        }
        Ok(())
    }
}

impl<E: Executor> Doa<E> {
    /// Returns a new Installer for creating the tables of registered models.
    pub fn installer<D: Dialect>(&self, dialect: D) -> Installer<'_, E, D> {
        Installer::new(self, dialect)
    }
}
