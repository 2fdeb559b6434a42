use std::env;

use xmode_orm::{Core, Doa, MySql};

use crate::tasks::Task;

/// Connects to the configured database and creates the demo tables.
///
/// Returns `None` when no database is configured.
pub async fn initialize() -> Result<Option<Doa<Core>>, Box<dyn std::error::Error>> {
	let Ok(url) = env::var("XMODE_DATABASE_URL") else {
		return Ok(None);
	};
	let name = env::var("XMODE_DATABASE_NAME").unwrap_or_else(|_| "xmode".to_string());
	let max_connections = match env::var("XMODE_MAX_CONNECTIONS") {
		Ok(value) => value.parse()?,
		Err(_) => 5,
	};

	let core = Core::builder().max_connections(max_connections).build(&url, &name);
	let doa = Doa::new(core);
	doa.installer(MySql).register::<Task>().run().await?;

	Ok(Some(doa))
}
