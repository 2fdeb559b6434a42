use xmode_orm::{Attributes, Create, Dialect, MySql, Params, Value};

use crate::tasks::Task;

mod database;
mod tasks;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();
	env_logger::init();

	println!("{};", MySql.convert_class_to_create_query::<Task>()?);

	let Some(doa) = database::initialize().await? else {
		log::info!("XMODE_DATABASE_URL is not set, nothing else to do");
		return Ok(());
	};

	let mut attributes = Attributes::new();
	attributes.insert("title".to_string(), Value::from("write the release notes"));
	let mut task = doa
		.create(Create::<Task>::with_attributes(attributes).returning())
		.await?
		.ok_or("create returned nothing")?;
	log::info!("created {}", task.id);

	for open in doa.play::<Task>("open", Params::new()).await? {
		println!("open: {:?}", open?.into_entity());
	}

	task.status = "done".to_string();
	doa.save_attributes(&task, &["status"]).await?;
	doa.refresh(&mut task).await?;
	println!("refreshed: {task:?}");

	let mut params = Params::new();
	params.insert("status".to_string(), Value::from("done"));
	let done = doa.find::<Task>(Some("`status`=:status"), params).await?.count();
	println!("{done} task(s) done");

	for row in doa.play::<Task>("summary", Params::new()).await? {
		if let Some(row) = row?.into_row() {
			println!("{}", serde_json::to_string(&row)?);
		}
	}

	Ok(())
}
