use chrono::{DateTime, Utc};
use uuid::Uuid;
use xmode_orm::{Model, Text};

#[derive(Debug, Clone, Model)]
#[orm(
	stored_in = "tasks",
	save_query(name = "open", query = "SELECT * FROM tasks WHERE `status`='new'"),
	save_query(
		name = "summary",
		query = "SELECT `status`, COUNT(*) AS total FROM tasks GROUP BY `status`",
		auto_mapping = false
	)
)]
pub struct Task {
	#[orm(id, default_with = Uuid::new_v4)]
	pub id: Uuid,
	#[orm(index)]
	pub title: String,
	pub details: Option<Text>,
	#[orm(default = "new")]
	pub status: String,
	#[orm(column = "created_at", default_with = Utc::now)]
	pub created: DateTime<Utc>,
	pub _selected: bool,
}
