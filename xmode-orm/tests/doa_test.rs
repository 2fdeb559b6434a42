use futures::future::BoxFuture;
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
};
use xmode_orm::{
    Attributes, Create, Dialect, Doa, Error, Executor, Fetched, Model, MySql, Params, Result, Row, Value,
};

/// Records every statement and answers queries from a queue of result sets.
#[derive(Default)]
struct Recorder {
    statements: Mutex<Vec<(String, Params)>>,
    results: Mutex<VecDeque<Vec<Row>>>,
}

impl Recorder {
    fn answer(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    fn statements(&self) -> Vec<(String, Params)> {
        self.statements.lock().unwrap().clone()
    }

    fn last(&self) -> (String, Params) {
        self.statements.lock().unwrap().last().cloned().expect("no statement was run")
    }
}

impl Executor for Recorder {
    fn run<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<()>> {
        self.statements.lock().unwrap().push((sql.to_string(), params));
        Box::pin(async { Ok(()) })
    }

    fn run_and_return<'a>(&'a self, sql: &'a str, params: Params) -> BoxFuture<'a, Result<Vec<Row>>> {
        self.statements.lock().unwrap().push((sql.to_string(), params));
        let rows = self.results.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(async move { Ok(rows) })
    }
}

#[derive(Debug, Clone, PartialEq, Model)]
#[orm(
    stored_in = "tasks",
    save_query(name = "open", query = "SELECT * FROM tasks WHERE `status`='new'"),
    save_query(name = "count", query = "SELECT COUNT(*) AS total FROM tasks", auto_mapping = false)
)]
struct Task {
    #[orm(id)]
    id: String,
    #[orm(default = "new")]
    status: String,
    note: Option<String>,
    #[orm(column = "priority_level", default = 1)]
    priority: i64,
}

static NEXT_TICKET: AtomicI64 = AtomicI64::new(1);

fn next_ticket() -> i64 {
    NEXT_TICKET.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Clone, PartialEq, Model)]
struct Ticket {
    #[orm(id, default_with = next_ticket)]
    number: i64,
    subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Model)]
struct Memo {
    body: String,
}

fn attributes(pairs: &[(&str, Value)]) -> Attributes {
    pairs.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}

fn task_row(id: &str, status: &str, note: Value, priority: Value) -> Row {
    attributes(&[
        ("id", Value::from(id)),
        ("status", Value::from(status)),
        ("note", note),
        ("priority_level", priority),
    ])
}

fn keys(params: &Params) -> Vec<&str> {
    params.keys().map(String::as_str).collect()
}

#[tokio::test]
async fn test_create_from_attributes_applies_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());

    let created = doa.create(Create::<Task>::with_attributes(attributes(&[("id", Value::from("t-1"))]))).await?;
    assert!(created.is_none());

    let (query, params) = doa.db().last();
    assert_eq!(
        query,
        "INSERT INTO tasks (`id`, `status`, `priority_level`, `note`) VALUE (:id, :status, :priority_level, :note)"
    );
    assert_eq!(keys(&params), ["id", "status", "priority_level", "note"]);
    assert_eq!(params["status"], Value::from("new"));
    assert_eq!(params["priority_level"], Value::Integer(1));
    assert_eq!(params["note"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_create_keeps_given_values_over_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());

    let request = Create::<Task>::with_attributes(attributes(&[
        ("id", Value::from("t-2")),
        ("status", Value::from("done")),
        ("note", Value::from("shipped")),
    ]))
    .returning();
    let created = doa.create(request).await?.ok_or("nothing returned")?;

    assert_eq!(
        created,
        Task { id: "t-2".to_string(), status: "done".to_string(), note: Some("shipped".to_string()), priority: 1 }
    );
    let (_, params) = doa.db().last();
    assert_eq!(params["status"], Value::from("done"));
    Ok(())
}

#[tokio::test]
async fn test_create_calls_producer_once_per_creation() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());

    let first = doa.create(Create::<Ticket>::with_attributes(Attributes::new()).returning()).await?;
    let second = doa.create(Create::<Ticket>::with_attributes(Attributes::new()).returning()).await?;

    let first = first.ok_or("nothing returned")?;
    let second = second.ok_or("nothing returned")?;
    assert_ne!(first.number, second.number);
    assert_eq!(second.number, first.number + 1);
    assert_eq!(first.subject, None);

    let (query, _) = doa.db().last();
    assert_eq!(query, "INSERT INTO ticket (`number`, `subject`) VALUE (:number, :subject)");
    Ok(())
}

#[tokio::test]
async fn test_create_from_entity() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    let task = Task { id: "t-3".to_string(), status: "new".to_string(), note: None, priority: 5 };

    let created = doa.create(Create::with_entity(task.clone()).returning()).await?;
    assert_eq!(created, Some(task));

    let (query, params) = doa.db().last();
    assert_eq!(
        query,
        "INSERT INTO tasks (`id`, `status`, `note`, `priority_level`) VALUE (:id, :status, :note, :priority_level)"
    );
    assert_eq!(params["priority_level"], Value::Integer(5));
    Ok(())
}

#[tokio::test]
async fn test_create_needs_exactly_one_source() {
    let doa = Doa::new(Recorder::default());
    let task = Task { id: "t-4".to_string(), status: "new".to_string(), note: None, priority: 1 };

    assert!(matches!(doa.create(Create::<Task>::default()).await, Err(Error::Creation(_))));

    let both = Create::with_entity(task).attributes(Attributes::new());
    assert!(matches!(doa.create(both).await, Err(Error::Creation(_))));

    assert!(doa.db().statements().is_empty());
}

#[tokio::test]
async fn test_create_rejects_unknown_attributes() {
    let doa = Doa::new(Recorder::default());

    let request = Create::<Task>::with_attributes(attributes(&[("id", Value::from("t-5")), ("color", Value::from("red"))]));
    let result = doa.create(request).await;

    assert!(matches!(result, Err(Error::UnknownAttribute { attribute, .. }) if attribute == "color"));
}

#[tokio::test]
async fn test_save_updates_every_attribute() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    let task = Task { id: "t-6".to_string(), status: "done".to_string(), note: None, priority: 3 };

    doa.save(&task).await?;

    let (query, params) = doa.db().last();
    assert_eq!(
        query,
        "UPDATE tasks SET `id`=:updated_id, `status`=:updated_status, `note`=:updated_note, \
         `priority_level`=:updated_priority_level WHERE `id`=:current_id"
    );
    assert_eq!(
        keys(&params),
        ["current_id", "updated_id", "updated_status", "updated_note", "updated_priority_level"]
    );
    assert_eq!(params["current_id"], Value::from("t-6"));
    assert_eq!(params["updated_note"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_save_selected_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    let task = Task { id: "t-7".to_string(), status: "archived".to_string(), note: None, priority: 2 };

    doa.save_attributes(&task, &["status"]).await?;

    let (query, params) = doa.db().last();
    assert_eq!(query, "UPDATE tasks SET `status`=:updated_status WHERE `id`=:current_id");
    assert_eq!(keys(&params), ["current_id", "updated_status"]);

    let result = doa.save_attributes(&task, &[]).await;
    assert!(matches!(result, Err(Error::NoUpdate(entity)) if entity.starts_with("tasks(id=")));
    Ok(())
}

#[tokio::test]
async fn test_save_and_refresh_need_identity() {
    let doa = Doa::new(Recorder::default());
    let mut memo = Memo { body: "call back".to_string() };

    assert!(matches!(doa.save(&memo).await, Err(Error::MissingIdentity(model)) if model == "Memo"));
    assert!(matches!(doa.refresh(&mut memo).await, Err(Error::MissingIdentity(_))));
    assert!(doa.db().statements().is_empty());
}

#[tokio::test]
async fn test_find_maps_rows() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    doa.db().answer(vec![
        task_row("t-8", "new", Value::Null, Value::Integer(2)),
        task_row("t-9", "new", Value::from("later"), Value::String("4".to_string())),
    ]);

    let mut params = Params::new();
    params.insert("status".to_string(), Value::from("new"));
    let tasks = doa
        .find::<Task>(Some("`status`=:status"), params)
        .await?
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, "t-8");
    assert_eq!(tasks[1].note.as_deref(), Some("later"));
    assert_eq!(tasks[1].priority, 4);

    let (query, params) = doa.db().last();
    assert_eq!(query, "SELECT * FROM tasks WHERE `status`=:status");
    assert_eq!(params["status"], Value::from("new"));
    Ok(())
}

#[tokio::test]
async fn test_find_without_rows_or_filter() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());

    let mut tasks = doa.find::<Task>(None, Params::new()).await?;
    assert!(tasks.next().is_none());
    assert_eq!(doa.db().last().0, "SELECT * FROM tasks");
    Ok(())
}

#[tokio::test]
async fn test_play_saved_queries() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    doa.db().answer(vec![task_row("t-10", "new", Value::Null, Value::Integer(1))]);
    doa.db().answer(vec![attributes(&[("total", Value::Integer(7))])]);

    let open = doa.play::<Task>("open", Params::new()).await?.collect::<Result<Vec<_>, _>>()?;
    assert!(matches!(&open[..], [Fetched::Entity(task)] if task.id == "t-10"));
    assert_eq!(doa.db().last().0, "SELECT * FROM tasks WHERE `status`='new'");

    let count = doa.play::<Task>("count", Params::new()).await?.next().ok_or("no row")??;
    assert_eq!(count.into_row().and_then(|row| row.get("total").cloned()), Some(Value::Integer(7)));

    let unknown = doa.play::<Task>("closed", Params::new()).await;
    assert!(matches!(unknown, Err(Error::UnknownSavedQuery(name)) if name == "closed"));
    Ok(())
}

#[tokio::test]
async fn test_refresh_reloads_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());
    let mut task = Task { id: "t-11".to_string(), status: "new".to_string(), note: None, priority: 1 };
    doa.db().answer(vec![task_row("t-11", "archived", Value::from("moved"), Value::Integer(9))]);

    doa.refresh(&mut task).await?;

    assert_eq!(task.status, "archived");
    assert_eq!(task.note.as_deref(), Some("moved"));
    assert_eq!(task.priority, 9);

    let (query, params) = doa.db().last();
    assert_eq!(query, "SELECT * FROM tasks WHERE `id`=:id");
    assert_eq!(params["id"], Value::from("t-11"));
    Ok(())
}

#[tokio::test]
async fn test_refresh_leaves_entity_untouched_on_bad_row() {
    let doa = Doa::new(Recorder::default());
    let original = Task { id: "t-13".to_string(), status: "new".to_string(), note: None, priority: 3 };
    let mut task = original.clone();
    doa.db().answer(vec![task_row("t-13", "archived", Value::from("moved"), Value::from("not-a-number"))]);

    let result = doa.refresh(&mut task).await;

    assert!(matches!(result, Err(Error::Conversion { expected: "Integer", .. })));
    assert_eq!(task, original);
}

#[tokio::test]
async fn test_refresh_removed_entity() {
    let doa = Doa::new(Recorder::default());
    let mut task = Task { id: "t-12".to_string(), status: "new".to_string(), note: None, priority: 1 };

    let result = doa.refresh(&mut task).await;
    assert!(matches!(result, Err(Error::EntityRemoved(entity)) if entity == "tasks(id='t-12')"));
}

#[tokio::test]
async fn test_create_table_and_installer() -> Result<(), Box<dyn std::error::Error>> {
    let doa = Doa::new(Recorder::default());

    doa.create_table::<Memo>(&MySql).await?;
    assert_eq!(doa.db().last().0, "CREATE TABLE memo (`body` VARCHAR(255) NOT NULL)");

    doa.installer(MySql).register::<Task>().register::<Ticket>().run().await?;

    let statements = doa.db().statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[1].0, MySql.convert_class_to_create_query::<Task>()?);
    assert!(statements[2].0.starts_with("CREATE TABLE ticket ("));
    Ok(())
}
