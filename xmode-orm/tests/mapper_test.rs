use chrono::{TimeZone, Utc};
use uuid::Uuid;
use xmode_orm::{Error, LongText, Mapper, Model, Row, Text, Value};

#[derive(Debug, Clone, PartialEq, Model)]
struct Note {
    #[orm(id)]
    id: Uuid,
    #[orm(column = "heading")]
    title: String,
    body: Text,
    appendix: Option<LongText>,
    pinned: bool,
    views: i64,
    score: f64,
    written_at: chrono::DateTime<Utc>,
    _draft: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Model)]
struct Sticker {
    #[orm(id)]
    id: i64,
    label: Option<String>,
    glossy: bool,
}

fn sample() -> Note {
    Note {
        id: Uuid::new_v4(),
        title: "Groceries".to_string(),
        body: Text::from("milk, eggs"),
        appendix: None,
        pinned: true,
        views: 12,
        score: 4.5,
        written_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        _draft: Some("unsaved".to_string()),
    }
}

fn columns(note: &Note) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), Value::from(note.id));
    row.insert("heading".to_string(), Value::from(note.title.as_str()));
    row.insert("body".to_string(), Value::from(note.body.to_string()));
    row.insert("appendix".to_string(), Value::Null);
    row.insert("pinned".to_string(), Value::Integer(1));
    row.insert("views".to_string(), Value::String("12".to_string()));
    row.insert("score".to_string(), Value::Float(4.5));
    row.insert("written_at".to_string(), Value::String("2024-03-01 09:30:00".to_string()));
    row
}

#[test]
fn test_to_object_casts_columns() -> Result<(), Box<dyn std::error::Error>> {
    let note = sample();
    let mapped: Note = Mapper::to_object(columns(&note))?;

    assert_eq!(mapped.id, note.id);
    assert_eq!(mapped.title, "Groceries");
    assert_eq!(mapped.appendix, None);
    assert!(mapped.pinned);
    assert_eq!(mapped.views, 12);
    assert_eq!(mapped.written_at, note.written_at);
    assert_eq!(mapped._draft, None);
    Ok(())
}

#[test]
fn test_to_object_rejects_unknown_columns() {
    let mut row = columns(&sample());
    row.insert("color".to_string(), Value::from("red"));

    let result = Mapper::to_object::<Note>(row);
    assert!(matches!(result, Err(Error::UnknownField { field, .. }) if field == "color"));
}

#[test]
fn test_to_object_requires_non_optional_columns() {
    let mut row = columns(&sample());
    row.shift_remove("views");

    assert!(matches!(Mapper::to_object::<Note>(row), Err(Error::MissingAttribute(name)) if name == "views"));
}

#[test]
fn test_to_row_uses_attribute_names() -> Result<(), Box<dyn std::error::Error>> {
    let note = sample();
    let attributes = Mapper::to_row(&note, &[])?;

    let names: Vec<&str> = attributes.keys().map(String::as_str).collect();
    assert_eq!(names, ["id", "title", "body", "appendix", "pinned", "views", "score", "written_at"]);
    assert_eq!(attributes["id"], Value::String(note.id.to_string()));
    assert_eq!(attributes["appendix"], Value::Null);
    assert_eq!(attributes["pinned"], Value::Boolean(true));
    assert_eq!(attributes["written_at"], Value::Timestamp(note.written_at));
    Ok(())
}

#[test]
fn test_to_row_skips_excluded_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let attributes = Mapper::to_row(&sample(), &["body", "score", "_draft"])?;

    assert!(!attributes.contains_key("body"));
    assert!(!attributes.contains_key("score"));
    assert_eq!(attributes.len(), 6);
    Ok(())
}

#[test]
fn test_column_keyed_row_maps_back_to_the_same_object() -> Result<(), Box<dyn std::error::Error>> {
    let note = Note { _draft: None, ..sample() };
    let row = Mapper::to_columns(&note, &[])?;

    assert_eq!(row["heading"], Value::from("Groceries"));
    assert!(!row.contains_key("title"));
    assert_eq!(Mapper::to_object::<Note>(row)?, note);
    Ok(())
}

#[test]
fn test_attribute_keyed_row_maps_back_without_renamed_columns() -> Result<(), Box<dyn std::error::Error>> {
    let sticker = Sticker { id: 4, label: None, glossy: true };
    assert_eq!(Mapper::to_object::<Sticker>(Mapper::to_row(&sticker, &[])?)?, sticker);

    let renamed = Mapper::to_row(&sample(), &[])?;
    assert!(matches!(Mapper::to_object::<Note>(renamed), Err(Error::UnknownField { field, .. }) if field == "title"));
    Ok(())
}
