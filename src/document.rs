//! On-disk shape of a board.
//!
//! The document is positional: columns and tasks are stored in display
//! order and carry no identifiers. WIP limits are written as strings and
//! read back from either strings or numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDocument {
    #[serde(default)]
    pub columns: Vec<ColumnRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub name: String,
    #[serde(
        default,
        serialize_with = "write_limit",
        deserialize_with = "read_limit"
    )]
    pub wip_limit: u32,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "nullable_text")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub assignee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "nullable_text")]
    pub description: String,
}

impl BoardDocument {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn task_total(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

fn write_limit<S: Serializer>(limit: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&limit.to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Number(f64),
    Text(String),
}

// Strings and numbers follow one rule: negative or fractional values
// count as unlimited, oversized ones are kept so the range check rejects
// them.
fn read_limit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Option::<RawLimit>::deserialize(deserializer)? {
        Some(RawLimit::Number(n)) => limit_from(n),
        Some(RawLimit::Text(text)) => text.trim().parse::<f64>().map_or(0, limit_from),
        None => 0,
    })
}

fn limit_from(value: f64) -> u32 {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        0
    } else if value > f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

fn nullable_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wip_limit_is_written_as_string() {
        let doc = BoardDocument {
            columns: vec![ColumnRecord {
                name: "Doing".into(),
                wip_limit: 3,
                tasks: vec![],
            }],
        };
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains(r#""wip_limit": "3""#));
        assert_eq!(BoardDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn wip_limit_accepts_numbers_and_falls_back_on_garbage() {
        let doc = BoardDocument::from_json(
            r#"{"columns": [
                {"name": "A", "wip_limit": 4},
                {"name": "B", "wip_limit": "many"},
                {"name": "C"}
            ]}"#,
        )
        .unwrap();
        let limits: Vec<_> = doc.columns.iter().map(|c| c.wip_limit).collect();
        assert_eq!(limits, vec![4, 0, 0]);
    }

    #[test]
    fn wip_limit_text_and_numbers_read_alike() {
        let doc = BoardDocument::from_json(
            r#"{"columns": [
                {"name": "A", "wip_limit": -1},
                {"name": "B", "wip_limit": "-1"},
                {"name": "C", "wip_limit": 2.0},
                {"name": "D", "wip_limit": "2.0"},
                {"name": "E", "wip_limit": 2.5},
                {"name": "F", "wip_limit": " 7 "},
                {"name": "G", "wip_limit": 9999999999}
            ]}"#,
        )
        .unwrap();
        let limits: Vec<_> = doc.columns.iter().map(|c| c.wip_limit).collect();
        assert_eq!(limits, vec![0, 0, 2, 2, 0, 7, u32::MAX]);
    }

    #[test]
    fn task_fields_tolerate_nulls_and_absence() {
        let doc = BoardDocument::from_json(
            r#"{"columns": [{"name": "To Do", "wip_limit": "0", "tasks": [
                {"title": "Loaded", "assignee": null, "start_date": "2024-01-02"}
            ]}]}"#,
        )
        .unwrap();
        let task = &doc.columns[0].tasks[0];
        assert_eq!(task.assignee, "");
        assert_eq!(task.start_date.as_deref(), Some("2024-01-02"));
        assert_eq!(task.end_date, None);
        assert_eq!(task.description, "");
        assert_eq!(doc.task_total(), 1);
    }

    #[test]
    fn unset_dates_are_omitted() {
        let record = TaskRecord {
            title: "t".into(),
            assignee: String::new(),
            start_date: None,
            end_date: None,
            description: String::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("start_date"));
        assert!(!json.contains("end_date"));
    }
}
