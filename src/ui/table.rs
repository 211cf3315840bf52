use tabled::builder::Builder;
use tabled::settings::Style;

use crate::model::Row;

/// Render fetched rows as a table; columns come from the first row
pub fn rows_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let columns: Vec<String> = first.columns().map(str::to_string).collect();
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(columns.iter().map(|column| match row.get(column) {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(serde_json::Value::Null) | None => "NULL".to_string(),
            Some(other) => other.to_string(),
        }));
    }

    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_table() {
        assert!(rows_table(&[]).is_empty());

        let serde_json::Value::Object(fields) = json!({"id": 1, "name": "Ann", "email": null}) else {
            unreachable!()
        };
        let table = rows_table(&[Row::new(fields)]);
        assert!(table.contains("name"));
        assert!(table.contains("Ann"));
        assert!(table.contains("NULL"));
    }
}
