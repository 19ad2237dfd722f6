use tabled::{settings::Style, Table, Tabled};

use crate::object::ObjectType;
use crate::storage::DbStats;
use crate::value::Fields;

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Type")]
    name: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: usize,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// One row per column of an object, NULLs shown as `-`
pub fn fields_table(fields: &Fields) -> String {
    let rows: Vec<FieldRow> = fields
        .iter()
        .map(|(name, value)| FieldRow {
            name: name.to_string(),
            value: if value.is_null() {
                "-".to_string()
            } else {
                value.to_string()
            },
        })
        .collect();
    render(&rows)
}

pub fn types_table(types: &[ObjectType]) -> String {
    let rows: Vec<TypeRow> = types
        .iter()
        .map(|t| TypeRow {
            id: t.id,
            name: t.name.clone(),
            created_at: t.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();
    render(&rows)
}

pub fn stats_table(stats: &DbStats) -> String {
    let rows = [
        MetricRow { metric: "Types", value: stats.types },
        MetricRow { metric: "Live objects", value: stats.objects },
        MetricRow { metric: "Masters", value: stats.masters },
        MetricRow { metric: "Deleted", value: stats.deleted },
    ];
    render(&rows)
}
