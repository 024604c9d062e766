use sqlx::postgres::PgArguments;
use sqlx::FromRow;

/// A bindable column value for the entities this store manages.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

pub type Field = (&'static str, FieldValue);

/// Drop any field not on the entity's allow-list (or explicitly excluded),
/// along with fields whose value was not supplied. Columns and values leave
/// here as one sequence, so the n-th placeholder always binds the n-th value.
pub fn filter_fields(
    input: Vec<(&'static str, Option<FieldValue>)>,
    allowed: &[&str],
    excluded: &[&str],
) -> Vec<Field> {
    input
        .into_iter()
        .filter(|(name, _)| allowed.contains(name) && !excluded.contains(name))
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
}

/// Column list, positional placeholders and values for an INSERT, numbered
/// from `index_offset` so the fragment can be spliced after fixed leading
/// parameters.
#[derive(Debug)]
pub struct InsertFragment {
    pub columns: String,
    pub placeholders: String,
    pub values: Vec<FieldValue>,
}

pub fn insert_fragment(fields: Vec<Field>, index_offset: usize) -> InsertFragment {
    let columns = fields
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (0..fields.len())
        .map(|i| format!("${}", i + index_offset))
        .collect::<Vec<_>>()
        .join(", ");
    let values = fields.into_iter().map(|(_, v)| v).collect();

    InsertFragment {
        columns,
        placeholders,
        values,
    }
}

/// `column = $n` assignment list and values for an UPDATE, numbered from
/// `index_offset`.
#[derive(Debug)]
pub struct UpdateFragment {
    pub assignments: String,
    pub values: Vec<FieldValue>,
}

pub fn update_fragment(fields: Vec<Field>, index_offset: usize) -> UpdateFragment {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{} = ${}", name, i + index_offset))
        .collect::<Vec<_>>()
        .join(", ");
    let values = fields.into_iter().map(|(_, v)| v).collect();

    UpdateFragment {
        assignments,
        values,
    }
}

/// Bind a fragment's values in declaration order, after any fixed leading
/// binds the statement already made.
pub fn bind_values_as<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    values: &'q [FieldValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    for v in values {
        q = match v {
            FieldValue::Text(s) => q.bind(s),
            FieldValue::Bool(b) => q.bind(*b),
        };
    }
    q
}
