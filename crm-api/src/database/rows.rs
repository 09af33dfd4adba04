use rusqlite::types::Type;
use rusqlite::{Connection, Row, ToSql};
use shared_types::ParseEnumError;
use std::str::FromStr;

fn conversion_error(idx: usize, e: ParseEnumError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Read a text column into one of the shared enums.
pub fn enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_error(idx, e))
}

pub fn optional_enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = ParseEnumError>,
{
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| v.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Column assignments for a partial `UPDATE`, always stamping `updated_at`.
pub struct Patch {
    updates: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Patch {
    pub fn new(now: i64) -> Self {
        Self {
            updates: vec!["updated_at = ?".to_string()],
            params: vec![Box::new(now)],
        }
    }

    pub fn set<T: ToSql + 'static>(&mut self, column: &str, value: T) -> &mut Self {
        self.updates.push(format!("{column} = ?"));
        self.params.push(Box::new(value));
        self
    }

    /// Adds the assignment only when a value is supplied.
    pub fn set_opt<T: ToSql + 'static>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn execute(mut self, conn: &Connection, table: &str, id: i64) -> rusqlite::Result<usize> {
        self.params.push(Box::new(id));
        let query = format!("UPDATE {table} SET {} WHERE id = ?", self.updates.join(", "));
        let params_refs: Vec<&dyn ToSql> = self.params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&query, params_refs.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::DealStage;

    #[test]
    fn test_enum_column_rejects_unknown_tag() {
        let conn = Connection::open_in_memory().unwrap();
        let ok: DealStage = conn
            .query_row("SELECT 'closed-won'", [], |row| enum_column(row, 0))
            .unwrap();
        assert_eq!(ok, DealStage::ClosedWon);

        let bad = conn.query_row("SELECT 'won'", [], |row| enum_column::<DealStage>(row, 0));
        assert!(bad.is_err());

        let none: Option<DealStage> = conn
            .query_row("SELECT NULL", [], |row| optional_enum_column(row, 0))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_patch_only_touches_supplied_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, a TEXT, b TEXT, updated_at INTEGER);
             INSERT INTO t VALUES (1, 'a0', 'b0', 0);",
        )
        .unwrap();

        let mut patch = Patch::new(42);
        patch.set_opt("a", Some("a1".to_string()));
        patch.set_opt::<String>("b", None);
        assert_eq!(patch.execute(&conn, "t", 1).unwrap(), 1);

        let row: (String, String, i64) = conn
            .query_row("SELECT a, b, updated_at FROM t WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(row, ("a1".to_string(), "b0".to_string(), 42));
    }
}
