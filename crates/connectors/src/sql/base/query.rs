use crate::sql::base::{
    dialect::{Dialect, MAX_BIND_PARAMS},
    table::{DestTable, SourceTable},
};
use model::pagination::cursor::Cursor;

/// Columns bound per inserted row.
pub const INSERT_COLUMNS: usize = 2;

/// Largest batch a single multi-row insert can carry.
pub const MAX_INSERT_ROWS: usize = MAX_BIND_PARAMS / INSERT_COLUMNS;

/// Renders the statements used by the SQL connectors.
pub struct QueryGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Keyset select over `source`, ordered by id.
    ///
    /// Binds the cursor id first (only for `Cursor::After`), then the limit
    /// when `limited` is set.
    pub fn select_after(&self, source: &SourceTable, cursor: &Cursor, limited: bool) -> String {
        let d = self.dialect;
        let id = d.quote_identifier(&source.id_column);
        let mut sql = format!(
            "SELECT {}, {} FROM {}",
            d.select_expr(&source.id_column, true),
            d.select_expr(&source.text_column, false),
            d.quote_identifier(&source.table),
        );

        let mut param = 0;
        if let Cursor::After { .. } = cursor {
            sql.push_str(&format!(" WHERE {id} > {}", d.integer_placeholder(param)));
            param += 1;
        }

        sql.push_str(&format!(" ORDER BY {id} ASC"));

        if limited {
            sql.push_str(&format!(" LIMIT {}", d.integer_placeholder(param)));
        }

        sql
    }

    /// Multi-row `INSERT` for `rows` records into `dest`.
    pub fn insert_values(&self, dest: &DestTable, rows: usize) -> String {
        let d = self.dialect;
        let values = (0..rows)
            .map(|row| {
                let base = row * INSERT_COLUMNS;
                format!(
                    "({}, {})",
                    d.get_placeholder(base),
                    d.get_placeholder(base + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}, {}) VALUES {}",
            d.quote_identifier(&dest.table),
            d.quote_identifier(&dest.part1_column),
            d.quote_identifier(&dest.part2_column),
            values
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::dialect::{MySql, Postgres};

    #[test]
    fn test_mysql_keyset_select() {
        let generator = QueryGenerator::new(&MySql);
        let source = SourceTable::default();

        assert_eq!(
            generator.select_after(&source, &Cursor::Start, true),
            "SELECT `id`, `title` FROM `origin_table` ORDER BY `id` ASC LIMIT ?"
        );
        assert_eq!(
            generator.select_after(&source, &Cursor::After { id: 10 }, true),
            "SELECT `id`, `title` FROM `origin_table` WHERE `id` > ? ORDER BY `id` ASC LIMIT ?"
        );
        assert_eq!(
            generator.select_after(&source, &Cursor::After { id: 10 }, false),
            "SELECT `id`, `title` FROM `origin_table` WHERE `id` > ? ORDER BY `id` ASC"
        );
    }

    #[test]
    fn test_postgres_keyset_select_casts() {
        let generator = QueryGenerator::new(&Postgres);
        let source = SourceTable::default();

        assert_eq!(
            generator.select_after(&source, &Cursor::After { id: 3 }, true),
            r#"SELECT "id"::BIGINT, "title"::TEXT FROM "origin_table" WHERE "id" > $1::BIGINT ORDER BY "id" ASC LIMIT $2::BIGINT"#
        );
        assert_eq!(
            generator.select_after(&source, &Cursor::Start, true),
            r#"SELECT "id"::BIGINT, "title"::TEXT FROM "origin_table" ORDER BY "id" ASC LIMIT $1::BIGINT"#
        );
    }

    #[test]
    fn test_insert_values() {
        let dest = DestTable {
            table: "public.dest".into(),
            ..DestTable::default()
        };

        assert_eq!(
            QueryGenerator::new(&Postgres).insert_values(&dest, 2),
            r#"INSERT INTO "public"."dest" ("title1", "title2") VALUES ($1, $2), ($3, $4)"#
        );
        assert_eq!(
            QueryGenerator::new(&MySql).insert_values(&dest, 1),
            "INSERT INTO `public`.`dest` (`title1`, `title2`) VALUES (?, ?)"
        );
    }
}
