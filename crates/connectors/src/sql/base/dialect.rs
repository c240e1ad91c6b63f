//! Defines the `Dialect` trait for database-specific SQL syntax.

/// Upper bound on bind parameters in one statement, shared by MySQL and
/// PostgreSQL (both use a 16-bit parameter count).
pub const MAX_BIND_PARAMS: usize = 65_535;

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    ///
    /// Schema-qualified names are quoted part by part.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for the zero-based parameter `index`.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Renders a placeholder that binds a 64-bit integer.
    fn integer_placeholder(&self, index: usize) -> String {
        self.get_placeholder(index)
    }

    /// Renders a selected column coerced to the type the reader decodes.
    fn select_expr(&self, column: &str, as_integer: bool) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| format!(r#""{part}""#))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn integer_placeholder(&self, index: usize) -> String {
        // Pin the parameter type so an INT4 id column still binds an i64.
        format!("${}::BIGINT", index + 1)
    }

    fn select_expr(&self, column: &str, as_integer: bool) -> String {
        let quoted = self.quote_identifier(column);
        if as_integer {
            format!("{quoted}::BIGINT")
        } else {
            format!("{quoted}::TEXT")
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| format!("`{part}`"))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn select_expr(&self, column: &str, _as_integer: bool) -> String {
        self.quote_identifier(column)
    }
}
