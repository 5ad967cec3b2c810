//! SQL Parser wrapper

use piggyback_common::{PiggybackError, Result};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// SQL Parser wrapper
pub struct SqlParser;

impl SqlParser {
    /// Parse SQL into AST
    pub fn parse(sql: &str) -> Result<Vec<sqlparser::ast::Statement>> {
        let dialect = GenericDialect {};
        Parser::parse_sql(&dialect, sql).map_err(|e| PiggybackError::SqlParse(e.to_string()))
    }

    /// Parse a single SQL statement
    pub fn parse_statement(sql: &str) -> Result<sqlparser::ast::Statement> {
        let mut statements = Self::parse(sql)?;
        if statements.len() > 1 {
            return Err(PiggybackError::SqlParse(format!(
                "expected one statement, found {}",
                statements.len()
            )));
        }
        statements
            .pop()
            .ok_or_else(|| PiggybackError::SqlParse("Empty SQL".to_string()))
    }
}
