//! Recursive-descent parser for the query language.
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! select  := "select" ("*" | ident ("," ident)*) "from" ident where?
//! insert  := "insert" "into" ident "(" ident ("," ident)* ")"
//!            "values" "(" operand ("," operand)* ")"
//! update  := "update" ident "set" ident "=" operand ("," ident "=" operand)* where?
//! delete  := "delete" "from" ident where?
//! where   := "where" term ("and" term)*
//! term    := ident op operand
//! op      := "=" | "!=" | "<" | "<=" | ">" | ">="
//! operand := ":" ident | int | float | 'text' | "true" | "false" | "null"
//! ```
//!
//! Table and column names are validated against the schema registry and
//! literals are coerced to the type of the column they meet.

mod lexer;

pub use lexer::{tokenize, Keyword, Token, TokenKind};

use crate::ast::{
    ColumnRef, DeleteOp, InsertOp, Operand, Predicate, Projection, QueryDescriptor, QueryOp,
    SelectOp, SetClause, Term, UpdateOp,
};
use crate::error::ParseError;
use rivulet_core::schema::{SchemaRegistry, Table};
use rivulet_core::{CompareOp, Value};
use std::sync::Arc;

/// Compiles a query string into a descriptor.
pub fn parse(input: &str, registry: &SchemaRegistry) -> Result<QueryDescriptor, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        registry,
    };
    let op = parser.statement()?;
    parser.expect_end()?;
    Ok(QueryDescriptor::new(op))
}

/// A name as written, with its position for error reporting.
struct Name {
    text: String,
    position: usize,
}

struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'r SchemaRegistry,
}

impl<'r> Parser<'r> {
    fn peek(&self) -> &Token {
        // tokenize always ends with End, and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::syntax(
            token.position,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().kind == TokenKind::Keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(&format!("'{}'", keyword.as_str())))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error_here(&kind.describe()))
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match &self.peek().kind {
            TokenKind::End => Ok(()),
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("or") => Err(ParseError::syntax(
                self.peek().position,
                "'or' is not supported; terms can only be joined with 'and'",
            )),
            _ => Err(self.error_here("end of input")),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<Name, ParseError> {
        let position = self.peek().position;
        match &self.peek().kind {
            TokenKind::Ident(text) => {
                let text = text.clone();
                self.advance();
                Ok(Name { text, position })
            }
            _ => Err(self.error_here(what)),
        }
    }

    fn table(&mut self) -> Result<Arc<Table>, ParseError> {
        let name = self.identifier("a table name")?;
        self.registry
            .lookup(&name.text)
            .ok_or(ParseError::UnknownTable {
                table: name.text,
                position: name.position,
            })
    }

    fn statement(&mut self) -> Result<QueryOp, ParseError> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Select) => self.select().map(QueryOp::Select),
            TokenKind::Keyword(Keyword::Insert) => self.insert().map(QueryOp::Insert),
            TokenKind::Keyword(Keyword::Update) => self.update().map(QueryOp::Update),
            TokenKind::Keyword(Keyword::Delete) => self.delete().map(QueryOp::Delete),
            _ => Err(self.error_here("'select', 'insert', 'update' or 'delete'")),
        }
    }

    fn select(&mut self) -> Result<SelectOp, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let names = if self.eat(&TokenKind::Star) {
            None
        } else {
            Some(self.name_list()?)
        };
        self.expect_keyword(Keyword::From)?;
        let table = self.table()?;

        let projection = match names {
            None => Projection::All,
            Some(names) => {
                let mut columns = resolve_columns(&table, &names)?;
                columns.sort_by_key(|c| c.index);
                Projection::Columns(columns)
            }
        };
        let predicate = self.where_clause(&table)?;
        Ok(SelectOp {
            table: table.name().to_string(),
            projection,
            predicate,
        })
    }

    fn insert(&mut self) -> Result<InsertOp, ParseError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.table()?;

        self.expect(TokenKind::LParen)?;
        let names = self.name_list()?;
        self.expect(TokenKind::RParen)?;
        let columns = resolve_columns(&table, &names)?;

        self.expect_keyword(Keyword::Values)?;
        let values_position = self.peek().position;
        self.expect(TokenKind::LParen)?;
        let mut values = Vec::with_capacity(columns.len());
        loop {
            let column = columns.get(values.len());
            values.push(self.operand(&table, column)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        if values.len() != columns.len() {
            return Err(ParseError::syntax(
                values_position,
                format!(
                    "{} columns listed but {} values given",
                    columns.len(),
                    values.len()
                ),
            ));
        }
        Ok(InsertOp {
            table: table.name().to_string(),
            columns,
            values,
        })
    }

    fn update(&mut self) -> Result<UpdateOp, ParseError> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.table()?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments: Vec<SetClause> = Vec::new();
        loop {
            let name = self.identifier("a column name")?;
            let column = resolve_column(&table, &name)?;
            if assignments.iter().any(|a| a.column.index == column.index) {
                return Err(ParseError::DuplicateColumn {
                    column: name.text,
                    position: name.position,
                });
            }
            self.expect(TokenKind::Op(CompareOp::Eq))?;
            let operand = self.operand(&table, Some(&column))?;
            assignments.push(SetClause { column, operand });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let predicate = self.where_clause(&table)?;
        Ok(UpdateOp {
            table: table.name().to_string(),
            assignments,
            predicate,
        })
    }

    fn delete(&mut self) -> Result<DeleteOp, ParseError> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.table()?;
        let predicate = self.where_clause(&table)?;
        Ok(DeleteOp {
            table: table.name().to_string(),
            predicate,
        })
    }

    fn name_list(&mut self) -> Result<Vec<Name>, ParseError> {
        let mut names = vec![self.identifier("a column name")?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.identifier("a column name")?);
        }
        Ok(names)
    }

    fn where_clause(&mut self, table: &Table) -> Result<Predicate, ParseError> {
        if !self.eat_keyword(Keyword::Where) {
            return Ok(Predicate::default());
        }
        let mut terms = vec![self.term(table)?];
        while self.eat_keyword(Keyword::And) {
            terms.push(self.term(table)?);
        }
        Ok(Predicate::new(terms))
    }

    fn term(&mut self, table: &Table) -> Result<Term, ParseError> {
        if self.peek().kind == TokenKind::LParen {
            return Err(ParseError::syntax(
                self.peek().position,
                "parenthesized predicates are not supported",
            ));
        }
        let name = self.identifier("a column name")?;
        let column = resolve_column(table, &name)?;
        let op = match self.peek().kind {
            TokenKind::Op(op) => {
                self.advance();
                op
            }
            _ => return Err(self.error_here("a comparison operator")),
        };
        let operand = self.operand(table, Some(&column))?;
        Ok(Term {
            column,
            op,
            operand,
        })
    }

    /// Parses a placeholder or literal. Literals are coerced to `column`'s type.
    fn operand(&mut self, table: &Table, column: Option<&ColumnRef>) -> Result<Operand, ParseError> {
        let literal = match &self.peek().kind {
            TokenKind::Placeholder(name) => {
                let name = name.clone();
                self.advance();
                return Ok(Operand::Placeholder(name));
            }
            TokenKind::Int(v) => Value::Int(*v),
            TokenKind::Float(v) => Value::Float(*v),
            TokenKind::Text(v) => Value::Text(v.clone()),
            TokenKind::Keyword(Keyword::True) => Value::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Value::Boolean(false),
            TokenKind::Keyword(Keyword::Null) => Value::Null,
            _ => return Err(self.error_here("a placeholder or literal")),
        };
        self.advance();

        let column = match column {
            Some(column) => column,
            // surplus insert value; the arity check reports it
            None => return Ok(Operand::Literal(literal)),
        };
        match literal.coerce_to(column.data_type) {
            Some(value) => Ok(Operand::Literal(value)),
            None => Err(ParseError::LiteralType {
                table: table.name().to_string(),
                column: column.name.clone(),
                expected: column.data_type,
                literal: literal.to_string(),
            }),
        }
    }
}

fn resolve_column(table: &Table, name: &Name) -> Result<ColumnRef, ParseError> {
    table
        .get_column(&name.text)
        .map(|c| ColumnRef::new(c.name(), c.index(), c.data_type()))
        .ok_or_else(|| ParseError::UnknownColumn {
            table: table.name().to_string(),
            column: name.text.clone(),
            position: name.position,
        })
}

fn resolve_columns(table: &Table, names: &[Name]) -> Result<Vec<ColumnRef>, ParseError> {
    let mut columns: Vec<ColumnRef> = Vec::with_capacity(names.len());
    for name in names {
        let column = resolve_column(table, &name)?;
        if columns.iter().any(|c| c.index == column.index) {
            return Err(ParseError::DuplicateColumn {
                column: name.text.clone(),
                position: name.position,
            });
        }
        columns.push(column);
    }
    Ok(columns)
}
