//! Recursive-descent parser (§4.7): turns a token stream into a [`Statement`]
//! tree. Entry point dispatches on the first token.

use crate::ast::{ColumnDef, SelectItem, Statement};
use crate::lexer::{tokenize, Token, TokenKind};
use catalog::ColumnDefault;
use common::{DbError, DbResult};
use expr::{BinaryOp, Condition, Expression, LogicalOp};
use types::{ColumnType, Value};

/// Parses `sql` into one [`Statement`] per `;`-separated (or bare,
/// terminator-optional) statement.
pub fn parse_sql(sql: &str) -> DbResult<Vec<Statement>> {
    let tokens = tokenize(sql)?;
    let mut parser = Parser::new(tokens);
    let mut statements = Vec::new();
    loop {
        while parser.eat(&TokenKind::Semicolon) {}
        if parser.check(&TokenKind::Eof) {
            break;
        }
        statements.push(parser.parse_statement()?);
        while parser.eat(&TokenKind::Semicolon) {}
    }
    Ok(statements)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Auto-incremented index for each `?` encountered, scoped to the whole
    /// parse (matches §4.7: "starting at 0" with no notion of resetting
    /// between statements in a single parse, since one `Parser` instance
    /// corresponds to one prepared/executed SQL string).
    next_param: u32,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            next_param: 0,
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> DbResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(DbError::UnexpectedToken(format!(
                "expected {kind:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expect_identifier(&mut self) -> DbResult<String> {
        match self.advance() {
            TokenKind::Identifier(name) => Ok(name),
            other => Err(DbError::ExpectedIdentifier(format!("{other:?}"))),
        }
    }

    fn expect_integer(&mut self) -> DbResult<u64> {
        match self.advance() {
            TokenKind::Integer(n) if n >= 0 => Ok(n as u64),
            other => Err(DbError::ExpectedNumber(format!("{other:?}"))),
        }
    }

    fn parse_statement(&mut self) -> DbResult<Statement> {
        match self.peek().clone() {
            TokenKind::Select => self.parse_select(),
            TokenKind::Insert => self.parse_insert(),
            TokenKind::Create => self.parse_create_table(),
            TokenKind::Update => self.parse_update(),
            TokenKind::Delete => self.parse_delete(),
            TokenKind::Begin => {
                self.advance();
                Ok(Statement::Begin)
            }
            TokenKind::Commit => {
                self.advance();
                Ok(Statement::Commit)
            }
            TokenKind::Rollback => {
                self.advance();
                Ok(Statement::Rollback)
            }
            other => Err(DbError::UnexpectedToken(format!(
                "expected a statement, found {other:?}"
            ))),
        }
    }

    // SELECT <cols> FROM <ident> [WHERE <cond>] [LIMIT <int>] [OFFSET <int>]
    fn parse_select(&mut self) -> DbResult<Statement> {
        self.expect(&TokenKind::Select)?;
        let columns = self.parse_select_list()?;
        self.expect(&TokenKind::From)?;
        let table = self.expect_identifier()?;

        let selection = if self.eat(&TokenKind::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        let limit = if self.eat(&TokenKind::Limit) {
            Some(self.expect_integer()?)
        } else {
            None
        };
        let offset = if self.eat(&TokenKind::Offset) {
            Some(self.expect_integer()?)
        } else {
            None
        };

        Ok(Statement::Select {
            columns,
            table,
            selection,
            limit,
            offset,
        })
    }

    fn parse_select_list(&mut self) -> DbResult<Vec<SelectItem>> {
        if self.eat(&TokenKind::Star) {
            return Ok(vec![SelectItem::Wildcard]);
        }
        let mut items = vec![self.parse_select_item()?];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> DbResult<SelectItem> {
        let name = self.expect_identifier()?;
        let alias = if let TokenKind::Identifier(_) = self.peek() {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(SelectItem::Column { name, alias })
    }

    // INSERT INTO <ident> [( <ident-list> )] VALUES ( <val> {, <val>} ) {, ( … )}
    fn parse_insert(&mut self) -> DbResult<Statement> {
        self.expect(&TokenKind::Insert)?;
        self.expect(&TokenKind::Into)?;
        let table = self.expect_identifier()?;

        let columns = if self.eat(&TokenKind::LParen) {
            let mut names = vec![self.expect_identifier()?];
            while self.eat(&TokenKind::Comma) {
                names.push(self.expect_identifier()?);
            }
            self.expect(&TokenKind::RParen)?;
            Some(names)
        } else {
            None
        };

        self.expect(&TokenKind::Values)?;
        let mut rows = vec![self.parse_value_tuple()?];
        while self.eat(&TokenKind::Comma) {
            rows.push(self.parse_value_tuple()?);
        }

        Ok(Statement::Insert {
            table,
            columns,
            rows,
        })
    }

    fn parse_value_tuple(&mut self) -> DbResult<Vec<Expression>> {
        self.expect(&TokenKind::LParen)?;
        let mut values = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RParen)?;
        Ok(values)
    }

    // CREATE TABLE [IF NOT EXISTS] <ident> ( <coldef> {, <coldef>} )
    fn parse_create_table(&mut self) -> DbResult<Statement> {
        self.expect(&TokenKind::Create)?;
        self.expect(&TokenKind::Table)?;

        let if_not_exists = if self.eat(&TokenKind::If) {
            self.expect(&TokenKind::Not)?;
            self.expect(&TokenKind::Exists)?;
            true
        } else {
            false
        };

        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let mut columns = vec![self.parse_column_def()?];
        while self.eat(&TokenKind::Comma) {
            columns.push(self.parse_column_def()?);
        }
        self.expect(&TokenKind::RParen)?;

        Ok(Statement::CreateTable {
            name,
            if_not_exists,
            columns,
        })
    }

    fn parse_column_def(&mut self) -> DbResult<ColumnDef> {
        let name = self.expect_identifier()?;
        let ty_name = self.expect_identifier()?;
        let ty = parse_column_type(&ty_name)?;

        let mut def = ColumnDef {
            name,
            ty,
            is_primary_key: false,
            is_nullable: true,
            is_unique: false,
            default: ColumnDefault::None,
        };

        loop {
            match self.peek().clone() {
                TokenKind::Primary => {
                    self.advance();
                    self.expect(&TokenKind::Key)?;
                    def.is_primary_key = true;
                    def.is_nullable = false;
                }
                TokenKind::Not => {
                    self.advance();
                    self.expect(&TokenKind::Null)?;
                    def.is_nullable = false;
                }
                TokenKind::Unique => {
                    self.advance();
                    def.is_unique = true;
                }
                TokenKind::Default => {
                    self.advance();
                    def.default = self.parse_default_value()?;
                }
                _ => break,
            }
        }

        Ok(def)
    }

    // <default> = <literal> | <funccall> | '(' <default> ')'
    fn parse_default_value(&mut self) -> DbResult<ColumnDefault> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_default_value()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(inner);
        }

        if let TokenKind::Identifier(name) = self.peek().clone() {
            // Disambiguate a function call `ident(...)` from a bare literal
            // identifier, which §4.7's default grammar does not otherwise
            // allow — a literal default is always a literal token.
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::LParen) {
                self.advance();
                self.advance(); // consume '('
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    args.push(self.parse_default_arg()?);
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_default_arg()?);
                    }
                }
                self.expect(&TokenKind::RParen)?;
                return Ok(ColumnDefault::FunctionCall(name, args));
            }
        }

        let value = self.parse_literal()?;
        Ok(ColumnDefault::Literal(value))
    }

    fn parse_default_arg(&mut self) -> DbResult<Value> {
        self.parse_literal()
    }

    fn parse_literal(&mut self) -> DbResult<Value> {
        match self.advance() {
            TokenKind::Integer(n) => Ok(Value::Integer(n)),
            TokenKind::Real(f) => Ok(Value::Real(f)),
            TokenKind::StringLiteral(s) => Ok(Value::Text(s)),
            TokenKind::Null => Ok(Value::Null),
            other => Err(DbError::ExpectedValue(format!("{other:?}"))),
        }
    }

    // UPDATE <ident> SET <ident> = <val> {, <ident> = <val>} [WHERE <cond>]
    fn parse_update(&mut self) -> DbResult<Statement> {
        self.expect(&TokenKind::Update)?;
        let table = self.expect_identifier()?;
        self.expect(&TokenKind::Set)?;

        let mut assignments = vec![self.parse_assignment()?];
        while self.eat(&TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }

        let selection = if self.eat(&TokenKind::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(Statement::Update {
            table,
            assignments,
            selection,
        })
    }

    fn parse_assignment(&mut self) -> DbResult<(String, Expression)> {
        let column = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        Ok((column, value))
    }

    // DELETE FROM <ident> [WHERE <cond>]
    fn parse_delete(&mut self) -> DbResult<Statement> {
        self.expect(&TokenKind::Delete)?;
        self.expect(&TokenKind::From)?;
        let table = self.expect_identifier()?;
        let selection = if self.eat(&TokenKind::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };
        Ok(Statement::Delete { table, selection })
    }

    // condition = comparison {AND|OR comparison}*, left-associative.
    fn parse_condition(&mut self) -> DbResult<Condition> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::And => LogicalOp::And,
                TokenKind::Or => LogicalOp::Or,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Condition::Logical(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> DbResult<Condition> {
        let left = self.parse_expression()?;
        let op = match self.advance() {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            other => return Err(DbError::ExpectedOperator(format!("{other:?}"))),
        };
        let right = self.parse_expression()?;
        Ok(Condition::Comparison(left, op, right))
    }

    // expression = identifier | literal | '?'
    fn parse_expression(&mut self) -> DbResult<Expression> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Column(name))
            }
            TokenKind::Question => {
                self.advance();
                let idx = self.next_param;
                self.next_param += 1;
                Ok(Expression::Parameter(idx))
            }
            TokenKind::Integer(_) | TokenKind::Real(_) | TokenKind::StringLiteral(_) | TokenKind::Null => {
                Ok(Expression::Literal(self.parse_literal()?))
            }
            other => Err(DbError::ExpectedValue(format!("{other:?}"))),
        }
    }
}

fn parse_column_type(name: &str) -> DbResult<ColumnType> {
    match name.to_ascii_uppercase().as_str() {
        "INTEGER" => Ok(ColumnType::Integer),
        "TEXT" => Ok(ColumnType::Text),
        "REAL" => Ok(ColumnType::Real),
        "BLOB" => Ok(ColumnType::Blob),
        other => Err(DbError::UnknownDataType(other.to_string())),
    }
}
