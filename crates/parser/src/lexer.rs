//! Hand-rolled tokenizer (§4.6): lexes SQL text into a stream ending in
//! [`TokenKind::Eof`]. Case-insensitive keyword recognition; no escape
//! processing inside string literals.

use common::{DbError, DbResult};

/// One lexical token. `text` retains the original source slice only for
/// identifiers/strings/numbers where the parser needs the literal value;
/// operator/keyword tokens carry no payload beyond their `kind`.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords (§4.6's exact keyword table).
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Table,
    And,
    Or,
    Like,
    In,
    Null,
    Not,
    Primary,
    Key,
    Unique,
    Begin,
    Commit,
    Rollback,
    If,
    Exists,
    Limit,
    Offset,
    Default,

    Identifier(String),
    Integer(i64),
    Real(f64),
    StringLiteral(String),

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Star,
    Question,

    Eof,
}

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match word.to_ascii_uppercase().as_str() {
        "SELECT" => Select,
        "FROM" => From,
        "WHERE" => Where,
        "INSERT" => Insert,
        "INTO" => Into,
        "VALUES" => Values,
        "UPDATE" => Update,
        "SET" => Set,
        "DELETE" => Delete,
        "CREATE" => Create,
        "TABLE" => Table,
        "AND" => And,
        "OR" => Or,
        "LIKE" => Like,
        "IN" => In,
        "NULL" => Null,
        "NOT" => Not,
        "PRIMARY" => Primary,
        "KEY" => Key,
        "UNIQUE" => Unique,
        "BEGIN" => Begin,
        "COMMIT" => Commit,
        "ROLLBACK" => Rollback,
        "IF" => If,
        "EXISTS" => Exists,
        "LIMIT" => Limit,
        "OFFSET" => Offset,
        "DEFAULT" => Default,
        _ => return None,
    })
}

/// Lexes `sql` into a token stream terminated by a single `Eof` token.
pub fn tokenize(sql: &str) -> DbResult<Vec<Token>> {
    let bytes = sql.as_bytes();
    let mut i = 0usize;
    let mut tokens = Vec::new();

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let mut saw_dot = false;
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch.is_ascii_digit() {
                    i += 1;
                } else if ch == '.' && !saw_dot {
                    saw_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            let text = &sql[start..i];
            let kind = if saw_dot {
                let v: f64 = text
                    .parse()
                    .map_err(|_| DbError::ExpectedNumber(text.to_string()))?;
                TokenKind::Real(v)
            } else {
                let v: i64 = text
                    .parse()
                    .map_err(|_| DbError::ExpectedNumber(text.to_string()))?;
                TokenKind::Integer(v)
            };
            tokens.push(Token { kind });
            continue;
        }

        if c == '_' || c.is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch == '_' || ch.is_ascii_alphanumeric() {
                    i += 1;
                } else {
                    break;
                }
            }
            let text = &sql[start..i];
            let kind = keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
            tokens.push(Token { kind });
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let start = i;
            let mut terminated = false;
            while i < bytes.len() {
                if bytes[i] as char == quote {
                    terminated = true;
                    break;
                }
                i += 1;
            }
            if !terminated {
                return Err(DbError::UnterminatedString);
            }
            let text = sql[start..i].to_string();
            i += 1; // consume closing quote
            tokens.push(Token {
                kind: TokenKind::StringLiteral(text),
            });
            continue;
        }

        let kind = match c {
            '=' => {
                i += 1;
                TokenKind::Eq
            }
            '!' if bytes.get(i + 1) == Some(&b'=') => {
                i += 2;
                TokenKind::Ne
            }
            '<' if bytes.get(i + 1) == Some(&b'=') => {
                i += 2;
                TokenKind::Le
            }
            '<' => {
                i += 1;
                TokenKind::Lt
            }
            '>' if bytes.get(i + 1) == Some(&b'=') => {
                i += 2;
                TokenKind::Ge
            }
            '>' => {
                i += 1;
                TokenKind::Gt
            }
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            ';' => {
                i += 1;
                TokenKind::Semicolon
            }
            '*' => {
                i += 1;
                TokenKind::Star
            }
            '?' => {
                i += 1;
                TokenKind::Question
            }
            other => return Err(DbError::UnexpectedCharacter(other)),
        };
        tokens.push(Token { kind });
    }

    tokens.push(Token { kind: TokenKind::Eof });
    Ok(tokens)
}
