//! Tokenizer for the Cypher subset.
//! Keywords match case-insensitively, identifiers stay case-sensitive.
//! Numbers take an optional leading `-` when it cannot be a binary minus,
//! strings accept single or double quotes with backslash escapes, and
//! `$name` produces a parameter token. Tokens carry the byte offset they
//! started at so parse errors can point into the query text.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Match,
    Optional,
    Return,
    Create,
    Merge,
    Set,
    Delete,
    Where,
    Foreach,
    In,
    On,
    Unwind,
    As,
    Order,
    By,
    Limit,
    Skip,
    With,
    Call,
    Union,
    All,
    And,
    Or,
    Not,
    Asc,
    Desc,
    Distinct,
    Is,
    Null,
    Starts,
    Ends,
    Contains,
    True,
    False,
}

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    use Keyword::*;
    HashMap::from([
        ("MATCH", Match),
        ("OPTIONAL", Optional),
        ("RETURN", Return),
        ("CREATE", Create),
        ("MERGE", Merge),
        ("SET", Set),
        ("DELETE", Delete),
        ("WHERE", Where),
        ("FOREACH", Foreach),
        ("IN", In),
        ("ON", On),
        ("UNWIND", Unwind),
        ("AS", As),
        ("ORDER", Order),
        ("BY", By),
        ("LIMIT", Limit),
        ("SKIP", Skip),
        ("WITH", With),
        ("CALL", Call),
        ("UNION", Union),
        ("ALL", All),
        ("AND", And),
        ("OR", Or),
        ("NOT", Not),
        ("ASC", Asc),
        ("DESC", Desc),
        ("DISTINCT", Distinct),
        ("IS", Is),
        ("NULL", Null),
        ("STARTS", Starts),
        ("ENDS", Ends),
        ("CONTAINS", Contains),
        ("TRUE", True),
        ("FALSE", False),
    ])
});

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Param(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Comma,
    Dot,
    Eq,
    Lt,
    Gt,
    Plus,
    Dash,
    Star,
    Slash,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{:?}", k),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::Param(p) => write!(f, "${}", p),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Dash => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

/// Strip `//` line comments and `/* ... */` block comments (nesting
/// tolerated) while preserving string literals. Newlines inside comments
/// survive so byte offsets of later lines stay roughly stable.
pub fn strip_comments(input: &str) -> String {
    let bytes = input.as_bytes();
    // Work on bytes and reassemble at the end; only whole ASCII characters
    // are ever removed, so the result stays valid UTF-8.
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    let mut quote: Option<u8> = None;
    let mut block_depth = 0i32;
    let mut line_comment = false;

    while i < bytes.len() {
        let b = bytes[i];
        if line_comment {
            if b == b'\n' {
                out.push(b'\n');
                line_comment = false;
            }
            i += 1;
            continue;
        }
        if block_depth > 0 {
            if b == b'\n' || b == b'\r' {
                out.push(b);
                i += 1;
                continue;
            }
            if b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
                block_depth += 1;
                i += 2;
                continue;
            }
            if b == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                block_depth -= 1;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if let Some(q) = quote {
            if b == b'\\' && i + 1 < bytes.len() {
                out.push(bytes[i]);
                out.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            out.push(b);
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                out.push(b);
                i += 1;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                line_comment = true;
                i += 2;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                block_depth = 1;
                i += 2;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_default()
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, tokens: Vec::new() }
    }

    /// Tokenize the whole input. Fails with `SyntaxError(position)` on the
    /// first unrecognized character or unterminated string.
    pub fn tokenize(mut self) -> EngineResult<Vec<Token>> {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
                continue;
            }
            let start = self.pos;
            match ch {
                '(' => self.push_punct(TokenKind::LParen),
                ')' => self.push_punct(TokenKind::RParen),
                '{' => self.push_punct(TokenKind::LBrace),
                '}' => self.push_punct(TokenKind::RBrace),
                '[' => self.push_punct(TokenKind::LBracket),
                ']' => self.push_punct(TokenKind::RBracket),
                ':' => self.push_punct(TokenKind::Colon),
                ';' => self.push_punct(TokenKind::Semicolon),
                ',' => self.push_punct(TokenKind::Comma),
                '.' => self.push_punct(TokenKind::Dot),
                '=' => self.push_punct(TokenKind::Eq),
                '<' => self.push_punct(TokenKind::Lt),
                '>' => self.push_punct(TokenKind::Gt),
                '+' => self.push_punct(TokenKind::Plus),
                '*' => self.push_punct(TokenKind::Star),
                '/' => self.push_punct(TokenKind::Slash),
                '-' => {
                    if self.next_is_digit() && !self.prev_ends_operand() {
                        self.read_number(start)?;
                    } else {
                        self.push_punct(TokenKind::Dash);
                    }
                }
                '\'' | '"' => self.read_string(start, ch)?,
                '$' => self.read_param(start)?,
                c if c.is_ascii_digit() => self.read_number(start)?,
                c if c.is_alphabetic() || c == '_' => self.read_word(start),
                c => {
                    return Err(EngineError::syntax(
                        format!("unrecognized character '{}'", c),
                        start,
                    ));
                }
            }
        }
        trace!(target: "cyphera::lexer", "tokenized {} tokens", self.tokens.len());
        Ok(self.tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn push_punct(&mut self, kind: TokenKind) {
        self.tokens.push(Token { kind, pos: self.pos });
        self.pos += 1;
    }

    fn next_is_digit(&self) -> bool {
        self.src[self.pos..].chars().nth(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
    }

    // A `-` right after something that ends an operand is a binary minus,
    // never a number sign.
    fn prev_ends_operand(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            Some(TokenKind::Ident(_))
            | Some(TokenKind::Int(_))
            | Some(TokenKind::Float(_))
            | Some(TokenKind::Str(_))
            | Some(TokenKind::Param(_))
            | Some(TokenKind::RParen)
            | Some(TokenKind::RBracket)
            | Some(TokenKind::RBrace)
            | Some(TokenKind::Keyword(Keyword::Null))
            | Some(TokenKind::Keyword(Keyword::True))
            | Some(TokenKind::Keyword(Keyword::False)) => true,
            _ => false,
        }
    }

    fn read_number(&mut self, start: usize) -> EngineResult<()> {
        let mut end = self.pos;
        let bytes = self.src.as_bytes();
        if bytes[end] == b'-' {
            end += 1;
        }
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let mut is_float = false;
        if end < bytes.len()
            && bytes[end] == b'.'
            && end + 1 < bytes.len()
            && bytes[end + 1].is_ascii_digit()
        {
            is_float = true;
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        let text = &self.src[self.pos..end];
        let kind = if is_float {
            TokenKind::Float(text.parse::<f64>().map_err(|_| {
                EngineError::syntax(format!("invalid number '{}'", text), start)
            })?)
        } else {
            TokenKind::Int(text.parse::<i64>().map_err(|_| {
                EngineError::syntax(format!("invalid number '{}'", text), start)
            })?)
        };
        self.tokens.push(Token { kind, pos: start });
        self.pos = end;
        Ok(())
    }

    fn read_string(&mut self, start: usize, quote: char) -> EngineResult<()> {
        let mut out = String::new();
        let mut chars = self.src[self.pos + 1..].char_indices();
        while let Some((off, c)) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some((_, esc)) => out.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    }),
                    None => break,
                }
                continue;
            }
            if c == quote {
                self.tokens.push(Token { kind: TokenKind::Str(out), pos: start });
                self.pos = start + 1 + off + c.len_utf8();
                return Ok(());
            }
            out.push(c);
        }
        Err(EngineError::syntax("unterminated string literal", start))
    }

    fn read_param(&mut self, start: usize) -> EngineResult<()> {
        let rest = &self.src[self.pos + 1..];
        let len = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(|c| c.len_utf8())
            .sum::<usize>();
        if len == 0 {
            return Err(EngineError::syntax("expected parameter name after '$'", start));
        }
        let name = rest[..len].to_string();
        self.tokens.push(Token { kind: TokenKind::Param(name), pos: start });
        self.pos = start + 1 + len;
        Ok(())
    }

    fn read_word(&mut self, start: usize) {
        let len = self.src[self.pos..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(|c| c.len_utf8())
            .sum::<usize>();
        let word = &self.src[start..start + len];
        let kind = match KEYWORDS.get(word.to_ascii_uppercase().as_str()) {
            Some(kw) => TokenKind::Keyword(*kw),
            None => TokenKind::Ident(word.to_string()),
        };
        self.tokens.push(Token { kind, pos: start });
        self.pos = start + len;
    }
}

/// Strip comments, then tokenize.
pub fn tokenize(input: &str) -> EngineResult<Vec<Token>> {
    Lexer::new(&strip_comments(input)).tokenize()
}
