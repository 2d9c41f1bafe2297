//! Tokenizer for M source text
//!
//! Each source line is tokenized on its own. A line's token sequence starts
//! with an optional [`TokenKind::LeadingWhitespace`] token (indentation) and
//! always ends with a [`TokenKind::TrailingWhitespace`] sentinel.

use std::ops::Range;

use logos::Logos;
use serde::Serialize;

use crate::diagnostics::{error_codes::lexical, Diagnostic};

/// Lexical failures reported by the scanner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
}

/// Token types for M
#[derive(Logos, Debug, Clone, PartialEq, Serialize)]
#[logos(error = LexError)]
pub enum TokenKind {
    /// Indentation at the start of a line
    LeadingWhitespace,
    /// End-of-line sentinel
    TrailingWhitespace,

    #[regex(r"[ \t]")]
    Space,

    #[regex(r"[a-zA-Z][a-zA-Z0-9]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+(\.[0-9]*)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[token("\"", lex_string)]
    Str(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("^")]
    Caret,
    #[token("$")]
    Dollar,
    #[token("#")]
    Hash,
    #[token(".")]
    Dot,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("_")]
    Underscore,
    #[token("!")]
    Bang,
    #[token("&")]
    Ampersand,
    #[token("=")]
    Equals,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("'")]
    Apostrophe,
    #[token(":")]
    Colon,

    #[regex(r";.*", |lex| lex.slice()[1..].to_string())]
    Comment(String),
}

/// Scan the body of a string literal; `""` inside it is an escaped quote.
fn lex_string(lex: &mut logos::Lexer<TokenKind>) -> Result<String, LexError> {
    let rest = lex.remainder();
    let mut text = String::new();
    let mut chars = rest.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '"' {
            if let Some((_, '"')) = chars.peek() {
                chars.next();
                text.push('"');
                continue;
            }
            lex.bump(i + 1);
            return Ok(text);
        }
        text.push(c);
    }

    lex.bump(rest.len());
    Err(LexError::UnterminatedString)
}

impl TokenKind {
    /// Short human-readable description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LeadingWhitespace => "indentation".to_string(),
            TokenKind::TrailingWhitespace => "end of line".to_string(),
            TokenKind::Space => "space".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Comment(_) => "comment".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Caret => "'^'".to_string(),
            TokenKind::Dollar => "'$'".to_string(),
            TokenKind::Hash => "'#'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Underscore => "'_'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::Ampersand => "'&'".to_string(),
            TokenKind::Equals => "'='".to_string(),
            TokenKind::Less => "'<'".to_string(),
            TokenKind::Greater => "'>'".to_string(),
            TokenKind::Apostrophe => "'''".to_string(),
            TokenKind::Colon => "':'".to_string(),
        }
    }
}

/// A token with its character range within the line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }
}

/// The tokens of one source line, always terminated by the end-of-line sentinel
pub type TokenizedLine = Vec<Token>;

/// Tokenize source text line by line.
///
/// Tokenization never aborts: unexpected characters are skipped and
/// unterminated strings are dropped, each with a diagnostic.
pub fn tokenize(source: &str) -> (Vec<TokenizedLine>, Vec<Diagnostic>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for (line_no, raw) in source.lines().enumerate() {
        let text = raw.trim_end();
        let body = text.trim_start();
        let indent = text.len() - body.len();
        let mut tokens = Vec::new();

        if indent > 0 {
            tokens.push(Token::new(TokenKind::LeadingWhitespace, 0..indent));
        }

        let mut lexer = TokenKind::lexer(body);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let range = span.start + indent..span.end + indent;
            match result {
                Ok(kind) => tokens.push(Token::new(kind, range)),
                Err(err) => {
                    let message = match err {
                        LexError::UnexpectedCharacter => {
                            format!("Unexpected character {:?}", lexer.slice())
                        }
                        LexError::UnterminatedString => "Unterminated string".to_string(),
                    };
                    let code = match err {
                        LexError::UnexpectedCharacter => lexical::UNEXPECTED_CHARACTER,
                        LexError::UnterminatedString => lexical::UNTERMINATED_STRING,
                    };
                    errors.push(
                        Diagnostic::error(code)
                            .message(message)
                            .at(line_no, tokens.len())
                            .range(range)
                            .build(),
                    );
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::TrailingWhitespace,
            text.len()..text.len(),
        ));
        lines.push(tokens);
    }

    tracing::debug!(
        lines = lines.len(),
        errors = errors.len(),
        "tokenized source"
    );
    (lines, errors)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
