// fun_project_root/fun_core/src/lexer.rs
use crate::error::FunError;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum TokenType {
    Placeholder, // $_

    // Literals
    Int,
    Float,
    String,
    True,
    False,
    Null,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Lt,
    Gt,

    // Grouping and indexing
    Lparen,
    Rparen,
    Lbracket,
    Rbracket,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenLiteralValue {
    Int(i64),
    Float(f64),
    String(Arc<str>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<TokenLiteralValue>,
    pub col: usize, // 1-indexed character offset into the expression
}

impl Token {
    pub fn new(
        token_type: TokenType,
        lexeme: String,
        literal: Option<TokenLiteralValue>,
        col: usize,
    ) -> Self {
        Token {
            token_type,
            lexeme,
            literal,
            col,
        }
    }
}

lazy_static! {
    // Order matters for matching! Keywords before anything word-like, float
    // before int, two-character operators before their one-character prefixes.
    static ref TOKEN_REGEX_PATTERNS: Vec<(TokenType, Regex)> = vec![
        (TokenType::Placeholder, Regex::new(r"^\$_").unwrap()),

        (TokenType::True, Regex::new(r"^\btrue\b").unwrap()),
        (TokenType::False, Regex::new(r"^\bfalse\b").unwrap()),
        (TokenType::Null, Regex::new(r"^\bnull\b").unwrap()),

        (TokenType::String, Regex::new(r#"^"(?:\\.|[^"\\])*""#).unwrap()),
        (TokenType::String, Regex::new(r"^'(?:\\.|[^'\\])*'").unwrap()),

        (TokenType::Float, Regex::new(r"^\d+\.\d+").unwrap()),
        (TokenType::Int, Regex::new(r"^\d+").unwrap()),

        (TokenType::EqEq, Regex::new(r"^==").unwrap()),
        (TokenType::NotEq, Regex::new(r"^!=").unwrap()),
        (TokenType::LtEq, Regex::new(r"^<=").unwrap()),
        (TokenType::GtEq, Regex::new(r"^>=").unwrap()),
        (TokenType::Lt, Regex::new(r"^<").unwrap()),
        (TokenType::Gt, Regex::new(r"^>").unwrap()),
        (TokenType::Plus, Regex::new(r"^\+").unwrap()),
        (TokenType::Minus, Regex::new(r"^-").unwrap()),
        (TokenType::Star, Regex::new(r"^\*").unwrap()),
        (TokenType::Slash, Regex::new(r"^/").unwrap()),
        (TokenType::Percent, Regex::new(r"^%").unwrap()),

        (TokenType::Lparen, Regex::new(r"^\(").unwrap()),
        (TokenType::Rparen, Regex::new(r"^\)").unwrap()),
        (TokenType::Lbracket, Regex::new(r"^\[").unwrap()),
        (TokenType::Rbracket, Regex::new(r"^\]").unwrap()),
    ];
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"^\s+").unwrap();

    // Namespaced identifiers with an optional single `::member` suffix.
    static ref CALLABLE_NAME_REGEX: Regex =
        Regex::new(r"^(\\?[A-Za-z_][A-Za-z0-9_]*)+(::[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

/// True when `name` is a bare callable reference (`foo`, `a\b`, `\a\b::c`)
/// rather than an expression.
pub fn is_callable_name(name: &str) -> bool {
    CALLABLE_NAME_REGEX.is_match(name)
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other), // \\, \", \' and anything else stand for themselves
            None => out.push('\\'),
        }
    }
    out
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, FunError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut current_offset = 0; // Byte offset in the source string

    while current_offset < source.len() {
        let remaining_source = &source[current_offset..];
        let current_char_col = source[..current_offset].chars().count() + 1;

        if let Some(mat) = WHITESPACE_REGEX.find(remaining_source) {
            current_offset += mat.as_str().len();
            continue;
        }

        let mut found_match = false;
        for (token_type, regex) in TOKEN_REGEX_PATTERNS.iter() {
            if let Some(mat) = regex.find(remaining_source) {
                let lexeme = mat.as_str().to_string();
                let literal_value = match token_type {
                    TokenType::Int => match lexeme.parse::<i64>() {
                        Ok(num) => Some(TokenLiteralValue::Int(num)),
                        Err(_) => {
                            return Err(FunError::Lexer(format!(
                                "Integer literal out of range: '{}' at col {}",
                                lexeme, current_char_col
                            )))
                        }
                    },
                    TokenType::Float => match lexeme.parse::<f64>() {
                        Ok(num) => Some(TokenLiteralValue::Float(num)),
                        Err(_) => {
                            return Err(FunError::Lexer(format!(
                                "Invalid number format: '{}' at col {}",
                                lexeme, current_char_col
                            )))
                        }
                    },
                    TokenType::String => Some(TokenLiteralValue::String(Arc::from(unescape(
                        &lexeme[1..lexeme.len() - 1],
                    )))),
                    _ => None,
                };

                current_offset += lexeme.len();
                tokens.push(Token::new(*token_type, lexeme, literal_value, current_char_col));
                found_match = true;
                break;
            }
        }

        if !found_match {
            let offending_char = remaining_source.chars().next().unwrap_or('?');
            return Err(FunError::Lexer(format!(
                "Unexpected character: '{}' at col {}",
                offending_char, current_char_col
            )));
        }
    }

    tokens.push(Token::new(
        TokenType::Eof,
        String::new(),
        None,
        source.chars().count() + 1,
    ));
    Ok(tokens)
}
