//! Tokenizer for formula strings.
//!
//! Scans the source left to right, skipping whitespace, and produces a flat list of
//! [`Token`]s. Identifiers are deliberately permissive: any run that starts with a
//! letter, `_` or a non-ASCII character (so `Δ`, `α_2` and `x1` are all valid names)
//! becomes either a reserved function, a named constant or a variable.

use std::f64::consts::{E, PI, TAU};
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::LexError;
use crate::functions::Func;

/// Binary (and, for `+`/`-`, prefix) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    /// Binding power when used as an infix operator. Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Pow => 3,
        }
    }

    /// `^` is right-associative, everything else is left-associative.
    pub fn is_right_associative(self) -> bool {
        matches!(self, Operator::Pow)
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Pow),
            _ => None,
        }
    }
}

/// The tag and payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal or named constant
    Number(f64),
    /// Anything that is not a reserved name
    Identifier(String),
    Operator(Operator),
    /// Reserved function name
    Function(Func),
    LeftParen,
    RightParen,
}

/// A token together with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::Operator(op) => write!(f, "{}", op.symbol()),
            TokenKind::Function(func) => write!(f, "{}", func.name()),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
        }
    }
}

/// Splits `source` into tokens.
///
/// # Errors
/// Returns `LexError::EmptyInput` for an empty string, `LexError::UnrecognizedCharacter`
/// for ASCII punctuation that belongs to no token, and `LexError::InvalidNumber` for a
/// malformed numeric literal.
///
/// # Example
/// ```
/// use mexpress::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("round 2.3").unwrap();
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[1].kind, TokenKind::Number(2.3));
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    if source.is_empty() {
        return Err(LexError::EmptyInput);
    }

    let mut tokens = Vec::with_capacity(source.len() / 2 + 1);
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if let Some(op) = Operator::from_char(c) {
            chars.next();
            TokenKind::Operator(op)
        } else if c == '(' {
            chars.next();
            TokenKind::LeftParen
        } else if c == ')' {
            chars.next();
            TokenKind::RightParen
        } else if c.is_ascii_digit() || (c == '.' && next_is_digit(source, position + 1)) {
            let literal = take_number(source, &mut chars);
            let value = literal
                .parse::<f64>()
                .map_err(|_| LexError::InvalidNumber {
                    literal: literal.to_string(),
                    position,
                })?;
            TokenKind::Number(value)
        } else if is_identifier_start(c) {
            classify_word(take_identifier(source, &mut chars))
        } else {
            return Err(LexError::UnrecognizedCharacter {
                character: c,
                position,
            });
        };

        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

fn classify_word(word: &str) -> TokenKind {
    if let Some(func) = Func::from_name(word) {
        return TokenKind::Function(func);
    }
    match word {
        "PI" | "π" => TokenKind::Number(PI),
        "TAU" | "τ" => TokenKind::Number(TAU),
        "E" => TokenKind::Number(E),
        _ => TokenKind::Identifier(word.to_string()),
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || (!c.is_ascii() && !c.is_whitespace() && !c.is_control())
}

fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

fn next_is_digit(source: &str, offset: usize) -> bool {
    source[offset..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

fn take_identifier<'a>(source: &'a str, chars: &mut Peekable<CharIndices<'a>>) -> &'a str {
    let start = chars.peek().map_or(source.len(), |&(i, _)| i);
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !is_identifier_continue(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    &source[start..end]
}

/// Consumes `digits [. digits] [(e|E) [+|-] digits]`. The exponent part is only taken
/// when at least one digit follows it.
fn take_number<'a>(source: &'a str, chars: &mut Peekable<CharIndices<'a>>) -> &'a str {
    let start = chars.peek().map_or(source.len(), |&(i, _)| i);
    let mut end = start;

    // repeated dots are swallowed here so that `1.2.3` fails as one literal
    while let Some(&(i, c)) = chars.peek() {
        if !(c.is_ascii_digit() || c == '.') {
            break;
        }
        end = i + 1;
        chars.next();
    }

    if let Some(&(i, 'e' | 'E')) = chars.peek() {
        let rest = &source[i + 1..];
        let sign_len = usize::from(rest.starts_with(|c: char| c == '+' || c == '-'));
        if next_is_digit(rest, sign_len) {
            // exponent marker and optional sign
            for _ in 0..=sign_len {
                chars.next();
            }
            end = i + 1 + sign_len;
            while let Some(&(j, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                end = j + 1;
                chars.next();
            }
        }
    }

    &source[start..end]
}
