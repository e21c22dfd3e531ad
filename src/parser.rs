//! Precedence parser from tokens to a name-keyed syntax tree.
//!
//! Binding strength, tightest first:
//!
//! 1. function application (`sin(x)`, `round 2.3`)
//! 2. unary `-` and `+`
//! 3. `^`, right-associative
//! 4. `*` and `/`, left-associative
//! 5. `+` and `-`, left-associative
//!
//! so `-x^2` is `(-x)^2`, `2^3^2` is `2^9` and `sin x^2` is `(sin x)^2`. A function takes a
//! single primary operand: a parenthesized expression, a number, a variable or another
//! function application.
//!
//! Variables are not resolved here. Every identifier is recorded in a [`Registry`] and
//! kept by name in the [`Ast`]; slots are assigned afterwards by
//! [`build_expr`](crate::convert::build_expr).

use crate::errors::ParseError;
use crate::functions::Func;
use crate::lexer::{Operator, Token, TokenKind};
use crate::registry::Registry;

/// Deepest nesting the parser accepts, counted both in open groups (parentheses, signs,
/// function operands) and in the height of the resulting tree.
pub const MAX_DEPTH: usize = 512;

/// Syntax tree with variables still referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Number(f64),
    Variable(String),
    Neg(Box<Ast>),
    Binary(Operator, Box<Ast>, Box<Ast>),
    Call(Func, Box<Ast>),
}

/// Parses a complete token stream.
///
/// Returns the syntax tree together with every variable name it references.
///
/// # Errors
/// Returns a [`ParseError`] for an empty stream, unbalanced parentheses, leftover tokens,
/// calls to unknown functions and functions without an operand. Input nested deeper than
/// [`MAX_DEPTH`] is rejected with [`ParseError::NestingTooDeep`], so a long left-leaning
/// chain such as a sum of more than 512 terms is refused as well.
///
/// # Example
/// ```
/// use mexpress::lexer::tokenize;
/// use mexpress::parser::parse_tokens;
///
/// let tokens = tokenize("y * (x + 1)").unwrap();
/// let (_, registry) = parse_tokens(&tokens).unwrap();
/// assert_eq!(registry.finalize().names(), &["x", "y"]);
/// ```
pub fn parse_tokens(tokens: &[Token]) -> Result<(Ast, Registry), ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        registry: Registry::new(),
    };

    let (ast, _) = parser.parse_expr(0)?;

    if let Some(token) = parser.current() {
        return Err(match token.kind {
            TokenKind::RightParen => ParseError::UnbalancedParentheses {
                position: token.position,
            },
            _ => ParseError::TrailingTokens {
                token: token.kind.to_string(),
                position: token.position,
            },
        });
    }

    Ok((ast, parser.registry))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    registry: Registry,
}

/// A subtree together with its height.
type Node = (Ast, usize);

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn descend(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_DEPTH,
                position,
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn grow(height: usize, position: usize) -> Result<usize, ParseError> {
        let height = height + 1;
        if height > MAX_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_DEPTH,
                position,
            });
        }
        Ok(height)
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Node, ParseError> {
        let (mut left, mut height) = self.parse_unary()?;

        while let Some(token) = self.current() {
            let op = match token.kind {
                TokenKind::Operator(op) => op,
                _ => break,
            };

            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();

            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            self.descend(token.position)?;
            let (right, right_height) = self.parse_expr(next_min)?;
            self.ascend();

            height = Self::grow(height.max(right_height), token.position)?;
            left = Ast::Binary(op, Box::new(left), Box::new(right));
        }

        Ok((left, height))
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let token = self.current().ok_or(ParseError::UnexpectedEnd)?;

        match token.kind {
            TokenKind::Operator(Operator::Sub) => {
                self.advance();
                self.descend(token.position)?;
                let (inner, height) = self.parse_unary()?;
                self.ascend();
                Ok((
                    Ast::Neg(Box::new(inner)),
                    Self::grow(height, token.position)?,
                ))
            }
            TokenKind::Operator(Operator::Add) => {
                self.advance();
                self.descend(token.position)?;
                let node = self.parse_unary()?;
                self.ascend();
                Ok(node)
            }
            _ => self.parse_application(),
        }
    }

    fn parse_application(&mut self) -> Result<Node, ParseError> {
        let token = self.current().ok_or(ParseError::UnexpectedEnd)?;

        match token.kind {
            TokenKind::Function(func) => {
                self.advance();
                self.descend(token.position)?;
                let (operand, height) = self.parse_operand(func, token.position)?;
                self.ascend();
                Ok((
                    Ast::Call(func, Box::new(operand)),
                    Self::grow(height, token.position)?,
                ))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_operand(&mut self, func: Func, position: usize) -> Result<Node, ParseError> {
        let missing = || ParseError::MissingOperand {
            function: func.name().to_string(),
            position,
        };

        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Function(_)) => self.parse_application(),
            Some(TokenKind::LeftParen | TokenKind::Number(_) | TokenKind::Identifier(_)) => {
                self.parse_primary()
            }
            _ => Err(missing()),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.current().ok_or(ParseError::UnexpectedEnd)?;

        match &token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok((Ast::Number(*n), 1))
            }

            TokenKind::Identifier(name) => {
                self.advance();
                if let Some(Token {
                    kind: TokenKind::LeftParen,
                    ..
                }) = self.current()
                {
                    return Err(ParseError::UnknownFunction {
                        name: name.clone(),
                        position: token.position,
                    });
                }
                self.registry.register(name);
                Ok((Ast::Variable(name.clone()), 1))
            }

            TokenKind::LeftParen => {
                self.advance();
                self.descend(token.position)?;
                let inner = self.parse_expr(0)?;
                self.ascend();

                match self.current() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => {
                        self.advance();
                        Ok(inner)
                    }
                    None => Err(ParseError::UnbalancedParentheses {
                        position: token.position,
                    }),
                    Some(other) => Err(ParseError::UnexpectedToken {
                        token: other.kind.to_string(),
                        position: other.position,
                    }),
                }
            }

            other => Err(ParseError::UnexpectedToken {
                token: other.to_string(),
                position: token.position,
            }),
        }
    }
}
