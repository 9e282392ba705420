// fun_project_root/fun_core/src/parser.rs
use crate::ast::{BinaryOp, Expression};
use crate::error::FunError;
use crate::lexer::{Token, TokenLiteralValue, TokenType};

/// Deepest expression tree the parser will build. Evaluation recurses over
/// the tree, so this also bounds the evaluator's stack use.
pub const MAX_DEPTH: usize = 256;

pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    // --- Helper Methods ---

    fn current_token(&self) -> Result<&'a Token, FunError> {
        self.tokens.get(self.position).ok_or_else(|| {
            FunError::Parser(format!(
                "Unexpected end of input (attempted to read past EOF). Position: {}",
                self.position
            ))
        })
    }

    fn consume_token(&mut self) -> Result<&'a Token, FunError> {
        let token = self.current_token()?;
        if token.token_type != TokenType::Eof {
            // Don't advance past EOF
            self.position += 1;
        }
        Ok(token)
    }

    fn expect_token_type(&mut self, expected_type: TokenType) -> Result<&'a Token, FunError> {
        let token = self.consume_token()?;
        if token.token_type == expected_type {
            Ok(token)
        } else {
            Err(unexpected(token, &format!("{:?}", expected_type)))
        }
    }

    fn check_current_token_type(&self, expected_type: TokenType) -> bool {
        self.current_token()
            .map_or(false, |t| t.token_type == expected_type)
    }

    /// Charges one level of nesting. Callers restore `depth` on success.
    fn descend(&mut self) -> Result<(), FunError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FunError::Parser(format!(
                "Expression nested too deeply (more than {} levels)",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    // --- Parsing Methods ---

    /// Parses a whole expression and insists nothing follows it.
    pub fn parse(&mut self) -> Result<Expression, FunError> {
        let expr = self.parse_expression()?;
        self.expect_token_type(TokenType::Eof)?;
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expression, FunError> {
        let depth = self.depth;
        let left = self.parse_additive()?;
        let op = match self.current_token()?.token_type {
            TokenType::EqEq => BinaryOp::Eq,
            TokenType::NotEq => BinaryOp::NotEq,
            TokenType::Lt => BinaryOp::Lt,
            TokenType::Gt => BinaryOp::Gt,
            TokenType::LtEq => BinaryOp::LtEq,
            TokenType::GtEq => BinaryOp::GtEq,
            _ => return Ok(left),
        };
        self.consume_token()?;
        self.descend()?;
        let right = self.parse_additive()?;
        self.depth = depth;
        // Comparisons don't chain: `a < b < c` is rejected by `parse`'s EOF check.
        Ok(Expression::binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expression, FunError> {
        let depth = self.depth;
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current_token()?.token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                _ => {
                    self.depth = depth;
                    return Ok(left);
                }
            };
            self.consume_token()?;
            // Each operator deepens the left-leaning tree by one.
            self.descend()?;
            let right = self.parse_term()?;
            left = Expression::binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> Result<Expression, FunError> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_token()?.token_type {
                TokenType::Star => BinaryOp::Mul,
                TokenType::Slash => BinaryOp::Div,
                TokenType::Percent => BinaryOp::Modulo,
                _ => {
                    self.depth = depth;
                    return Ok(left);
                }
            };
            self.consume_token()?;
            // Each operator deepens the left-leaning tree by one.
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expression::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, FunError> {
        if self.check_current_token_type(TokenType::Minus) {
            self.consume_token()?;
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expression::Negate(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, FunError> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        while self.check_current_token_type(TokenType::Lbracket) {
            self.consume_token()?;
            self.descend()?;
            let key = self.parse_expression()?;
            self.expect_token_type(TokenType::Rbracket)?;
            expr = Expression::index(expr, key);
        }
        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, FunError> {
        let token = self.consume_token()?;
        match token.token_type {
            TokenType::Placeholder => Ok(Expression::Placeholder),
            TokenType::True => Ok(Expression::Boolean(true)),
            TokenType::False => Ok(Expression::Boolean(false)),
            TokenType::Null => Ok(Expression::Null),
            TokenType::Int => match &token.literal {
                Some(TokenLiteralValue::Int(i)) => Ok(Expression::Int(*i)),
                _ => Err(missing_literal(token)),
            },
            TokenType::Float => match &token.literal {
                Some(TokenLiteralValue::Float(n)) => Ok(Expression::Float(*n)),
                _ => Err(missing_literal(token)),
            },
            TokenType::String => match &token.literal {
                Some(TokenLiteralValue::String(s)) => Ok(Expression::String(s.clone())),
                _ => Err(missing_literal(token)),
            },
            TokenType::Lparen => {
                self.descend()?;
                let inner = self.parse_expression()?;
                self.expect_token_type(TokenType::Rparen)?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => Err(unexpected(token, "an expression")),
        }
    }
}

fn unexpected(token: &Token, expected: &str) -> FunError {
    if token.token_type == TokenType::Eof {
        FunError::Parser(format!("Expected {} but reached end of input", expected))
    } else {
        FunError::Parser(format!(
            "Expected {} but got {:?} ('{}') at col {}",
            expected, token.token_type, token.lexeme, token.col
        ))
    }
}

fn missing_literal(token: &Token) -> FunError {
    FunError::Parser(format!(
        "Lexer produced {:?} token without a literal at col {}",
        token.token_type, token.col
    ))
}
