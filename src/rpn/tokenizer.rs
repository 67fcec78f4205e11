use crate::rpn::{Token, TokenKind};
use log::{debug, warn};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "rpn.pest"]
struct ExpressionLexer;

/// Splits an infix expression into tokens.
///
/// Never fails: unrecognized characters become opaque operand tokens that the
/// converter rejects. Whitespace is dropped.
pub fn tokenize(expression: &str) -> Vec<Token> {
    debug!("Tokenizing expression: {}", expression);
    let pairs = match ExpressionLexer::parse(Rule::expression, expression) {
        Ok(mut pairs) => match pairs.next() {
            Some(pair) => pair.into_inner(),
            None => return vec![Token::new(TokenKind::Operand, expression)],
        },
        Err(e) => {
            warn!("Lexer rejected expression: {}", e);
            return vec![Token::new(TokenKind::Operand, expression)];
        }
    };

    let tokens: Vec<Token> = pairs
        .filter_map(|pair| {
            let kind = match pair.as_rule() {
                Rule::number | Rule::string | Rule::variable | Rule::unknown => TokenKind::Operand,
                Rule::identifier => TokenKind::FunctionName,
                Rule::operator => TokenKind::Operator,
                Rule::open_paren => TokenKind::OpenParen,
                Rule::close_paren => TokenKind::CloseParen,
                Rule::separator => TokenKind::ArgSeparator,
                _ => return None,
            };
            Some(Token::new(kind, pair.as_str()))
        })
        .collect();

    debug!("Tokens: {:?}", tokens);
    tokens
}
