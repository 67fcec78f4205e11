use crate::rpn::{
    is_numeric_str, FunctionRegistry, Operator, RpnError, RpnFailure, RpnItem, RpnProgram, Token,
    TokenKind, VARIABLE_MARKER,
};
use log::debug;

/// Name of the function emitted for a `-` sign in front of a group or call.
pub const NEGATE_FUNCTION: &str = "negate";

/// Argument bookkeeping per open parenthesis, indexed by nesting depth.
///
/// Each slot counts the arguments seen at its depth; `boundary` is set right
/// after `(` or `,` so that the next token opens a new argument.
#[derive(Debug, Default)]
struct ArgDepthMap {
    slots: Vec<ArgSlot>,
}

#[derive(Debug)]
struct ArgSlot {
    count: usize,
    boundary: bool,
}

impl ArgDepthMap {
    fn depth(&self) -> usize {
        self.slots.len()
    }

    fn open(&mut self) {
        self.slots.push(ArgSlot {
            count: 0,
            boundary: true,
        });
    }

    /// Closes the innermost depth and returns its argument count.
    fn close(&mut self) -> usize {
        self.slots.pop().map_or(0, |slot| slot.count)
    }

    fn current_count(&self) -> usize {
        self.slots.last().map_or(0, |slot| slot.count)
    }

    /// True right after `(` or `,` at the innermost depth, before any token of
    /// the next argument.
    fn at_boundary(&self) -> bool {
        self.slots.last().is_some_and(|slot| slot.boundary)
    }

    fn mark_boundary(&mut self) {
        if let Some(slot) = self.slots.last_mut() {
            slot.boundary = true;
        }
    }

    fn note_argument(&mut self) {
        if let Some(slot) = self.slots.last_mut() {
            if slot.boundary {
                slot.count += 1;
                slot.boundary = false;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StackEntry {
    OpenParen,
    Operator(Operator),
    Function(String),
    Negate,
}

/// Sign waiting to be folded into the next operand.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn combine(self, other: Sign) -> Sign {
        if self == other {
            Sign::Plus
        } else {
            Sign::Minus
        }
    }
}

struct Converter<'a> {
    registry: &'a FunctionRegistry,
    output: RpnProgram,
    stack: Vec<StackEntry>,
    depths: ArgDepthMap,
    pending_sign: Option<Sign>,
    expect_operand: bool,
    awaiting_call: Option<String>,
}

/// Converts infix tokens to an RPN program.
///
/// Function arity is resolved here from the argument count inside each call's
/// parentheses and validated against the registry. On failure the returned
/// [`RpnFailure`] carries the output built so far.
pub fn convert(tokens: &[Token], registry: &FunctionRegistry) -> Result<RpnProgram, RpnFailure> {
    let mut converter = Converter {
        registry,
        output: RpnProgram::new(),
        stack: Vec::new(),
        depths: ArgDepthMap::default(),
        pending_sign: None,
        expect_operand: true,
        awaiting_call: None,
    };

    match converter.run(tokens) {
        Ok(()) => {
            debug!("RPN: {}", converter.output);
            Ok(converter.output)
        }
        Err(error) => {
            debug!("Conversion failed: {} (rpn so far: {})", error, converter.output);
            Err(RpnFailure::new(error, converter.output))
        }
    }
}

impl<'a> Converter<'a> {
    fn run(&mut self, tokens: &[Token]) -> Result<(), RpnError> {
        for token in tokens {
            if let Some(name) = self.awaiting_call.take() {
                if token.kind != TokenKind::OpenParen {
                    return Err(RpnError::operand_expected(name));
                }
                self.open_group();
                continue;
            }

            match token.kind {
                TokenKind::Operand => self.operand(&token.text)?,
                TokenKind::FunctionName => self.function_name(&token.text)?,
                TokenKind::OpenParen => {
                    self.depths.note_argument();
                    self.push_pending_negation()?;
                    self.open_group();
                }
                TokenKind::CloseParen => self.close_group()?,
                TokenKind::ArgSeparator => self.separator()?,
                TokenKind::Operator => self.operator(&token.text)?,
            }
        }

        if let Some(name) = self.awaiting_call.take() {
            return Err(RpnError::operand_expected(name));
        }
        self.check_operand_complete()?;

        while let Some(entry) = self.stack.pop() {
            if entry == StackEntry::OpenParen {
                return Err(RpnError::operand_expected("("));
            }
            self.emit(entry)?;
        }
        Ok(())
    }

    fn operand(&mut self, text: &str) -> Result<(), RpnError> {
        if !is_literal(text) {
            return Err(RpnError::operand_expected(text));
        }
        self.depths.note_argument();

        let text = match self.pending_sign.take() {
            Some(Sign::Minus) => format!("-{}", text),
            _ => text.to_string(),
        };
        self.output.push(RpnItem::Operand(text));
        self.expect_operand = false;
        Ok(())
    }

    fn function_name(&mut self, name: &str) -> Result<(), RpnError> {
        if !self.registry.contains(name) {
            return Err(RpnError::operand_expected(name));
        }
        self.depths.note_argument();
        self.push_pending_negation()?;
        self.stack.push(StackEntry::Function(name.to_string()));
        self.awaiting_call = Some(name.to_string());
        Ok(())
    }

    fn open_group(&mut self) {
        self.stack.push(StackEntry::OpenParen);
        self.depths.open();
        self.expect_operand = true;
    }

    fn close_group(&mut self) -> Result<(), RpnError> {
        self.check_operand_complete()?;
        // `f()` has no arguments, but `f(1,)` has an empty last one
        if self.depths.at_boundary() && self.depths.current_count() > 0 {
            return Err(RpnError::operand_expected(")"));
        }

        loop {
            match self.stack.pop() {
                None => return Err(RpnError::operand_expected(")")),
                Some(StackEntry::OpenParen) => break,
                Some(entry) => self.emit(entry)?,
            }
        }

        let arity = self.depths.close();
        if let Some(StackEntry::Function(name)) = self.stack.last().cloned() {
            self.stack.pop();
            self.emit_function(name, arity)?;
        }
        if self.stack.last() == Some(&StackEntry::Negate) {
            self.stack.pop();
            self.emit(StackEntry::Negate)?;
        }

        self.expect_operand = false;
        Ok(())
    }

    fn separator(&mut self) -> Result<(), RpnError> {
        if self.depths.depth() == 0 {
            return Err(RpnError::operand_expected(","));
        }
        self.check_operand_complete()?;
        if self.depths.at_boundary() {
            return Err(RpnError::operand_expected(","));
        }

        while let Some(StackEntry::Operator(op)) = self.stack.last().cloned() {
            self.stack.pop();
            self.output.push(RpnItem::Operator(op));
        }
        self.depths.mark_boundary();
        self.expect_operand = true;
        Ok(())
    }

    fn operator(&mut self, symbol: &str) -> Result<(), RpnError> {
        let op = Operator::try_from(symbol).map_err(|_| RpnError::operand_expected(symbol))?;

        if self.expect_operand {
            let sign = match op {
                Operator::Add => Sign::Plus,
                Operator::Subtract => Sign::Minus,
                _ => return Err(RpnError::operand_expected(symbol)),
            };
            self.pending_sign = Some(match self.pending_sign {
                Some(pending) => pending.combine(sign),
                None => sign,
            });
            return Ok(());
        }

        // left-associative: pop everything binding at least as tightly
        while let Some(StackEntry::Operator(top)) = self.stack.last().cloned() {
            if top.precedence() > op.precedence() {
                break;
            }
            self.stack.pop();
            self.output.push(RpnItem::Operator(top));
        }
        self.stack.push(StackEntry::Operator(op));
        self.expect_operand = true;
        Ok(())
    }

    /// Fails on a sign or binary operator still waiting for its operand.
    fn check_operand_complete(&self) -> Result<(), RpnError> {
        if let Some(sign) = self.pending_sign {
            return Err(RpnError::operand_expected(sign_symbol(sign)));
        }
        if self.expect_operand {
            if let Some(StackEntry::Operator(op)) = self.stack.last() {
                return Err(RpnError::operand_expected(op.symbol()));
            }
        }
        Ok(())
    }

    /// A `-` in front of a group or call negates the whole group once it closes.
    ///
    /// Needs a registered one-argument `negate`.
    fn push_pending_negation(&mut self) -> Result<(), RpnError> {
        if self.pending_sign.take() == Some(Sign::Minus) {
            let unary = self
                .registry
                .lookup(NEGATE_FUNCTION)
                .is_some_and(|spec| spec.arity.accepts(1));
            if !unary {
                return Err(RpnError::operand_expected("-"));
            }
            self.stack.push(StackEntry::Negate);
        }
        Ok(())
    }

    fn emit(&mut self, entry: StackEntry) -> Result<(), RpnError> {
        match entry {
            StackEntry::Operator(op) => self.output.push(RpnItem::Operator(op)),
            StackEntry::Function(name) => {
                // only reachable for a call whose parenthesis never opened
                return Err(RpnError::operand_expected(name));
            }
            StackEntry::Negate => self.emit_function(NEGATE_FUNCTION.to_string(), 1)?,
            StackEntry::OpenParen => return Err(RpnError::operand_expected("(")),
        }
        Ok(())
    }

    fn emit_function(&mut self, name: String, arity: usize) -> Result<(), RpnError> {
        let spec = self
            .registry
            .lookup(&name)
            .ok_or_else(|| RpnError::operand_expected(name.as_str()))?;
        if !spec.arity.accepts(arity) {
            return Err(RpnError::WrongArity {
                name,
                given: arity,
                expected: spec.arity,
            });
        }
        self.output.push(RpnItem::Function { name, arity });
        Ok(())
    }
}

fn sign_symbol(sign: Sign) -> &'static str {
    match sign {
        Sign::Plus => "+",
        Sign::Minus => "-",
    }
}

/// Numeric literal, quoted string or `$variable`.
fn is_literal(text: &str) -> bool {
    is_numeric_str(text) || is_quoted(text) || is_variable(text)
}

pub(crate) fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
}

fn is_variable(text: &str) -> bool {
    text.strip_prefix(VARIABLE_MARKER)
        .and_then(|name| name.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}
