//! Operand stack for the interpreter.

use smallvec::SmallVec;
use std::fmt;

/// A value on the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    /// An unrecognized token, kept so the stack depth stays honest
    Opaque(String),
}

impl Operand {
    /// Numeric reading of the operand. Opaque values read as their numeric
    /// parse, or 0.
    pub fn as_number(&self) -> f64 {
        match self {
            Operand::Number(n) => *n,
            Operand::Opaque(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Opaque(s) => f.write_str(s),
        }
    }
}

/// Last-in-first-out operand stack.
///
/// Operands are pushed left to right, so operators pop their last argument
/// first. [`OperandStack::pop_numbers`] undoes that reversal for callers.
#[derive(Debug, Clone, Default)]
pub struct OperandStack {
    items: SmallVec<[Operand; 16]>,
}

impl OperandStack {
    /// Deepest the stack grows. At this depth the oldest half is discarded,
    /// keeping the operands nearest the next operator.
    pub const MAX_DEPTH: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operand: Operand) {
        if self.items.len() >= Self::MAX_DEPTH {
            log::trace!("operand stack full, discarding {} oldest", Self::MAX_DEPTH / 2);
            self.items.drain(..Self::MAX_DEPTH / 2);
        }
        self.items.push(operand);
    }

    pub fn push_number(&mut self, value: f64) {
        self.push(Operand::Number(value));
    }

    pub fn pop(&mut self) -> Option<Operand> {
        self.items.pop()
    }

    /// Pop one value as a number.
    pub fn pop_number(&mut self) -> Option<f64> {
        self.items.pop().map(|op| op.as_number())
    }

    /// Pop `N` values, returned in the order they were pushed.
    ///
    /// Returns `None` and leaves the stack untouched when fewer than `N`
    /// values are available.
    pub fn pop_numbers<const N: usize>(&mut self) -> Option<[f64; N]> {
        if self.items.len() < N {
            return None;
        }
        let mut values = [0.0; N];
        for slot in values.iter_mut().rev() {
            *slot = self.pop_number()?;
        }
        Some(values)
    }

    pub fn peek(&self) -> Option<&Operand> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
