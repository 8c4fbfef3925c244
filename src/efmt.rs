//! Formatting API for expressions

use crate::{Expr, Function, Operator};
use delegate::delegate;

use std::fmt;

pub struct FormatterConfig<'a> {
    s_and: &'a str,
    s_or: &'a str,
    s_nand: &'a str,
    s_nor: &'a str,
    s_xor: &'a str,
    s_xnor: &'a str,
    s_not: &'a str,
}

/// Keywords of the function definition language: the output can be parsed back
pub static KEYWORD_FMT_CFG: FormatterConfig = FormatterConfig {
    s_and: "and",
    s_or: "or",
    s_nand: "nand",
    s_nor: "nor",
    s_xor: "xor",
    s_xnor: "xnor",
    s_not: "not ",
};

/// Compact symbols
pub static SYMBOL_FMT_CFG: FormatterConfig = FormatterConfig {
    s_and: "&",
    s_or: "|",
    s_nand: "!&",
    s_nor: "!|",
    s_xor: "^",
    s_xnor: "!^",
    s_not: "!",
};

/// Location of a sub-expression inside its parent operation
#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub parent: Operator,
    pub right: bool,
}

impl Position {
    pub fn left(parent: Operator) -> Self {
        Self {
            parent,
            right: false,
        }
    }

    pub fn right(parent: Operator) -> Self {
        Self {
            parent,
            right: true,
        }
    }

    /// An operation needs parenthesis if it binds less tightly than its parent, or as tightly
    /// on the right side (operators associate to the left).
    pub fn needs_group(position: Option<Self>, op: Operator) -> bool {
        match position {
            None => false,
            Some(p) => {
                op.priority() < p.parent.priority()
                    || (p.right && op.priority() == p.parent.priority())
            }
        }
    }
}

/// Something that can be rendered through an [ExprFormatter]
pub trait Formattable {
    fn fmt_with(&self, f: &mut dyn ExprFormatter) -> fmt::Result;
}

impl Formattable for Expr {
    fn fmt_with(&self, f: &mut dyn ExprFormatter) -> fmt::Result {
        Expr::fmt_with(self, f)
    }
}

impl Formattable for Function {
    fn fmt_with(&self, f: &mut dyn ExprFormatter) -> fmt::Result {
        write!(f, "{} <= ", self.name())?;
        self.expr().fmt_with(f)?;
        write!(f, ";")
    }
}

pub struct InfixFormatted<'a, T: Formattable> {
    rule: &'a T,
    cfg: &'a FormatterConfig<'a>,
}

/// Define hooks to display separate parts of expressions.
///
/// This trait provide entry points used by [crate::Expr::fmt_with] to control the presentation of the expression.
/// The expression visits the inner tree and calls the hooks defined in this trait for each node and leaf.
///
/// A default formatter is implemented on top of [fmt::Formatter], additional formatters are used through
/// wrappers overriding the Display trait.
pub trait ExprFormatter {
    /// Pass-through function calling an internal [fmt::Formatter].
    ///
    /// This function enables the use of the ```write!``` macro in other functions.
    fn write_fmt(&mut self, args: fmt::Arguments) -> fmt::Result;

    /// Write a single variable, which can be negated
    fn write_variable(&mut self, name: &str, value: bool) -> fmt::Result;

    /// Start writing an operation
    fn start_operation(&mut self, op: Operator, value: bool, position: Option<Position>)
        -> fmt::Result;

    /// Stop writing an operation
    fn end_operation(&mut self, op: Operator, value: bool, position: Option<Position>)
        -> fmt::Result;

    /// Separate the two operands of an operation
    fn sep_operation(&mut self, op: Operator) -> fmt::Result;
}

impl FormatterConfig<'_> {
    pub fn operator(&self, op: Operator) -> &str {
        match op {
            Operator::And => self.s_and,
            Operator::Or => self.s_or,
            Operator::Nand => self.s_nand,
            Operator::Nor => self.s_nor,
            Operator::Xor => self.s_xor,
            Operator::Xnor => self.s_xnor,
        }
    }

    pub fn infix<'a, T: Formattable>(&'a self, rule: &'a T) -> InfixFormatted<'a, T> {
        InfixFormatted { rule, cfg: self }
    }
}

pub struct InfixFormatter<'a, 'b>(&'a mut fmt::Formatter<'b>, &'a FormatterConfig<'a>);
pub struct PrefixFormatter<'a, 'b>(InfixFormatter<'a, 'b>);

impl<'a, 'b> InfixFormatter<'a, 'b> {
    pub fn new(f: &'a mut fmt::Formatter<'b>) -> Self {
        Self(f, &KEYWORD_FMT_CFG)
    }
    pub fn with(f: &'a mut fmt::Formatter<'b>, cfg: &'a FormatterConfig<'a>) -> Self {
        Self(f, cfg)
    }
}

impl<'a, 'b> PrefixFormatter<'a, 'b> {
    pub fn new(f: &'a mut fmt::Formatter<'b>) -> Self {
        Self(InfixFormatter::with(f, &SYMBOL_FMT_CFG))
    }
}

impl ExprFormatter for InfixFormatter<'_, '_> {
    fn write_fmt(&mut self, args: fmt::Arguments) -> fmt::Result {
        fmt::Formatter::write_fmt(self.0, args)
    }

    fn write_variable(&mut self, name: &str, value: bool) -> fmt::Result {
        if !value {
            write!(self, "{}", self.1.s_not)?;
        }
        write!(self, "{}", name)
    }

    fn start_operation(
        &mut self,
        op: Operator,
        value: bool,
        position: Option<Position>,
    ) -> fmt::Result {
        match value {
            false => write!(self, "{}(", self.1.s_not),
            true => match Position::needs_group(position, op) {
                true => write!(self, "("),
                false => Ok(()),
            },
        }
    }

    fn end_operation(
        &mut self,
        op: Operator,
        value: bool,
        position: Option<Position>,
    ) -> fmt::Result {
        match value {
            false => write!(self, ")"),
            true => match Position::needs_group(position, op) {
                true => write!(self, ")"),
                false => Ok(()),
            },
        }
    }

    fn sep_operation(&mut self, op: Operator) -> fmt::Result {
        write!(self, " {} ", self.1.operator(op))
    }
}

pub struct PrefixFormatted<'a, R: Formattable>(pub &'a R);

impl<'a, R: Formattable> fmt::Display for PrefixFormatted<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut ef = PrefixFormatter::new(f);
        self.0.fmt_with(&mut ef)
    }
}

impl<T: Formattable> fmt::Display for InfixFormatted<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut ef = InfixFormatter::with(f, self.cfg);
        self.rule.fmt_with(&mut ef)
    }
}

impl ExprFormatter for PrefixFormatter<'_, '_> {
    delegate! {
        to self.0 {
            fn write_fmt(&mut self, args: fmt::Arguments) -> fmt::Result;
            fn write_variable(&mut self, name: &str, value: bool) -> fmt::Result;
        }
    }

    fn start_operation(
        &mut self,
        op: Operator,
        value: bool,
        _position: Option<Position>,
    ) -> fmt::Result {
        if !value {
            write!(self, "!")?;
        }
        let symbol = self.0 .1.operator(op);
        write!(self, "({} ", symbol)
    }

    fn end_operation(
        &mut self,
        _op: Operator,
        _value: bool,
        _position: Option<Position>,
    ) -> fmt::Result {
        write!(self, ")")
    }

    fn sep_operation(&mut self, _op: Operator) -> fmt::Result {
        write!(self, " ")
    }
}
