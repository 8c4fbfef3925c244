//! Boolean rules defined as expression trees

use core::ops::BitAnd;
use core::ops::BitOr;
use core::ops::BitXor;
use core::ops::Not;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::efmt::{self, ExprFormatter, Position};
use crate::{parse, ClbError, Rule, State, Variables};

/// A Boolean expression tree.
///
/// Represents a Boolean rule as a tree where internal nodes are binary Boolean operations
/// and leaves are named variables. Each node carries a flag indicating whether it is negated,
/// so that the ```not``` operator does not need its own node and double negations vanish.
/// Expressions overload the ```&```, ```|```, ```^``` and ```!``` operators to facilitate their
/// definition as readable rust statements.
///
/// Expressions can not be [copied](Copy) but they can be [cloned](Clone) in constant time.
///
/// ```
/// use clbmap::{Expr, Rule, State, Variables};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let a = Expr::var("A");
/// let b = Expr::var("B");
/// let c = Expr::var("C");
///
/// // Build expressions using these variables
/// let sub_expr = &b & !&c;
/// let pos_expr = &a & !&sub_expr;
/// let neg_expr = !&pos_expr;
///
/// // Evaluate expressions on some state
/// let variables = Variables::from_iter(["A", "B", "C"]);
/// let state: State = "011".parse()?;
/// assert_ne!(pos_expr.eval(&variables, &state)?, neg_expr.eval(&variables, &state)?);
/// # Ok(())
/// # }
/// ```
///
/// # Parsing expressions
///
/// An expression can be parsed from a string using the lowercase keywords ```and```, ```or```,
/// ```not```, ```nand```, ```nor```, ```xor``` and ```xnor```. From the lowest to the highest
/// priority, the levels are: ```or```/```xor```, ```nor```/```xnor```, ```and```, ```nand```,
/// and finally ```not```. Operators of the same level associate to the left.
///
/// ```
/// use clbmap::Expr;
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let expr: Expr = "A and not (B xor C)".parse()?;
/// assert_eq!(expr.to_string(), "A and not (B xor C)");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub(crate) value: bool,
    pub(crate) node: ExprNode,
}

/// A node in an expression tree
#[derive(Clone, PartialEq, Debug)]
pub enum ExprNode {
    /// A single named variable
    Variable(Arc<str>),

    /// Two expressions connected with a binary operator
    Operation(Operator, Arc<(Expr, Expr)>),
}

/// Binary operators available in expression trees.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Operator {
    /// Both children need to be true
    And,
    /// At least one child needs to be true
    Or,
    /// At least one child needs to be false
    Nand,
    /// Both children need to be false
    Nor,
    /// Exactly one child needs to be true
    Xor,
    /// Both children need to have the same value
    Xnor,
}

impl Expr {
    fn new(value: bool, node: ExprNode) -> Self {
        Self { value, node }
    }

    /// Create an expression made of a single variable
    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Self::from(ExprNode::Variable(name.into()))
    }

    /// Get access to the inner content: a boolean value (false if negated) and an expression node
    pub fn get_inner(&self) -> (bool, &ExprNode) {
        (self.value, &self.node)
    }

    /// Collect the names of all variables used in this expression
    pub fn collect_variables(&self, variables: &mut BTreeSet<String>) {
        match &self.node {
            ExprNode::Variable(name) => {
                variables.insert(name.to_string());
            }
            ExprNode::Operation(_, children) => {
                children.0.collect_variables(variables);
                children.1.collect_variables(variables);
            }
        }
    }

    /// The sorted set of variables used in this expression
    pub fn variables_used(&self) -> BTreeSet<String> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    /// Replace all occurrences of a variable by a sub-expression.
    ///
    /// Negated occurrences are replaced by the negation of the sub-expression.
    /// The original expression is left untouched, unchanged subtrees are shared.
    ///
    /// ```
    /// use clbmap::Expr;
    /// # use clbmap::ClbError;
    /// # fn main() -> Result<(), ClbError> {
    ///
    /// let expr: Expr = "f or not f".parse()?;
    /// let replaced = expr.replace_variable("f", &"A and B".parse()?);
    /// assert_eq!(replaced.to_string(), "A and B or not (A and B)");
    /// # Ok(())
    /// # }
    /// ```
    pub fn replace_variable(&self, name: &str, expr: &Expr) -> Expr {
        self.rewrite_cow(&|var| match var == name {
            true => Some(expr.clone()),
            false => None,
        })
    }

    /// Rewrite an expression by replacing some variables with new expressions.
    ///
    /// The closure is called on all variables of the expression. If it returns None, then the
    /// variable is unchanged, otherwise the new expression is used to reconstruct the tree.
    /// Only the modified branches are reconstructed.
    pub(crate) fn rewrite_cow<F>(&self, f: &F) -> Self
    where
        F: Fn(&str) -> Option<Expr>,
    {
        self._rewrite_cow(f).into_owned()
    }

    fn _rewrite_cow<F>(&self, f: &F) -> Cow<Self>
    where
        F: Fn(&str) -> Option<Expr>,
    {
        match &self.node {
            ExprNode::Variable(name) => match f(name) {
                None => Cow::Borrowed(self),
                Some(e) => match self.value {
                    true => Cow::Owned(e),
                    false => Cow::Owned(!e),
                },
            },
            ExprNode::Operation(op, children) => {
                let c1 = children.0._rewrite_cow(f);
                let c2 = children.1._rewrite_cow(f);
                if let (Cow::Borrowed(_), Cow::Borrowed(_)) = (&c1, &c2) {
                    return Cow::Borrowed(self);
                }
                let node = ExprNode::Operation(*op, Arc::new((c1.into_owned(), c2.into_owned())));
                Cow::Owned(Self::new(self.value, node))
            }
        }
    }

    /// Visit the tree and call the hooks of the formatter for each node and leaf
    pub fn fmt_with(&self, f: &mut dyn ExprFormatter) -> fmt::Result {
        self._fmt_expr(f, None)
    }

    fn _fmt_expr(&self, f: &mut dyn ExprFormatter, position: Option<Position>) -> fmt::Result {
        match &self.node {
            ExprNode::Variable(name) => f.write_variable(name, self.value),
            ExprNode::Operation(op, c) => {
                f.start_operation(*op, self.value, position)?;
                c.0._fmt_expr(f, Some(Position::left(*op)))?;
                f.sep_operation(*op)?;
                c.1._fmt_expr(f, Some(Position::right(*op)))?;
                f.end_operation(*op, self.value, position)
            }
        }
    }
}

impl Operator {
    /// Define the priority of operators
    ///
    /// This priority controls the addition of necessary parenthesis when formatting expressions.
    pub fn priority(self) -> u8 {
        match self {
            Operator::Or | Operator::Xor => 1,
            Operator::Nor | Operator::Xnor => 2,
            Operator::And => 3,
            Operator::Nand => 4,
        }
    }

    /// Apply the operator on two Boolean values
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Operator::And => a && b,
            Operator::Or => a || b,
            Operator::Nand => !(a && b),
            Operator::Nor => !(a || b),
            Operator::Xor => a != b,
            Operator::Xnor => a == b,
        }
    }

    /// Keyword used by the function definition language
    pub fn keyword(self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Nand => "nand",
            Operator::Nor => "nor",
            Operator::Xor => "xor",
            Operator::Xnor => "xnor",
        }
    }

    /// Connect two expressions with this operator
    pub fn join(self, e1: impl Into<Expr>, e2: impl Into<Expr>) -> Expr {
        Expr::from(ExprNode::Operation(self, Arc::new((e1.into(), e2.into()))))
    }
}

impl FromStr for Expr {
    type Err = ClbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_expression(s)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

impl From<ExprNode> for Expr {
    fn from(node: ExprNode) -> Self {
        Self::new(true, node)
    }
}

impl From<Arc<Expr>> for Expr {
    fn from(r: Arc<Expr>) -> Self {
        Arc::try_unwrap(r).unwrap_or_else(|r| Expr::clone(&r))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

impl Rule for Expr {
    fn eval(&self, variables: &Variables, state: &State) -> Result<bool, ClbError> {
        let result = match &self.node {
            ExprNode::Variable(name) => state.is_active(variables.get(name)?),
            ExprNode::Operation(op, children) => op.apply(
                children.0.eval(variables, state)?,
                children.1.eval(variables, state)?,
            ),
        };
        Ok(result == self.value)
    }
}

// Display with the keywords of the definition language
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&efmt::KEYWORD_FMT_CFG.infix(self), f)
    }
}

/* ************************************************************************************* */
/* ******************************   Operator overloading  ****************************** */
/* ************************************************************************************* */

impl Not for Expr {
    type Output = Self;
    fn not(self) -> Self::Output {
        Self::new(!self.value, self.node)
    }
}

impl Not for &Expr {
    type Output = Expr;
    fn not(self) -> Self::Output {
        Expr::new(!self.value, self.node.clone())
    }
}

impl<T: Into<Expr>> BitAnd<T> for Expr {
    type Output = Expr;
    fn bitand(self, rhs: T) -> Self::Output {
        Operator::And.join(self, rhs)
    }
}

impl<T: Into<Expr>> BitAnd<T> for &Expr {
    type Output = Expr;
    fn bitand(self, rhs: T) -> Self::Output {
        Operator::And.join(self, rhs)
    }
}

impl<T: Into<Expr>> BitOr<T> for Expr {
    type Output = Self;
    fn bitor(self, rhs: T) -> Self::Output {
        Operator::Or.join(self, rhs)
    }
}

impl<T: Into<Expr>> BitOr<T> for &Expr {
    type Output = Expr;
    fn bitor(self, rhs: T) -> Self::Output {
        Operator::Or.join(self, rhs)
    }
}

impl<T: Into<Expr>> BitXor<T> for Expr {
    type Output = Self;
    fn bitxor(self, rhs: T) -> Self::Output {
        Operator::Xor.join(self, rhs)
    }
}

impl<T: Into<Expr>> BitXor<T> for &Expr {
    type Output = Expr;
    fn bitxor(self, rhs: T) -> Self::Output {
        Operator::Xor.join(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn construct_and_display() -> Result<(), ClbError> {
        let a = Expr::var("a");
        let b = Expr::var("b");
        let c = Expr::var("c");

        let expr = !(&a | &b);
        assert_eq!(expr.to_string(), "not (a or b)");

        let e = &a | (&b & &c);
        assert_eq!(e.to_string(), "a or b and c");

        let e = (&a | &b) & &c;
        assert_eq!(e.to_string(), "(a or b) and c");

        let e = Operator::Nand.join(&a, Operator::Nand.join(&b, &c));
        assert_eq!(e.to_string(), "a nand (b nand c)");

        let e = Operator::Nand.join(Operator::Nand.join(&a, &b), &c);
        assert_eq!(e.to_string(), "a nand b nand c");

        // double negations vanish
        assert_eq!(!!a.clone(), a);

        Ok(())
    }

    #[test]
    fn eval() -> Result<(), ClbError> {
        let variables = Variables::from_iter(["A", "B"]);
        let a = Expr::var("A");
        let b = Expr::var("B");

        let cases = [
            (Operator::And, [false, false, false, true]),
            (Operator::Or, [false, true, true, true]),
            (Operator::Nand, [true, true, true, false]),
            (Operator::Nor, [true, false, false, false]),
            (Operator::Xor, [false, true, true, false]),
            (Operator::Xnor, [true, false, false, true]),
        ];
        for (op, expected) in cases {
            let e = op.join(&a, &b);
            for (row, value) in expected.iter().enumerate() {
                let state = State::from_row(row, 2);
                assert_eq!(e.eval(&variables, &state)?, *value, "{} on row {}", op, row);
                assert_eq!((!&e).eval(&variables, &state)?, !*value);
            }
        }

        let unbound = &a & Expr::var("C");
        assert!(matches!(
            unbound.eval(&variables, &State::default()),
            Err(ClbError::UnboundVariable(name)) if name == "C"
        ));

        Ok(())
    }

    #[test]
    fn replace() -> Result<(), ClbError> {
        let e: Expr = "g and not g or B".parse()?;
        assert_eq!(
            e.variables_used().into_iter().collect::<Vec<_>>(),
            vec!["B", "g"]
        );

        let g: Expr = "A xor C".parse()?;
        let replaced = e.replace_variable("g", &g);
        assert_eq!(replaced.to_string(), "(A xor C) and not (A xor C) or B");
        assert!(!replaced.variables_used().contains("g"));

        // untouched expressions are preserved
        assert_eq!(e.replace_variable("X", &g), e);
        Ok(())
    }
}
