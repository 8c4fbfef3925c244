//! Ordered collections of named Boolean variables

use crate::ClbError;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::iter::FromIterator;

static RE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z$_][A-Za-z0-9$_]*$").unwrap());

/// Reserved words of the function definition language
pub(crate) static KEYWORDS: [&str; 7] = ["and", "or", "not", "nand", "nor", "xor", "xnor"];

/// Largest number of free variables accepted for an exhaustive truth table
pub const MAX_VARIABLES: usize = 24;

/// Check that a name can be used for a variable or a function.
///
/// Valid names start with a letter, `$` or `_`, followed by letters, digits, `$` or `_`,
/// and are not one of the operator keywords.
pub fn check_name(name: &str) -> Result<(), ClbError> {
    if !RE_NAME.is_match(name) || KEYWORDS.contains(&name) {
        return Err(ClbError::InvalidName(name.into()));
    }
    Ok(())
}

/// An ordered set of named variables.
///
/// Names are kept in lexicographic order and each name is associated to its rank in this order.
/// The rank is used to identify the variable in a [State](crate::State) and to lay out the
/// columns of a [truth table](crate::TruthTable): the first variable is the most significant
/// bit of the row counter.
///
/// ```
/// use clbmap::Variables;
///
/// let vars = Variables::from_iter(["B", "A", "C", "A"]);
/// assert_eq!(vars.len(), 3);
/// assert_eq!(vars.index_of("A"), Some(0));
/// assert_eq!(vars.name(2), Some("C"));
/// assert_eq!(vars.num_rows(), 8);
/// ```
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Variables {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Variables {
    /// Number of variables in the set
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return whether there are no variables in this set
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Rank of the variable with the given name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Rank of the variable with the given name, or an error if it is not part of the set
    pub fn get(&self, name: &str) -> Result<usize, ClbError> {
        self.index_of(name)
            .ok_or_else(|| ClbError::UnboundVariable(name.into()))
    }

    /// Name of the variable with the given rank
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over the names in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of rows in a truth table enumerating all assignments of these variables
    pub fn num_rows(&self) -> usize {
        1 << self.names.len()
    }

    /// Reject variable sets too large for an exhaustive enumeration
    pub fn check_size(&self) -> Result<(), ClbError> {
        if self.len() > MAX_VARIABLES {
            return Err(ClbError::TooManyVariables(self.len(), MAX_VARIABLES));
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for Variables {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let sorted: BTreeSet<String> = iter.into_iter().map(Into::into).collect();
        let names: Vec<String> = sorted.into_iter().collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { names, index }
    }
}

impl From<BTreeSet<String>> for Variables {
    fn from(names: BTreeSet<String>) -> Self {
        Self::from_iter(names)
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.names.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use crate::variable::*;

    #[test]
    fn names() {
        assert!(check_name("A").is_ok());
        assert!(check_name("_tmp$1").is_ok());
        assert!(check_name("andy").is_ok());

        assert!(check_name("1A").is_err());
        assert!(check_name("te%t").is_err());
        assert!(check_name("").is_err());
        assert!(check_name("xnor").is_err());
    }

    #[test]
    fn ordering() -> Result<(), ClbError> {
        let vars = Variables::from_iter(["c", "a", "b"]);
        assert_eq!(vars.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(vars.get("b")?, 1);
        assert!(vars.get("d").is_err());
        assert_eq!(format!("{}", vars), "a, b, c");

        let empty = Variables::default();
        assert!(empty.is_empty());
        assert_eq!(empty.num_rows(), 1);
        Ok(())
    }

    #[test]
    fn size_limit() {
        let vars = Variables::from_iter((0..=MAX_VARIABLES).map(|i| format!("v{}", i)));
        assert!(vars.check_size().is_err());

        let vars = Variables::from_iter((0..MAX_VARIABLES).map(|i| format!("v{}", i)));
        assert!(vars.check_size().is_ok());
    }
}
