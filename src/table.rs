use crate::{ClbError, Rule, State, Variables};

use std::fmt;

/// The value of a rule for every assignment of an ordered set of variables.
///
/// Rows are enumerated by counting from 0 to 2^n - 1, the first variable being the most
/// significant bit of the row number. The table is immutable once computed.
///
/// ```
/// use clbmap::{Expr, TruthTable, Variables};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let variables = Variables::from_iter(["A", "B"]);
/// let and = TruthTable::new(&"A and B".parse::<Expr>()?, &variables)?;
/// let or = TruthTable::new(&"A or B".parse::<Expr>()?, &variables)?;
///
/// assert_eq!(and.len(), 4);
/// assert_eq!(and.mismatch_count(&or)?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TruthTable {
    variables: Vec<String>,
    values: Vec<bool>,
}

impl TruthTable {
    /// Evaluate a rule on all rows
    pub fn new<R: Rule + ?Sized>(rule: &R, variables: &Variables) -> Result<Self, ClbError> {
        Self::from_fn(variables, |state| rule.eval(variables, state))
    }

    /// Fill a table with a closure called on the state of each row, in order
    pub fn from_fn<F>(variables: &Variables, mut f: F) -> Result<Self, ClbError>
    where
        F: FnMut(&State) -> Result<bool, ClbError>,
    {
        variables.check_size()?;
        let width = variables.len();
        let values = (0..variables.num_rows())
            .map(|row| f(&State::from_row(row, width)))
            .collect::<Result<Vec<bool>, ClbError>>()?;

        Ok(Self {
            variables: variables.iter().map(String::from).collect(),
            values,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Result of the given row
    pub fn value(&self, row: usize) -> bool {
        self.values[row]
    }

    /// Iterate over the rows as pairs of assignment and result
    pub fn rows(&self) -> impl Iterator<Item = (State, bool)> + '_ {
        let width = self.variables.len();
        self.values
            .iter()
            .enumerate()
            .map(move |(row, v)| (State::from_row(row, width), *v))
    }

    /// Count the rows where the two tables have different results.
    ///
    /// Only the results are compared: both tables must have the same number of rows.
    pub fn mismatch_count(&self, other: &TruthTable) -> Result<usize, ClbError> {
        if self.len() != other.len() {
            return Err(ClbError::TableSizeMismatch(self.len(), other.len()));
        }
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a != b)
            .count())
    }
}

const RESULT_HEADER: &str = "RESULT";

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut header = String::new();
        for name in &self.variables {
            header += &format!("{} | ", name);
        }
        header += RESULT_HEADER;
        writeln!(f, "{}", header)?;
        writeln!(f, "{}", "-".repeat(header.len()))?;

        for (state, value) in self.rows() {
            for (idx, name) in self.variables.iter().enumerate() {
                let symbol = state.is_active(idx) as u8;
                write!(f, "{:<w$} | ", symbol, w = name.len())?;
            }
            writeln!(f, "{}", value as u8)?;
        }
        Ok(())
    }
}
