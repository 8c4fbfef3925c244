use crate::ClbError;
use bit_set::BitSet;
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

/// An assignment of Boolean values, defined by the set of active variables.
///
/// Variables are identified by their rank in a [collection of variables](crate::Variables):
/// a state is the set of active ranks, all other variables are implicitly inactive.
///
/// A state can be constructed explicitly by activating or disabling individual variables,
/// taken from a row of a truth table, or parsed from a string of 0 and 1.
///
/// ```
/// use clbmap::State;
///
/// let mut state = State::default();
/// state.activate(1);
/// state.activate(3);
/// state.disable(3);
///
/// assert_eq!(state.is_active(0), false);
/// assert_eq!(state.is_active(1), true);
/// assert_eq!(state.is_active(3), false);
///
/// // Row 1 of a table over 3 variables: only the last variable is active
/// let state = State::from_row(1, 3);
/// assert!(state.is_active(2));
///
/// // Parse state strings
/// let parsed: State = "0010 01100".parse().unwrap();
/// assert!(parsed.is_active(2));
/// ```
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct State {
    pub(crate) active: BitSet,
}

impl State {
    /// Build the assignment of a truth table row.
    ///
    /// The row number is a counter over `width` bits where the first variable is the most
    /// significant bit.
    pub fn from_row(row: usize, width: usize) -> Self {
        let mut state = Self::default();
        for idx in 0..width {
            if (row >> (width - 1 - idx)) & 1 == 1 {
                state.activate(idx);
            }
        }
        state
    }

    /// Activate the given variable in this state
    pub fn activate(&mut self, var: usize) {
        self.active.insert(var);
    }

    /// Disable the given variable in this state
    pub fn disable(&mut self, var: usize) {
        self.active.remove(var);
    }

    /// Assign a value to a variable
    pub fn set(&mut self, var: usize, value: bool) {
        match value {
            true => self.activate(var),
            false => self.disable(var),
        }
    }

    /// Test if a specific variable is active in this state
    pub fn is_active(&self, var: usize) -> bool {
        self.active.contains(var)
    }

    /// Iterate over the set of active variables
    pub fn iter_active(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.iter()
    }
}

impl FromIterator<usize> for State {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            active: BitSet::from_iter(iter),
        }
    }
}

impl FromStr for State {
    type Err = ClbError;

    fn from_str(descr: &str) -> Result<State, ClbError> {
        let mut state = Self::default();
        let mut idx = 0;
        for c in descr.chars() {
            match c {
                ' ' | '\t' | '\'' => (), // skip spacing and ` for formatting
                '0' => idx += 1,
                '1' => {
                    state.activate(idx);
                    idx += 1;
                }
                _ => return Err(ClbError::InvalidAssignment(descr.into())),
            };
        }
        Ok(state)
    }
}

/// Display the values up to the last active variable, the inactive variables after it are
/// omitted.
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut pos = 0;
        for v in &self.active {
            while pos < v {
                write!(f, "0")?;
                pos += 1;
            }
            write!(f, "1")?;
            pos += 1;
        }
        write!(f, "")
    }
}
