use crate::{ClbError, State, Variables};

/// Common API for everything that computes a Boolean value from an assignment of named variables.
///
/// Expressions, named functions and the outputs of logic blocks all implement this trait,
/// which lets a [truth table](crate::TruthTable) enumerate any of them the same way.
pub trait Rule {
    /// Evaluate the rule on the given state.
    ///
    /// The variables give the rank of each name in the state. Fails if the rule depends on a
    /// variable which is not part of the collection.
    fn eval(&self, variables: &Variables, state: &State) -> Result<bool, ClbError>;
}

impl<R: Rule + ?Sized> Rule for &R {
    fn eval(&self, variables: &Variables, state: &State) -> Result<bool, ClbError> {
        (**self).eval(variables, state)
    }
}
