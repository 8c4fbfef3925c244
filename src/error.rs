use thiserror::Error;

/// Errors raised while reading functions, building circuits or running the search.
#[derive(Error, Debug)]
pub enum ClbError {
    /// The name is invalid
    #[error("The name '{0}' is invalid")]
    InvalidName(String),

    /// A state string contains something else than 0, 1 and spacing
    #[error("Invalid state '{0}': expected a string of 0 and 1")]
    InvalidAssignment(String),

    /// The text does not follow the function definition syntax
    #[error("Syntax error:\n{0}")]
    Syntax(String),

    /// Two functions share the same name
    #[error("Found duplicate function \"{0}\"")]
    DuplicateFunction(String),

    /// A function depends on itself through other functions
    #[error("Definition for function {0} contains a cycle")]
    FunctionCycle(String),

    /// Nothing to map
    #[error("No functions were specified")]
    NoFunctions,

    /// The functions do not depend on any free variable
    #[error("The functions do not use any free variable")]
    NoFreeVariables,

    /// The truth tables would be too large to enumerate
    #[error("Too many free variables: {0} (at most {1} are supported)")]
    TooManyVariables(usize, usize),

    /// A variable has no value during evaluation
    #[error("Unable to evaluate variable \"{0}\": no value was provided")]
    UnboundVariable(String),

    /// Truth tables over different variable sets can not be compared
    #[error("Unable to compare truth tables of different size ({0} and {1} rows)")]
    TableSizeMismatch(usize, usize),

    /// An explicit output table does not fit the number of inputs
    #[error("Invalid output table size: expected {expected}, got {actual}")]
    TableSize { expected: usize, actual: usize },

    /// A search parameter is out of its valid range
    #[error("Invalid value was provided for {name}: {value} (expected {expected})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A genome does not match the functions or variables of an evaluator
    #[error("Genome is incompatible with the evaluator: {0}")]
    IncompatibleGenome(String),

    /// Every task of a generation failed
    #[error("The population is empty")]
    EmptyPopulation,

    /// The search was driven through an invalid transition
    #[error("Invalid search state: {0}")]
    InvalidState(&'static str),

    /// The worker pool could not be started
    #[error("Unable to start the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ClbError {
    pub(crate) fn parameter(name: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        }
    }
}
