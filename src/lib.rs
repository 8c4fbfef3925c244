//! Map Boolean functions onto an array of configurable logic blocks (CLBs).
//!
//! A [logic block](LogicBlock) is a lookup table: each input reads either a free variable or the output
//! of another block, and the output is selected in a table with one entry per combination of input values.
//! A [circuit](Genome) is an array of blocks wired without cycles, where each target function is computed
//! by one of the blocks. This crate searches for circuits realizing a set of functions with a genetic
//! algorithm: a population of random circuits is repeatedly mutated, and the mutants replace their parents
//! when they make fewer errors or use fewer blocks.
//!
//! # Boolean functions
//!
//! Functions are defined in a small language: each definition associates a name to a Boolean expression
//! using the ```and```, ```or```, ```not```, ```nand```, ```nor```, ```xor``` and ```xnor``` operators.
//! A function can use other functions, such references are substituted before the search.
//!
//! ```
//! use clbmap::{parse_functions, Evaluator, Rule, State};
//! # use clbmap::ClbError;
//! # fn main() -> Result<(), ClbError> {
//!
//! let functions = parse_functions("
//!     sum   <= A xor B xor Cin;
//!     carry <= A and B or Cin and (A xor B);
//! ")?;
//!
//! // The free variables are sorted by name
//! let evaluator = Evaluator::new(functions)?;
//! let variables = evaluator.variables();
//! assert_eq!(variables.to_string(), "A, B, Cin");
//!
//! // Evaluate a function on the assignment A=0, B=1, Cin=1
//! let state: State = "011".parse()?;
//! assert!(evaluator.functions()[1].eval(variables, &state)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Truth tables and fitness
//!
//! The quality of a circuit is measured by comparing the [truth table](TruthTable) of each function with the
//! truth table of the block computing it. The [fitness](Fitness) counts the wrong rows over all functions, then
//! the number of blocks involved in the computation of at least one function.
//!
//! ```
//! use clbmap::{parse_functions, Evaluator, Fitness, Genome, LogicBlock, Source};
//! # use clbmap::ClbError;
//! # fn main() -> Result<(), ClbError> {
//!
//! let evaluator = Evaluator::new(parse_functions("f <= not (A and B);")?)?;
//!
//! // Block 1 computes "A and B", block 2 inverts it
//! let and = LogicBlock::with_table(
//!     vec![Source::Variable(0), Source::Variable(1)],
//!     vec![false, false, false, true],
//! )?;
//! let not = LogicBlock::with_table(vec![Source::Block(0)], vec![true, false])?;
//! let mut genome = Genome::from_blocks(vec![and, not], vec![1], 2)?;
//!
//! assert_eq!(evaluator.evaluate(&mut genome)?, Fitness::new(0, 2));
//! # Ok(())
//! # }
//! ```
//!
//! # Search
//!
//! The [Solver] drives the search according to its [configuration](Config) and reports the progress of each
//! generation to an [Observer].
//!
//! ```
//! use clbmap::{parse_functions, Config, Evaluator, LogObserver, Solver};
//! # use clbmap::ClbError;
//! # fn main() -> Result<(), ClbError> {
//!
//! let evaluator = Evaluator::new(parse_functions("f <= A xor B;")?)?;
//! let mut config = Config::new(3, 2);
//! config.max_generations = 50;
//! config.first_acceptable = true;
//! config.seed = Some(42);
//!
//! let best = Solver::new(config, &evaluator)?.solve(&mut LogObserver)?;
//! println!("{}", best.named(evaluator.variables(), evaluator.functions()));
//! # Ok(())
//! # }
//! ```

mod block;
mod error;
mod evaluator;
mod expr;
mod function;
mod genome;
mod parse;
mod reach;
mod rules;
mod solver;
mod states;
mod table;
mod variable;

pub mod efmt;

#[macro_use]
extern crate pest_derive;

// Export public structures and API
pub use block::{LogicBlock, Source, MAX_INPUTS};
pub use error::ClbError;
pub use evaluator::Evaluator;
pub use expr::{Expr, ExprNode, Operator};
pub use function::{free_variables, resolve_functions, Function};
pub use genome::{BlockOutput, Fitness, Genome, NamedGenome, Shape};
pub use parse::{parse_expression, parse_functions, parse_functions_in};
pub use reach::Reachability;
pub use rules::Rule;
pub use solver::{Config, GenerationReport, LogObserver, Observer, Phase, Solver};
pub use states::State;
pub use table::TruthTable;
pub use variable::{check_name, Variables, MAX_VARIABLES};
