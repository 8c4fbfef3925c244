//! Fitness of candidate circuits against the target functions

use crate::efmt::PrefixFormatted;
use crate::function::{free_variables, resolve_functions};
use crate::{ClbError, Fitness, Function, Genome, Shape, TruthTable, Variables};

use bit_set::BitSet;
use log::debug;

/// Compare circuits with a set of target functions.
///
/// References between functions are substituted once, and the truth table of each function
/// over the sorted set of free variables is computed when the evaluator is created.
///
/// ```
/// use clbmap::{parse_functions, Evaluator};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let evaluator = Evaluator::new(parse_functions("f <= B and A; g <= not f;")?)?;
/// assert_eq!(evaluator.variables().to_string(), "A, B");
/// assert_eq!(evaluator.functions()[1].to_string(), "g <= not (B and A);");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Evaluator {
    functions: Vec<Function>,
    variables: Variables,
    targets: Vec<TruthTable>,
}

impl Evaluator {
    pub fn new(functions: Vec<Function>) -> Result<Self, ClbError> {
        if functions.is_empty() {
            return Err(ClbError::NoFunctions);
        }
        let variables = free_variables(&functions);
        let functions = resolve_functions(&functions)?;
        if variables.is_empty() {
            return Err(ClbError::NoFreeVariables);
        }
        variables.check_size()?;

        let targets = functions
            .iter()
            .map(|f| TruthTable::new(f, &variables))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Free variables: {}", &variables);
        for f in &functions {
            debug!("Target {}", PrefixFormatted(f));
        }
        Ok(Self {
            functions,
            variables,
            targets,
        })
    }

    /// The target functions, where references to other functions are substituted
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The sorted free variables
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// The truth table of each function
    pub fn targets(&self) -> &[TruthTable] {
        &self.targets
    }

    /// Dimensions of the circuits which can be evaluated
    pub fn shape(&self, num_blocks: usize, inputs_per_block: usize) -> Shape {
        Shape {
            num_blocks,
            inputs_per_block,
            num_variables: self.variables.len(),
            num_functions: self.functions.len(),
        }
    }

    /// Compute and store the fitness of a genome.
    ///
    /// The error is the number of rows where the block computing a function disagrees with its
    /// target, summed over all functions. The used blocks are the blocks involved in the
    /// computation of at least one function.
    pub fn evaluate(&self, genome: &mut Genome) -> Result<Fitness, ClbError> {
        if genome.outputs().len() != self.functions.len() {
            return Err(ClbError::IncompatibleGenome(format!(
                "{} outputs for {} functions",
                genome.outputs().len(),
                self.functions.len()
            )));
        }
        if genome.num_variables() != self.variables.len() {
            return Err(ClbError::IncompatibleGenome(format!(
                "{} inputs for {} free variables",
                genome.num_variables(),
                self.variables.len()
            )));
        }

        let mut error = 0;
        let mut tags = BitSet::with_capacity(genome.num_blocks());
        for (idx, target) in self.targets.iter().enumerate() {
            let table = TruthTable::new(&genome.function_output(idx), &self.variables)?;
            error += table.mismatch_count(target)?;
            genome.tag(genome.outputs()[idx], &mut tags);
        }

        let fitness = Fitness::new(error, tags.len());
        genome.set_fitness(fitness);
        Ok(fitness)
    }
}

#[cfg(test)]
mod tests {
    use crate::block::{LogicBlock, Source};
    use crate::*;

    fn a_b() -> Vec<Source> {
        vec![Source::Variable(0), Source::Variable(1)]
    }

    #[test_log::test]
    fn exact_mapping() -> Result<(), ClbError> {
        let evaluator = Evaluator::new(parse_functions("f1 <= not A; f2 <= A and B;")?)?;
        let blocks = vec![
            LogicBlock::with_table(a_b(), vec![true, true, false, false])?,
            LogicBlock::with_table(a_b(), vec![false, false, false, true])?,
            LogicBlock::with_table(a_b(), vec![true, false, true, false])?,
        ];
        let mut genome = Genome::from_blocks(blocks, vec![0, 1], 2)?;

        let fitness = evaluator.evaluate(&mut genome)?;
        assert_eq!(fitness, Fitness::new(0, 2));
        assert_eq!(genome.fitness(), fitness);
        Ok(())
    }

    #[test]
    fn counts_errors() -> Result<(), ClbError> {
        let evaluator = Evaluator::new(parse_functions("f <= A or B;")?)?;
        let blocks = vec![LogicBlock::with_table(a_b(), vec![false, false, false, true])?];
        let mut genome = Genome::from_blocks(blocks, vec![0], 2)?;

        assert_eq!(evaluator.evaluate(&mut genome)?, Fitness::new(2, 1));
        Ok(())
    }

    #[test]
    fn chained_blocks() -> Result<(), ClbError> {
        let evaluator = Evaluator::new(parse_functions("f <= not g; g <= A and B;")?)?;
        let blocks = vec![
            LogicBlock::with_table(a_b(), vec![false, false, false, true])?,
            LogicBlock::with_table(
                vec![Source::Block(0), Source::Block(0)],
                vec![true, false, false, false],
            )?,
            LogicBlock::with_table(a_b(), vec![true, true, true, true])?,
        ];
        let mut genome = Genome::from_blocks(blocks, vec![1, 0], 2)?;
        assert_eq!(evaluator.evaluate(&mut genome)?, Fitness::new(0, 2));

        // Both functions computed by the same single block: f is wrong on every row
        let mut shared = Genome::from_blocks(genome.blocks().to_vec(), vec![0, 0], 2)?;
        assert_eq!(evaluator.evaluate(&mut shared)?, Fitness::new(4, 1));
        Ok(())
    }

    #[test]
    fn invalid_targets() -> Result<(), ClbError> {
        assert!(matches!(Evaluator::new(vec![]), Err(ClbError::NoFunctions)));
        assert!(matches!(
            Evaluator::new(parse_functions("f <= g; g <= f;")?),
            Err(ClbError::FunctionCycle(_))
        ));
        assert!(matches!(
            Evaluator::new(parse_functions("f <= A; f <= B;")?),
            Err(ClbError::DuplicateFunction(_))
        ));
        Ok(())
    }

    #[test]
    fn incompatible_genome() -> Result<(), ClbError> {
        let evaluator = Evaluator::new(parse_functions("f <= A or B;")?)?;
        let block = LogicBlock::with_table(vec![Source::Variable(0)], vec![false, true])?;

        let mut genome = Genome::from_blocks(vec![block.clone()], vec![0, 0], 2)?;
        assert!(evaluator.evaluate(&mut genome).is_err());

        let mut genome = Genome::from_blocks(vec![block], vec![0], 1)?;
        assert!(matches!(
            evaluator.evaluate(&mut genome),
            Err(ClbError::IncompatibleGenome(_))
        ));
        Ok(())
    }

    #[test]
    fn random_genomes() -> Result<(), ClbError> {
        use rand::SeedableRng;

        let evaluator = Evaluator::new(parse_functions("s <= A xor B xor C; c <= A and B;")?)?;
        let shape = evaluator.shape(5, 3);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20 {
            let mut genome = Genome::random(&shape, &mut rng)?;
            let fitness = evaluator.evaluate(&mut genome)?;
            assert!(fitness.used_blocks >= 1);
            assert!(fitness.used_blocks <= 5);
            assert!(fitness.error <= 16);
        }
        Ok(())
    }
}
