//! Candidate circuits: wired logic blocks and their mutation operator

use crate::block::{LogicBlock, Source};
use crate::{ClbError, Function, Reachability, Rule, State, Variables};

use bit_set::BitSet;
use rand::distr::{Bernoulli, Distribution};
use rand::Rng;
use std::cmp::Ordering;
use std::fmt;

/// Quality of a circuit: the number of wrong rows over all functions, then the number of
/// blocks used to compute them. Lower is better on both criteria.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Fitness {
    pub error: usize,
    pub used_blocks: usize,
}

impl Fitness {
    /// Fitness of a circuit which was never evaluated
    pub const WORST: Fitness = Fitness {
        error: usize::MAX,
        used_blocks: usize::MAX,
    };

    pub fn new(error: usize, used_blocks: usize) -> Self {
        Self { error, used_blocks }
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.error, self.used_blocks)
    }
}

/// Dimensions of the circuits explored by a search
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Shape {
    pub num_blocks: usize,
    pub inputs_per_block: usize,
    pub num_variables: usize,
    pub num_functions: usize,
}

impl Shape {
    fn check(&self) -> Result<(), ClbError> {
        if self.num_blocks < 1 {
            return Err(ClbError::parameter(
                "number of blocks",
                self.num_blocks,
                "at least 1",
            ));
        }
        if self.num_variables < 1 {
            return Err(ClbError::NoFreeVariables);
        }
        if self.num_functions < 1 {
            return Err(ClbError::NoFunctions);
        }
        Ok(())
    }
}

/// An array of logic blocks wired together, and the block computing each function.
///
/// The wiring is always acyclic: an input of a block can only be connected to a block which
/// is not reachable from it. Each genome owns the [Reachability] index tracking its wiring,
/// cloning a genome rebuilds this index from the copied wiring.
///
/// Until it is evaluated, a new genome has the [worst fitness](Fitness::WORST), a clone keeps
/// the fitness of its parent.
#[derive(Debug)]
pub struct Genome {
    blocks: Vec<LogicBlock>,
    reach: Reachability,
    outputs: Vec<usize>,
    num_variables: usize,
    fitness: Fitness,
}

/// The value computed by one block of a genome, for a given assignment of the free variables
pub struct BlockOutput<'a> {
    genome: &'a Genome,
    block: usize,
}

impl Genome {
    /// Create a random genome.
    ///
    /// All inputs are connected to free variables, output tables are filled randomly and each
    /// function is computed by a random block.
    pub fn random<R: Rng + ?Sized>(shape: &Shape, rng: &mut R) -> Result<Self, ClbError> {
        shape.check()?;
        let mut blocks = Vec::with_capacity(shape.num_blocks);
        for _ in 0..shape.num_blocks {
            let mut block = LogicBlock::new(shape.inputs_per_block)?;
            for slot in 0..block.num_inputs() {
                let var = rng.random_range(0..shape.num_variables);
                block.set_input(slot, Source::Variable(var));
            }
            for entry in 0..block.table_size() {
                block.set_output(entry, rng.random_bool(0.5));
            }
            blocks.push(block);
        }
        let outputs = (0..shape.num_functions)
            .map(|_| rng.random_range(0..shape.num_blocks))
            .collect();

        Ok(Self {
            reach: Reachability::new(shape.num_blocks),
            blocks,
            outputs,
            num_variables: shape.num_variables,
            fitness: Fitness::WORST,
        })
    }

    /// Assemble a genome from explicit blocks.
    ///
    /// The outputs give the index of the block computing each function. Fails if a source or
    /// an output is out of range, or if the wiring contains a cycle.
    pub fn from_blocks(
        blocks: Vec<LogicBlock>,
        outputs: Vec<usize>,
        num_variables: usize,
    ) -> Result<Self, ClbError> {
        if blocks.is_empty() {
            return Err(ClbError::parameter("number of blocks", 0, "at least 1"));
        }
        for (idx, block) in blocks.iter().enumerate() {
            for src in block.inputs() {
                let valid = match *src {
                    Source::Variable(var) => var < num_variables,
                    Source::Block(b) => b < blocks.len(),
                };
                if !valid {
                    return Err(ClbError::IncompatibleGenome(format!(
                        "invalid source {:?} in block {}",
                        src,
                        idx + 1
                    )));
                }
            }
        }
        if let Some(o) = outputs.iter().find(|o| **o >= blocks.len()) {
            return Err(ClbError::IncompatibleGenome(format!(
                "no block {} for a function output",
                o + 1
            )));
        }

        let reach = Self::wire(&blocks).ok_or_else(|| {
            ClbError::IncompatibleGenome("the wiring of the blocks contains a cycle".into())
        })?;
        Ok(Self {
            blocks,
            reach,
            outputs,
            num_variables,
            fitness: Fitness::WORST,
        })
    }

    /// Build the reachability index of a wiring, None if it contains a cycle
    fn wire(blocks: &[LogicBlock]) -> Option<Reachability> {
        let mut reach = Reachability::new(blocks.len());
        for (idx, block) in blocks.iter().enumerate() {
            for src in block.inputs() {
                if let Source::Block(b) = *src {
                    if b == idx || reach.forward(idx).contains(b) {
                        return None;
                    }
                    reach.connect(b, idx);
                }
            }
        }
        Some(reach)
    }

    pub fn blocks(&self) -> &[LogicBlock] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Index of the block computing each function
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reach
    }

    pub fn fitness(&self) -> Fitness {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: Fitness) {
        self.fitness = fitness;
    }

    /// Order genomes by fitness, the best first
    pub fn compare_better(&self, other: &Genome) -> Ordering {
        self.fitness.cmp(&other.fitness)
    }

    /// The rule computed by the block realizing a function
    pub fn function_output(&self, function: usize) -> BlockOutput<'_> {
        self.block_output(self.outputs[function])
    }

    pub fn block_output(&self, block: usize) -> BlockOutput<'_> {
        BlockOutput {
            genome: self,
            block,
        }
    }

    /// Blocks which can be connected to an input of a block without creating a cycle
    pub fn valid_blocks(&self, block: usize) -> Vec<usize> {
        let forward = self.reach.forward(block);
        (0..self.blocks.len())
            .filter(|b| *b != block && !forward.contains(*b))
            .collect()
    }

    /// Tag a block and all blocks it reads from, directly or not
    pub fn tag(&self, root: usize, tags: &mut BitSet) {
        let mut stack = vec![root];
        while let Some(block) = stack.pop() {
            if !tags.insert(block) {
                continue;
            }
            for src in self.blocks[block].inputs() {
                if let Source::Block(b) = *src {
                    stack.push(b);
                }
            }
        }
    }

    /// The set of blocks involved in the computation of at least one function
    pub fn tagged_blocks(&self) -> BitSet {
        let mut tags = BitSet::with_capacity(self.blocks.len());
        for output in &self.outputs {
            self.tag(*output, &mut tags);
        }
        tags
    }

    /// Apply random changes, each of them with probability ```p```.
    ///
    /// Each entry of each output table may be flipped, each input of each block may be
    /// connected to a new source, and each function may be assigned to a new block.
    /// Returns true if a function was assigned to a new block or if a block used to compute a
    /// function was changed: otherwise the fitness can not change.
    ///
    /// Fails if ```p``` is not a probability.
    pub fn mutate<R: Rng + ?Sized>(&mut self, p: f64, rng: &mut R) -> Result<bool, ClbError> {
        let coin = Bernoulli::new(p)
            .map_err(|_| ClbError::parameter("mutation chance", p, "between 0 and 1"))?;

        let mut mutated = BitSet::new();
        for idx in 0..self.blocks.len() {
            let mut changed = false;
            let block = &mut self.blocks[idx];
            for entry in 0..block.table_size() {
                if coin.sample(rng) {
                    block.flip(entry);
                    changed = true;
                }
            }
            for slot in 0..self.blocks[idx].num_inputs() {
                if coin.sample(rng) {
                    self.rewire(idx, slot, rng);
                    changed = true;
                }
            }
            if changed {
                mutated.insert(idx);
            }
        }

        let num_blocks = self.blocks.len();
        let mut reassigned = false;
        for output in self.outputs.iter_mut() {
            if coin.sample(rng) {
                *output = rng.random_range(0..num_blocks);
                reassigned = true;
            }
        }

        Ok(reassigned || !self.tagged_blocks().is_disjoint(&mutated))
    }

    /// Connect an input to a random free variable or a random valid block
    fn rewire<R: Rng + ?Sized>(&mut self, block: usize, slot: usize, rng: &mut R) {
        let valid = self.valid_blocks(block);
        let pick = rng.random_range(0..self.num_variables + valid.len());
        let source = match pick < self.num_variables {
            true => Source::Variable(pick),
            false => Source::Block(valid[pick - self.num_variables]),
        };

        let old = self.blocks[block].input(slot);
        self.blocks[block].set_input(slot, source);
        if let Source::Block(old) = old {
            if !self.blocks[block].reads(Source::Block(old)) {
                self.reach.disconnect(old, block);
            }
        }
        if let Source::Block(b) = source {
            self.reach.connect(b, block);
        }
    }

    fn eval_block(&self, block: usize, state: &State, memo: &mut [Option<bool>]) -> bool {
        if let Some(value) = memo[block] {
            return value;
        }
        let value = self.blocks[block].evaluate_with(|src| match src {
            Source::Variable(var) => state.is_active(var),
            Source::Block(b) => self.eval_block(b, state, memo),
        });
        memo[block] = Some(value);
        value
    }

    /// Display the wiring using the names of variables and functions
    pub fn named<'a>(
        &'a self,
        variables: &'a Variables,
        functions: &'a [Function],
    ) -> NamedGenome<'a> {
        NamedGenome {
            genome: self,
            variables,
            functions,
        }
    }
}

impl Clone for Genome {
    fn clone(&self) -> Self {
        let blocks = self.blocks.clone();
        // The wiring of a genome is acyclic by construction
        let reach = Self::wire(&blocks).unwrap_or_else(|| self.reach.clone());
        Self {
            blocks,
            reach,
            outputs: self.outputs.clone(),
            num_variables: self.num_variables,
            fitness: self.fitness,
        }
    }
}

impl Rule for BlockOutput<'_> {
    fn eval(&self, variables: &Variables, state: &State) -> Result<bool, ClbError> {
        if variables.len() != self.genome.num_variables {
            return Err(ClbError::IncompatibleGenome(format!(
                "expected {} variables, got {}",
                self.genome.num_variables,
                variables.len()
            )));
        }
        let mut memo = vec![None; self.genome.blocks.len()];
        Ok(self.genome.eval_block(self.block, state, &mut memo))
    }
}

pub struct NamedGenome<'a> {
    genome: &'a Genome,
    variables: &'a Variables,
    functions: &'a [Function],
}

impl fmt::Display for NamedGenome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let separator = "-------------------";
        for (idx, block) in self.genome.blocks.iter().enumerate() {
            writeln!(f, "Block {}:", idx + 1)?;
            writeln!(f, "{}", separator)?;
            for (slot, src) in block.inputs().iter().enumerate() {
                match *src {
                    Source::Variable(var) => writeln!(
                        f,
                        "{} <= {}",
                        slot,
                        self.variables.name(var).unwrap_or("?")
                    )?,
                    Source::Block(b) => writeln!(f, "{} <= Block {}", slot, b + 1)?,
                }
            }
            writeln!(f)?;
            let width = block.num_inputs();
            for (entry, value) in block.table().iter().enumerate() {
                writeln!(f, "{:0w$b}: {}", entry, *value as u8, w = width)?;
            }
            writeln!(f, "{}", separator)?;
        }
        for (idx, output) in self.genome.outputs.iter().enumerate() {
            let name = self.functions.get(idx).map(Function::name).unwrap_or("?");
            writeln!(f, "{} => Block {}", name, output + 1)?;
        }
        Ok(())
    }
}
