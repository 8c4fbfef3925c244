//! Configurable logic blocks: lookup tables with wired inputs

use crate::ClbError;

/// Largest number of inputs of a single block
pub const MAX_INPUTS: usize = 16;

/// The origin of the value read by an input slot
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Source {
    /// A free variable, identified by its rank in the variable collection
    Variable(usize),
    /// The output of another block of the same circuit
    Block(usize),
}

/// A lookup table with a fixed number of inputs.
///
/// The output table has one entry for each combination of input values. The entry is selected
/// by packing the input values in a binary number where the first input is the most
/// significant bit.
///
/// ```
/// use clbmap::{LogicBlock, Source};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// // A block computing "A and not B"
/// let inputs = vec![Source::Variable(0), Source::Variable(1)];
/// let block = LogicBlock::with_table(inputs, vec![false, false, true, false])?;
///
/// let value = block.evaluate_with(|src| src == Source::Variable(0));
/// assert!(value);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LogicBlock {
    inputs: Vec<Source>,
    table: Vec<bool>,
}

impl LogicBlock {
    /// Create a block where every input reads the first variable and every output is false
    pub fn new(num_inputs: usize) -> Result<Self, ClbError> {
        check_inputs(num_inputs)?;
        Ok(Self {
            inputs: vec![Source::Variable(0); num_inputs],
            table: vec![false; 1 << num_inputs],
        })
    }

    /// Create a block with explicit inputs and output table
    pub fn with_table(inputs: Vec<Source>, table: Vec<bool>) -> Result<Self, ClbError> {
        check_inputs(inputs.len())?;
        let expected = 1 << inputs.len();
        if table.len() != expected {
            return Err(ClbError::TableSize {
                expected,
                actual: table.len(),
            });
        }
        Ok(Self { inputs, table })
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn table_size(&self) -> usize {
        self.table.len()
    }

    pub fn inputs(&self) -> &[Source] {
        &self.inputs
    }

    pub fn input(&self, slot: usize) -> Source {
        self.inputs[slot]
    }

    pub(crate) fn set_input(&mut self, slot: usize, source: Source) {
        self.inputs[slot] = source;
    }

    /// Test if any input slot reads the given source
    pub fn reads(&self, source: Source) -> bool {
        self.inputs.contains(&source)
    }

    pub fn table(&self) -> &[bool] {
        &self.table
    }

    pub fn output(&self, index: usize) -> bool {
        self.table[index]
    }

    pub fn set_output(&mut self, index: usize, value: bool) {
        self.table[index] = value;
    }

    /// Toggle one entry of the output table
    pub fn flip(&mut self, index: usize) {
        self.table[index] ^= true;
    }

    /// Pack the values of the inputs into a table index, the first input being the most
    /// significant bit.
    pub fn table_index(values: impl IntoIterator<Item = bool>) -> usize {
        values
            .into_iter()
            .fold(0, |index, value| (index << 1) | value as usize)
    }

    /// Compute the output of the block, resolving each input with the given closure
    pub fn evaluate_with<F: FnMut(Source) -> bool>(&self, mut resolve: F) -> bool {
        let index = Self::table_index(self.inputs.iter().map(|src| resolve(*src)));
        self.table[index]
    }
}

fn check_inputs(num_inputs: usize) -> Result<(), ClbError> {
    if num_inputs < 1 || num_inputs > MAX_INPUTS {
        return Err(ClbError::parameter(
            "inputs per block",
            num_inputs,
            "between 1 and 16",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn construction() -> Result<(), ClbError> {
        for n in 1..=4 {
            let block = LogicBlock::new(n)?;
            assert_eq!(block.num_inputs(), n);
            assert_eq!(block.table_size(), 1 << n);
        }
        assert!(LogicBlock::new(0).is_err());
        assert!(LogicBlock::new(MAX_INPUTS + 1).is_err());

        let inputs = vec![Source::Variable(0), Source::Block(3)];
        assert!(matches!(
            LogicBlock::with_table(inputs, vec![true; 3]),
            Err(ClbError::TableSize {
                expected: 4,
                actual: 3
            })
        ));
        Ok(())
    }

    #[test]
    fn msb_first_lookup() -> Result<(), ClbError> {
        assert_eq!(LogicBlock::table_index([true, false, false]), 4);
        assert_eq!(LogicBlock::table_index([false, true, true]), 3);

        // Only entry 1 (first input low, second input high) is true
        let inputs = vec![Source::Variable(0), Source::Variable(1)];
        let mut block = LogicBlock::with_table(inputs, vec![false, true, false, false])?;
        let value = |b: &LogicBlock, a: bool, bb: bool| {
            b.evaluate_with(|src| match src {
                Source::Variable(0) => a,
                _ => bb,
            })
        };
        assert!(value(&block, false, true));
        assert!(!value(&block, true, false));

        block.flip(2);
        assert!(value(&block, true, false));
        block.set_output(2, false);
        assert!(!block.output(2));
        Ok(())
    }

    #[test]
    fn each_entry_selected_once() -> Result<(), ClbError> {
        for n in 1..=4 {
            let inputs: Vec<Source> = (0..n).map(Source::Variable).collect();
            let size = 1 << n;
            for entry in 0..size {
                let mut table = vec![false; size];
                table[entry] = true;
                let block = LogicBlock::with_table(inputs.clone(), table)?;

                // Enumerate assignments in counting order, the first input as high bit
                let selected: Vec<usize> = (0..size)
                    .filter(|row| {
                        block.evaluate_with(|src| match src {
                            Source::Variable(v) => (row >> (n - 1 - v)) & 1 == 1,
                            Source::Block(_) => false,
                        })
                    })
                    .collect();
                assert_eq!(selected, vec![entry]);
            }
        }
        Ok(())
    }

    #[test]
    fn wiring() -> Result<(), ClbError> {
        let mut block = LogicBlock::new(3)?;
        assert!(block.inputs().iter().all(|s| *s == Source::Variable(0)));
        block.set_input(1, Source::Block(5));
        assert!(block.reads(Source::Block(5)));
        assert_eq!(block.input(1), Source::Block(5));
        block.set_input(1, Source::Variable(2));
        assert!(!block.reads(Source::Block(5)));
        Ok(())
    }
}
