//! Named target functions and the resolution of references between them

use crate::efmt;
use crate::variable::check_name;
use crate::{ClbError, Expr, Rule, State, Variables};

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A named Boolean function: ```name <= expression;```
///
/// The expression may use other functions by name, such references are resolved by
/// [resolve_functions] before the truth tables are computed.
#[derive(Clone, PartialEq, Debug)]
pub struct Function {
    name: String,
    expr: Expr,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Active,
    Done,
}

impl Function {
    pub fn new(name: impl Into<String>, expr: Expr) -> Result<Self, ClbError> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self { name, expr })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Names used in the definition, including other functions
    pub fn variables_used(&self) -> BTreeSet<String> {
        self.expr.variables_used()
    }

    /// Replace all occurrences of a name with a sub-expression
    pub fn replace_variable(&self, name: &str, expr: &Expr) -> Self {
        Self {
            name: self.name.clone(),
            expr: self.expr.replace_variable(name, expr),
        }
    }
}

impl Rule for Function {
    fn eval(&self, variables: &Variables, state: &State) -> Result<bool, ClbError> {
        self.expr.eval(variables, state)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&efmt::KEYWORD_FMT_CFG.infix(self), f)
    }
}

/// Substitute references between functions until each definition only uses free variables.
///
/// The result keeps the order of the input. Fails if two functions share a name, or if a
/// function depends on itself through a chain of references.
///
/// ```
/// use clbmap::{parse_functions, resolve_functions};
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let functions = parse_functions("g <= f or C; f <= A and B;")?;
/// let resolved = resolve_functions(&functions)?;
/// assert_eq!(resolved[0].to_string(), "g <= A and B or C;");
///
/// let cyclic = parse_functions("f <= g; g <= not f;")?;
/// assert!(resolve_functions(&cyclic).is_err());
/// # Ok(())
/// # }
/// ```
pub fn resolve_functions(functions: &[Function]) -> Result<Vec<Function>, ClbError> {
    let mut index = HashMap::new();
    for (idx, f) in functions.iter().enumerate() {
        if index.insert(f.name(), idx).is_some() {
            return Err(ClbError::DuplicateFunction(f.name().into()));
        }
    }

    let mut marks = vec![None; functions.len()];
    let mut resolved: Vec<Option<Expr>> = vec![None; functions.len()];
    for idx in 0..functions.len() {
        resolve(idx, functions, &index, &mut marks, &mut resolved)?;
    }

    functions
        .iter()
        .zip(resolved)
        .map(|(f, expr)| match expr {
            Some(expr) => Ok(Function {
                name: f.name.clone(),
                expr,
            }),
            None => Err(ClbError::FunctionCycle(f.name.clone())),
        })
        .collect()
}

fn resolve(
    idx: usize,
    functions: &[Function],
    index: &HashMap<&str, usize>,
    marks: &mut [Option<Mark>],
    resolved: &mut [Option<Expr>],
) -> Result<(), ClbError> {
    match marks[idx] {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Active) => return Err(ClbError::FunctionCycle(functions[idx].name.clone())),
        None => marks[idx] = Some(Mark::Active),
    }

    let deps: Vec<usize> = functions[idx]
        .variables_used()
        .iter()
        .filter_map(|name| index.get(name.as_str()).copied())
        .collect();
    for &dep in &deps {
        resolve(dep, functions, index, marks, resolved)?;
    }

    let expr = functions[idx].expr.rewrite_cow(&|name| {
        index
            .get(name)
            .and_then(|&dep| resolved[dep].as_ref())
            .cloned()
    });
    log::trace!("Resolved {} <= {}", functions[idx].name, &expr);
    resolved[idx] = Some(expr);
    marks[idx] = Some(Mark::Done);
    Ok(())
}

/// The sorted set of variables used by the functions which are not themselves functions
pub fn free_variables(functions: &[Function]) -> Variables {
    let names: BTreeSet<&str> = functions.iter().map(Function::name).collect();
    let mut used = BTreeSet::new();
    for f in functions {
        f.expr.collect_variables(&mut used);
    }
    used.retain(|v| !names.contains(v.as_str()));
    Variables::from(used)
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn names() -> Result<(), ClbError> {
        let expr: Expr = "A and B".parse()?;
        assert!(Function::new("f", expr.clone()).is_ok());
        assert!(matches!(
            Function::new("xor", expr.clone()),
            Err(ClbError::InvalidName(_))
        ));
        assert!(Function::new("2f", expr).is_err());
        Ok(())
    }

    #[test]
    fn substitution() -> Result<(), ClbError> {
        let functions = parse_functions("h <= g and not f; g <= f xor C; f <= A or B;")?;
        let resolved = resolve_functions(&functions)?;

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].to_string(), "f <= A or B;");
        assert_eq!(resolved[1].to_string(), "g <= A or B xor C;");
        for f in &resolved {
            for name in f.variables_used() {
                assert!(["A", "B", "C"].contains(&name.as_str()));
            }
        }

        // Substitution preserves the semantics of the original definitions
        let variables = Variables::from_iter(["A", "B", "C"]);
        for row in 0..variables.num_rows() {
            let state = State::from_row(row, variables.len());
            let f = resolved[2].eval(&variables, &state)?;
            let g = resolved[1].eval(&variables, &state)?;
            let expected_g = f != state.is_active(2);
            assert_eq!(g, expected_g);
            assert_eq!(resolved[0].eval(&variables, &state)?, g && !f);
        }
        Ok(())
    }

    #[test]
    fn invalid_sets() -> Result<(), ClbError> {
        let duplicated = parse_functions("f <= A; f <= B;")?;
        assert!(matches!(
            resolve_functions(&duplicated),
            Err(ClbError::DuplicateFunction(name)) if name == "f"
        ));

        let self_loop = parse_functions("f <= f and A;")?;
        assert!(matches!(
            resolve_functions(&self_loop),
            Err(ClbError::FunctionCycle(_))
        ));

        let cycle = parse_functions("a <= b; b <= c or X; c <= a;")?;
        assert!(matches!(
            resolve_functions(&cycle),
            Err(ClbError::FunctionCycle(_))
        ));
        Ok(())
    }

    #[test]
    fn free_vars() -> Result<(), ClbError> {
        let functions = parse_functions("g <= f or C; f <= B and A;")?;
        let vars = free_variables(&functions);
        assert_eq!(vars.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);

        let functions = parse_functions("f <= g; g <= f;")?;
        assert!(free_variables(&functions).is_empty());
        Ok(())
    }
}
