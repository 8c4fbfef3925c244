//! Read functions and expressions from the definition language

use crate::{ClbError, Expr, Function, Operator};
use pest::error::Error as PestError;
use pest::iterators::{Pair, Pairs};
use pest::Parser;

#[derive(Parser)]
#[grammar_inline = r####"
program    = _{ SOI ~ (definition | ";")* ~ EOI }
definition =  { ident ~ "<=" ~ disj ~ ";" }
expression = _{ SOI ~ disj ~ EOI }

disj  = { ndisj ~ ((op_or | op_xor) ~ ndisj)* }
ndisj = { conj ~ ((op_nor | op_xnor) ~ conj)* }
conj  = { nconj ~ (op_and ~ nconj)* }
nconj = { term ~ (op_nand ~ term)* }
term  = _{ neg | ident | "(" ~ disj ~ ")" }
neg   =  { op_not ~ term }

op_or   = @{ "or" ~ !ident_char }
op_xor  = @{ "xor" ~ !ident_char }
op_nor  = @{ "nor" ~ !ident_char }
op_xnor = @{ "xnor" ~ !ident_char }
op_and  = @{ "and" ~ !ident_char }
op_nand = @{ "nand" ~ !ident_char }
op_not  = @{ "not" ~ !ident_char }

keyword    = @{ ("nand" | "nor" | "not" | "and" | "or" | "xnor" | "xor") ~ !ident_char }
ident      = @{ !keyword ~ (ASCII_ALPHA | "_" | "$") ~ ident_char* }
ident_char = _{ ASCII_ALPHANUMERIC | "_" | "$" }

WHITESPACE = _{ " " | "\t" | NEWLINE }
"####]
struct DefinitionParser;

/// Parse a list of function definitions.
///
/// Each definition has the form ```name <= expression;```. Empty statements are ignored.
///
/// ```
/// use clbmap::parse_functions;
/// # use clbmap::ClbError;
/// # fn main() -> Result<(), ClbError> {
///
/// let functions = parse_functions("f <= A and B; g <= not f;")?;
/// assert_eq!(functions.len(), 2);
/// assert_eq!(functions[1].to_string(), "g <= not f;");
/// # Ok(())
/// # }
/// ```
pub fn parse_functions(text: &str) -> Result<Vec<Function>, ClbError> {
    _parse_functions(text, None)
}

/// Parse a list of function definitions, mentioning the source in syntax errors
pub fn parse_functions_in(text: &str, path: &str) -> Result<Vec<Function>, ClbError> {
    _parse_functions(text, Some(path))
}

/// Parse a single expression
pub fn parse_expression(text: &str) -> Result<Expr, ClbError> {
    let mut pairs =
        DefinitionParser::parse(Rule::expression, text).map_err(|e| syntax_error(e, None))?;
    load_expr(next_pair(&mut pairs)?)
}

fn _parse_functions(text: &str, path: Option<&str>) -> Result<Vec<Function>, ClbError> {
    let pairs = DefinitionParser::parse(Rule::program, text).map_err(|e| syntax_error(e, path))?;

    let mut functions = vec![];
    for pair in pairs {
        if pair.as_rule() != Rule::definition {
            continue;
        }
        let mut inner = pair.into_inner();
        let name = next_pair(&mut inner)?.as_str();
        let expr = load_expr(next_pair(&mut inner)?)?;
        functions.push(Function::new(name, expr)?);
    }
    Ok(functions)
}

fn syntax_error(e: PestError<Rule>, path: Option<&str>) -> ClbError {
    let e = e.renamed_rules(|rule| {
        match rule {
            Rule::ident => "identifier",
            Rule::op_or | Rule::op_xor => "'or' or 'xor'",
            Rule::op_nor | Rule::op_xnor => "'nor' or 'xnor'",
            Rule::op_and => "'and'",
            Rule::op_nand => "'nand'",
            Rule::op_not => "'not'",
            Rule::definition => "definition",
            Rule::EOI => "end of input",
            _ => "expression",
        }
        .to_string()
    });
    let e = match path {
        Some(path) => e.with_path(path),
        None => e,
    };
    ClbError::Syntax(e.to_string())
}

fn next_pair<'a>(pairs: &mut Pairs<'a, Rule>) -> Result<Pair<'a, Rule>, ClbError> {
    pairs
        .next()
        .ok_or_else(|| ClbError::Syntax("unexpected end of expression".into()))
}

fn operator(rule: Rule) -> Option<Operator> {
    match rule {
        Rule::op_or => Some(Operator::Or),
        Rule::op_xor => Some(Operator::Xor),
        Rule::op_nor => Some(Operator::Nor),
        Rule::op_xnor => Some(Operator::Xnor),
        Rule::op_and => Some(Operator::And),
        Rule::op_nand => Some(Operator::Nand),
        _ => None,
    }
}

fn load_expr(pair: Pair<Rule>) -> Result<Expr, ClbError> {
    match pair.as_rule() {
        Rule::ident => Ok(Expr::var(pair.as_str())),
        Rule::neg => {
            // The first child is the keyword itself
            let mut inner = pair.into_inner().skip(1);
            match inner.next() {
                Some(operand) => Ok(!load_expr(operand)?),
                None => Err(ClbError::Syntax("missing operand after 'not'".into())),
            }
        }
        Rule::disj | Rule::ndisj | Rule::conj | Rule::nconj => {
            let mut inner = pair.into_inner();
            let mut expr = load_expr(next_pair(&mut inner)?)?;
            while let Some(op) = inner.next() {
                let op_str = op.as_str().to_string();
                let op = operator(op.as_rule())
                    .ok_or_else(|| ClbError::Syntax(format!("unexpected token '{}'", op_str)))?;
                let rhs = load_expr(next_pair(&mut inner)?)?;
                expr = op.join(expr, rhs);
            }
            Ok(expr)
        }
        _ => Err(ClbError::Syntax(format!(
            "unexpected token '{}'",
            pair.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn precedence() -> Result<(), ClbError> {
        let e: Expr = "A or B and C".parse()?;
        assert_eq!(e, Expr::var("A") | (Expr::var("B") & Expr::var("C")));

        let e: Expr = "A nor B or C".parse()?;
        let expected = Operator::Or.join(
            Operator::Nor.join(Expr::var("A"), Expr::var("B")),
            Expr::var("C"),
        );
        assert_eq!(e, expected);

        let e: Expr = "A and B nand C".parse()?;
        let expected = Operator::And.join(
            Expr::var("A"),
            Operator::Nand.join(Expr::var("B"), Expr::var("C")),
        );
        assert_eq!(e, expected);

        let e: Expr = "not A and B".parse()?;
        assert_eq!(e, !Expr::var("A") & Expr::var("B"));

        let e: Expr = "not not A".parse()?;
        assert_eq!(e, Expr::var("A"));
        Ok(())
    }

    #[test]
    fn left_associative() -> Result<(), ClbError> {
        let e: Expr = "A xor B or C".parse()?;
        let expected = Operator::Or.join(
            Operator::Xor.join(Expr::var("A"), Expr::var("B")),
            Expr::var("C"),
        );
        assert_eq!(e, expected);

        let e: Expr = "A nand (B nand C)".parse()?;
        assert_eq!(e.to_string(), "A nand (B nand C)");
        let e: Expr = "(A nand B) nand C".parse()?;
        assert_eq!(e.to_string(), "A nand B nand C");
        Ok(())
    }

    #[test]
    fn keyword_boundaries() -> Result<(), ClbError> {
        let e: Expr = "andy or notary".parse()?;
        assert_eq!(e, Expr::var("andy") | Expr::var("notary"));

        let e: Expr = "$x_1 and\n\t_y".parse()?;
        assert_eq!(e.variables_used().len(), 2);

        assert!("A andB".parse::<Expr>().is_err());
        assert!("and".parse::<Expr>().is_err());
        assert!("A or".parse::<Expr>().is_err());
        assert!("1A".parse::<Expr>().is_err());
        Ok(())
    }

    #[test]
    fn definitions() -> Result<(), ClbError> {
        let text = "
            sum   <= A xor B xor Cin;
            carry <= A and B or Cin and (A xor B);
            ;
        ";
        let functions = parse_functions(text)?;
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name(), "sum");
        assert_eq!(
            functions[1].to_string(),
            "carry <= A and B or Cin and (A xor B);"
        );

        // The display is parsed back to the same definitions
        let displayed: String = functions.iter().map(|f| f.to_string()).collect();
        assert_eq!(parse_functions(&displayed)?, functions);

        assert!(parse_functions("").map(|f| f.is_empty())?);
        Ok(())
    }

    #[test]
    fn syntax_errors() {
        let err = parse_functions_in("f <= A and B", "input.txt").unwrap_err();
        match err {
            ClbError::Syntax(msg) => {
                assert!(msg.contains("input.txt"));
                assert!(msg.contains("1:13"));
            }
            e => panic!("unexpected error {:?}", e),
        }

        assert!(parse_functions("f = A;").is_err());
        assert!(parse_functions("or <= A;").is_err());
        assert!(parse_functions("f <= A;\ng <= (B;").is_err());
    }
}
