//! # Reaction Parser Module
//!
//! Parses reaction equation strings like
//! `"Galactose + Formate -> Galactitol + CO2"` or
//! `"NADH + 0.25 O2 -> NAD + 0.5 H2O"` into per-side (species, coefficient)
//! lists. Both `->` and `=>` arrows are accepted. Coefficients are optional
//! and default to 1.0. Species names must start with a letter; `+` is the
//! term separator, so ionic suffixes are written without it (NAD, not NAD+).

use crate::Reactions::reaction_step::BioprocessError;
use regex::Regex;

/// One side of a parsed equation: (species name, stoichiometric coefficient)
pub type SideTerms = Vec<(String, f64)>;

/// Parse a full reaction equation into reactant and product term lists
pub fn parse_reaction_equation(equation: &str) -> Result<(SideTerms, SideTerms), BioprocessError> {
    let (left, right) = split_arrow(equation)?;
    let reactants = parse_side(left, equation)?;
    let products = parse_side(right, equation)?;
    if reactants.is_empty() || products.is_empty() {
        return Err(BioprocessError::ReactionParse {
            equation: equation.to_string(),
            reason: "both sides of the equation must contain at least one species".to_string(),
        });
    }
    Ok((reactants, products))
}

fn split_arrow(equation: &str) -> Result<(&str, &str), BioprocessError> {
    for arrow in ["->", "=>"] {
        if let Some((left, right)) = equation.split_once(arrow) {
            return Ok((left, right));
        }
    }
    Err(BioprocessError::ReactionParse {
        equation: equation.to_string(),
        reason: "no '->' or '=>' arrow found".to_string(),
    })
}

fn parse_side(side: &str, equation: &str) -> Result<SideTerms, BioprocessError> {
    let term_re = Regex::new(r"^\s*(\d+(?:\.\d+)?)?\s*([A-Za-z][A-Za-z0-9_]*)\s*$")
        .expect("invalid term regex");
    let mut terms = SideTerms::new();
    for raw_term in side.split('+') {
        let raw_term = raw_term.trim();
        if raw_term.is_empty() {
            continue;
        }
        let captures = term_re
            .captures(raw_term)
            .ok_or_else(|| BioprocessError::ReactionParse {
                equation: equation.to_string(),
                reason: format!("cannot parse term '{}'", raw_term),
            })?;
        let coefficient = match captures.get(1) {
            Some(c) => c.as_str().parse::<f64>().map_err(|e| BioprocessError::ReactionParse {
                equation: equation.to_string(),
                reason: format!("bad coefficient in term '{}': {}", raw_term, e),
            })?,
            None => 1.0,
        };
        let species = captures[2].to_string();
        terms.push((species, coefficient));
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_simple_equation() {
        let (reactants, products) =
            parse_reaction_equation("Galactose + Formate -> Galactitol + CO2").unwrap();
        assert_eq!(reactants.len(), 2);
        assert_eq!(products.len(), 2);
        assert_eq!(reactants[0].0, "Galactose");
        assert_relative_eq!(reactants[0].1, 1.0);
        assert_eq!(products[1].0, "CO2");
    }

    #[test]
    fn test_parse_fractional_coefficients() {
        let (reactants, products) =
            parse_reaction_equation("NADH + 0.25 O2 -> NAD + 0.5 H2O").unwrap();
        assert_eq!(reactants[1].0, "O2");
        assert_relative_eq!(reactants[1].1, 0.25);
        assert_eq!(products[1].0, "H2O");
        assert_relative_eq!(products[1].1, 0.5);
    }

    #[test]
    fn test_parse_double_arrow() {
        let (reactants, products) = parse_reaction_equation("A => 2 B").unwrap();
        assert_eq!(reactants[0].0, "A");
        assert_relative_eq!(products[0].1, 2.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reaction_equation("Galactose + Formate").is_err());
        assert!(parse_reaction_equation("-> CO2").is_err());
        assert!(parse_reaction_equation("Galactose -> ").is_err());
        assert!(parse_reaction_equation("2.5.1 X -> Y").is_err());
    }
}
