//! Einsum subscript strings for [`SymArray`].
//!
//! Parses Einstein summation strings such as `"ij,jk->ik"` and evaluates them
//! over expression arrays through [`SymArray::einsum_labeled`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::array::SymArray;
use crate::error::{SymbolicError, SymbolicResult};

/// Parsed einsum specification with input and output subscripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EinsumSpec {
    /// Input subscripts (`["ij", "jk"]` for `"ij,jk->ik"`)
    pub inputs: Vec<Vec<char>>,
    /// Output subscript (`"ik"` for `"ij,jk->ik"`)
    pub output: Vec<char>,
    /// Indices summed over (appear in inputs but not output)
    pub summed_indices: HashSet<char>,
}

fn check_subscript(spec: &str, part: &str, what: &str) -> SymbolicResult<Vec<char>> {
    part.chars()
        .map(|ch| {
            if ch.is_ascii_alphabetic() {
                Ok(ch)
            } else {
                Err(SymbolicError::invalid_einsum(
                    spec,
                    format!("invalid character '{ch}' in {what}"),
                ))
            }
        })
        .collect()
}

impl EinsumSpec {
    /// Parse an einsum specification.
    ///
    /// - Explicit: `"ij,jk->ik"`
    /// - Implicit: `"ij,jk"`, output is every index occurring exactly once,
    ///   sorted
    pub fn parse(spec: &str) -> SymbolicResult<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SymbolicError::invalid_einsum(spec, "empty specification"));
        }

        let (input_part, output_part) = match spec.split_once("->") {
            Some((_, rest)) if rest.contains("->") => {
                return Err(SymbolicError::invalid_einsum(spec, "multiple '->' found"));
            }
            Some((lhs, rhs)) => (lhs, Some(rhs.trim())),
            None => (spec, None),
        };

        let inputs = input_part
            .split(',')
            .map(|s| check_subscript(spec, s.trim(), "subscript"))
            .collect::<SymbolicResult<Vec<_>>>()?;

        let mut counts: BTreeMap<char, usize> = BTreeMap::new();
        for ch in inputs.iter().flatten() {
            *counts.entry(*ch).or_insert(0) += 1;
        }

        let output = match output_part {
            Some(out) => {
                let out = check_subscript(spec, out, "output")?;
                if let Some(ch) = out.iter().find(|ch| !counts.contains_key(*ch)) {
                    return Err(SymbolicError::invalid_einsum(
                        spec,
                        format!("output index '{ch}' does not appear in any input"),
                    ));
                }
                out
            }
            None => counts
                .iter()
                .filter(|(_, &n)| n == 1)
                .map(|(&ch, _)| ch)
                .collect(),
        };

        let summed_indices = counts
            .keys()
            .copied()
            .filter(|ch| !output.contains(ch))
            .collect();

        Ok(EinsumSpec {
            inputs,
            output,
            summed_indices,
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Check if this is a reduction (has summed indices).
    pub fn is_reduction(&self) -> bool {
        !self.summed_indices.is_empty()
    }

    pub fn is_scalar_output(&self) -> bool {
        self.output.is_empty()
    }

    /// Evaluate against operand arrays.
    pub fn evaluate(&self, operands: &[&SymArray]) -> SymbolicResult<SymArray> {
        if operands.len() != self.inputs.len() {
            return Err(SymbolicError::invalid_einsum(
                self.to_string(),
                format!(
                    "expects {} operands, but {} provided",
                    self.inputs.len(),
                    operands.len()
                ),
            ));
        }
        let labeled: Vec<(&SymArray, &[char])> = operands
            .iter()
            .zip(&self.inputs)
            .map(|(array, labels)| (*array, labels.as_slice()))
            .collect();
        SymArray::einsum_labeled(&labeled, &self.output)
    }
}

impl fmt::Display for EinsumSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = self
            .inputs
            .iter()
            .map(|sub| sub.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(",");
        let output: String = self.output.iter().collect();
        write!(f, "{inputs}->{output}")
    }
}

impl SymArray {
    /// Einstein summation from a subscript string, e.g. `"ij,jk->ik"`.
    pub fn einsum(spec: &str, operands: &[&SymArray]) -> SymbolicResult<SymArray> {
        EinsumSpec::parse(spec)?.evaluate(operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;
    use crate::expr::Expr;

    fn ints(shape: &[usize], values: &[i64]) -> SymArray {
        SymArray::from_shape_vec(shape, values.iter().map(|&v| Expr::int(v)).collect()).unwrap()
    }

    #[test]
    fn test_parse_explicit_spec() {
        let spec = EinsumSpec::parse("ij,jk->ik").unwrap();

        assert_eq!(spec.inputs, vec![vec!['i', 'j'], vec!['j', 'k']]);
        assert_eq!(spec.output, vec!['i', 'k']);
        assert_eq!(spec.summed_indices.len(), 1);
        assert!(spec.summed_indices.contains(&'j'));
    }

    #[test]
    fn test_parse_implicit_spec_keeps_single_indices() {
        let spec = EinsumSpec::parse("ij,jk").unwrap();
        assert_eq!(spec.output, vec!['i', 'k']);
        assert!(spec.is_reduction());
    }

    #[test]
    fn test_parse_scalar_output() {
        let spec = EinsumSpec::parse("i,i->").unwrap();
        assert!(spec.is_scalar_output());
        assert!(spec.is_reduction());
    }

    #[test]
    fn test_parse_errors() {
        assert!(EinsumSpec::parse("").is_err());
        assert!(EinsumSpec::parse("i1,jk->ik").is_err());
        assert!(EinsumSpec::parse("ij->jk->ik").is_err());
        assert!(EinsumSpec::parse("ij->q").is_err());
    }

    #[test]
    fn test_display_roundtrips_explicit_form() {
        let spec = EinsumSpec::parse("ij,jk->ik").unwrap();
        assert_eq!(spec.to_string(), "ij,jk->ik");
    }

    #[test]
    fn test_einsum_matmul_and_trace() {
        on_engine_thread(|| {
            let a = ints(&[2, 2], &[1, 2, 3, 4]);
            let b = ints(&[2, 2], &[0, 1, 1, 0]);
            let ab = SymArray::einsum("ij,jk->ik", &[&a, &b]).unwrap();
            assert_eq!(ab, ints(&[2, 2], &[2, 1, 4, 3]));
            let tr = SymArray::einsum("ii->", &[&a]).unwrap();
            assert_eq!(tr.as_scalar(), Some(&Expr::int(5)));
        });
    }

    #[test]
    fn test_einsum_operand_count() {
        on_engine_thread(|| {
            let a = ints(&[2], &[1, 2]);
            assert!(SymArray::einsum("i,i->", &[&a]).is_err());
        });
    }
}
