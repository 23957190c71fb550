//! Index-notation strings such as `"A^{a}_{b} B^b_c"`.
//!
//! A token is a tensor name followed by any number of `^` (upper) and `_`
//! (lower) blocks. A block is either a braced list `{a,b}` / `{a b}` or a
//! single character. Entries spelled `_`, `.`, `empty` or left blank mark
//! an unlabelled axis.

use crate::error::{GeometryError, GeometryResult};
use crate::index::{Index, Slot};
use crate::signature::Variance;

/// One parsed `name^{...}_{...}` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorToken {
    pub name: String,
    pub up: Vec<Option<String>>,
    pub down: Vec<Option<String>>,
}

fn label_entry(raw: &str) -> Option<String> {
    match raw.trim() {
        "" | "_" | "." | "empty" => None,
        name => Some(name.to_string()),
    }
}

fn split_block(block: &str) -> Vec<Option<String>> {
    if block.contains(',') {
        block.split(',').map(label_entry).collect()
    } else {
        block.split_whitespace().map(label_entry).collect()
    }
}

/// Parse a single token.
pub fn parse_token(token: &str) -> GeometryResult<TensorToken> {
    let chars: Vec<char> = token.trim().chars().collect();
    let name_len = chars
        .iter()
        .take_while(|c| c.is_alphanumeric())
        .count();
    if name_len == 0 {
        return Err(GeometryError::parse(token, "missing tensor name"));
    }
    let name: String = chars[..name_len].iter().collect();

    let mut up = Vec::new();
    let mut down = Vec::new();
    let mut i = name_len;
    while i < chars.len() {
        let target = match chars[i] {
            '^' => &mut up,
            '_' => &mut down,
            other => {
                return Err(GeometryError::parse(
                    token,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        i += 1;
        match chars.get(i) {
            Some('{') => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .ok_or_else(|| GeometryError::parse(token, "unclosed '{'"))?;
                let block: String = chars[i + 1..i + close].iter().collect();
                target.extend(split_block(&block));
                i += close + 1;
            }
            Some(&c) if c.is_alphanumeric() || c == '.' => {
                target.push(label_entry(&c.to_string()));
                i += 1;
            }
            _ => {
                return Err(GeometryError::parse(
                    token,
                    "expected a label or '{' after '^' or '_'",
                ))
            }
        }
    }
    Ok(TensorToken { name, up, down })
}

/// Parse a whitespace-separated product of tokens.
pub fn parse_expression(expr: &str) -> GeometryResult<Vec<TensorToken>> {
    let tokens = expr
        .split_whitespace()
        .map(parse_token)
        .collect::<GeometryResult<Vec<_>>>()?;
    if tokens.is_empty() {
        return Err(GeometryError::parse(expr, "empty expression"));
    }
    Ok(tokens)
}

/// One slot per axis: upper labels first, then lower ones.
pub fn expand_slots(
    rank: usize,
    up: &[Option<String>],
    down: &[Option<String>],
) -> GeometryResult<Vec<Slot>> {
    if up.len() + down.len() != rank {
        return Err(GeometryError::RankMismatch(format!(
            "{} indices given for a rank-{rank} tensor",
            up.len() + down.len()
        )));
    }
    let slot = |entry: &Option<String>, variance| {
        let index = entry.as_deref().map_or_else(Index::empty, Index::new);
        Slot::new(index, Some(variance))
    };
    Ok(up
        .iter()
        .map(|e| slot(e, Variance::Up))
        .chain(down.iter().map(|e| slot(e, Variance::Down)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|n| Some(n.to_string())).collect()
    }

    #[test]
    fn test_braced_blocks() {
        let tok = parse_token("R^{a}_{b,c,d}").unwrap();
        assert_eq!(tok.name, "R");
        assert_eq!(tok.up, some(&["a"]));
        assert_eq!(tok.down, some(&["b", "c", "d"]));

        let tok = parse_token("T^{mu nu}").unwrap();
        assert_eq!(tok.up, some(&["mu", "nu"]));
        assert!(tok.down.is_empty());
    }

    #[test]
    fn test_single_character_blocks() {
        let tok = parse_token("A^a_b").unwrap();
        assert_eq!(tok.up, some(&["a"]));
        assert_eq!(tok.down, some(&["b"]));
    }

    #[test]
    fn test_unlabelled_entries() {
        let tok = parse_token("T^{a,_}_{.,empty}").unwrap();
        assert_eq!(tok.up, vec![Some("a".to_string()), None]);
        assert_eq!(tok.down, vec![None, None]);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(parse_token("^{a}").is_err());
        assert!(parse_token("T^{a").is_err());
        assert!(parse_token("T^").is_err());
        assert!(parse_token("T*a").is_err());
        assert!(parse_expression("   ").is_err());
    }

    #[test]
    fn test_expand_slots() {
        let slots = expand_slots(3, &some(&["a"]), &[None, Some("c".into())]).unwrap();
        assert_eq!(slots[0].variance(), Some(Variance::Up));
        assert_eq!(slots[1].variance(), Some(Variance::Down));
        assert!(slots[1].index().is_unlabeled());
        assert_eq!(slots[2].index().name(), Some("c"));
        assert!(expand_slots(2, &some(&["a"]), &[]).is_err());
    }
}
