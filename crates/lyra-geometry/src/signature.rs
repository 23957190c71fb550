//! Axis variance and signature normalization.
//!
//! Callers may spell a variance in several ways (`Variance::Up`, `"u"`,
//! `"^"`, `"up"`, `'d'`, `true`, `-1`, ...). Everything is folded into the
//! closed [`Variance`] enum once, at the API boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};

/// Placement of a single tensor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variance {
    /// Contravariant (upper) index
    Up,
    /// Covariant (lower) index
    Down,
}

pub use Variance::{Down as D, Up as U};

impl Variance {
    pub fn flip(self) -> Self {
        match self {
            Variance::Up => Variance::Down,
            Variance::Down => Variance::Up,
        }
    }

    pub fn is_up(self) -> bool {
        self == Variance::Up
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variance::Up => write!(f, "^"),
            Variance::Down => write!(f, "_"),
        }
    }
}

/// One variance per axis.
pub type Signature = Vec<Variance>;

/// Render a signature as `^__`.
pub fn signature_string(signature: &[Variance]) -> String {
    signature.iter().map(Variance::to_string).collect()
}

/// Anything that can be read as a single [`Variance`].
///
/// The error carries a printable form of the rejected value.
pub trait IntoVariance {
    fn into_variance(self) -> Result<Variance, String>;
}

impl IntoVariance for Variance {
    fn into_variance(self) -> Result<Variance, String> {
        Ok(self)
    }
}

impl IntoVariance for &Variance {
    fn into_variance(self) -> Result<Variance, String> {
        Ok(*self)
    }
}

impl IntoVariance for &str {
    fn into_variance(self) -> Result<Variance, String> {
        match self.trim().to_ascii_lowercase().as_str() {
            "u" | "up" | "^" | "+" | "+1" | "1" | "contravariant" => Ok(Variance::Up),
            "d" | "down" | "_" | "-" | "-1" | "covariant" => Ok(Variance::Down),
            _ => Err(format!("{self:?}")),
        }
    }
}

impl IntoVariance for &String {
    fn into_variance(self) -> Result<Variance, String> {
        self.as_str().into_variance()
    }
}

impl IntoVariance for String {
    fn into_variance(self) -> Result<Variance, String> {
        self.as_str().into_variance()
    }
}

impl IntoVariance for char {
    fn into_variance(self) -> Result<Variance, String> {
        match self {
            'u' | 'U' | '^' | '+' => Ok(Variance::Up),
            'd' | 'D' | '_' | '-' => Ok(Variance::Down),
            other => Err(format!("{other:?}")),
        }
    }
}

impl IntoVariance for bool {
    fn into_variance(self) -> Result<Variance, String> {
        Ok(if self { Variance::Up } else { Variance::Down })
    }
}

impl IntoVariance for i64 {
    fn into_variance(self) -> Result<Variance, String> {
        match self {
            1 => Ok(Variance::Up),
            -1 => Ok(Variance::Down),
            other => Err(other.to_string()),
        }
    }
}

impl IntoVariance for i32 {
    fn into_variance(self) -> Result<Variance, String> {
        i64::from(self).into_variance()
    }
}

/// Normalize raw variance values into a [`Signature`] of length `rank`.
///
/// Fails with [`GeometryError::InvalidSignature`] when an element is not
/// recognized or the length differs from `rank`.
pub fn normalize_signature<I>(raw: I, rank: usize) -> GeometryResult<Signature>
where
    I: IntoIterator,
    I::Item: IntoVariance,
{
    let signature = collect_variances(raw)?;
    if signature.len() != rank {
        return Err(GeometryError::InvalidSignature(format!(
            "signature has {} entries but rank is {rank}",
            signature.len()
        )));
    }
    Ok(signature)
}

fn collect_variances<I>(raw: I) -> GeometryResult<Signature>
where
    I: IntoIterator,
    I::Item: IntoVariance,
{
    raw.into_iter()
        .map(|v| {
            v.into_variance().map_err(|bad| {
                GeometryError::InvalidSignature(format!("unrecognized variance {bad}"))
            })
        })
        .collect()
}

/// Signature arguments accepted by tensor factories.
///
/// `rank` is checked when known; otherwise the length defines the rank.
pub trait SignatureSpec {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature>;
}

fn check_rank(signature: Signature, rank: Option<usize>) -> GeometryResult<Signature> {
    match rank {
        Some(rank) if rank != signature.len() => Err(GeometryError::InvalidSignature(format!(
            "signature has {} entries but rank is {rank}",
            signature.len()
        ))),
        _ => Ok(signature),
    }
}

impl<T: IntoVariance + Clone> SignatureSpec for &[T] {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature> {
        check_rank(collect_variances(self.iter().cloned())?, rank)
    }
}

impl<T: IntoVariance + Clone> SignatureSpec for &Vec<T> {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature> {
        self.as_slice().to_signature(rank)
    }
}

impl<T: IntoVariance> SignatureSpec for Vec<T> {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature> {
        check_rank(collect_variances(self)?, rank)
    }
}

impl<T: IntoVariance, const N: usize> SignatureSpec for [T; N] {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature> {
        check_rank(collect_variances(self)?, rank)
    }
}

/// `"udd"`, `"^__"` (one char per axis) or `"up down down"` / `"u,d,d"`.
///
/// A single word such as `"up"` or `"covariant"` is read as a whole before
/// falling back to one variance per character.
impl SignatureSpec for &str {
    fn to_signature(self, rank: Option<usize>) -> GeometryResult<Signature> {
        let tokenized = self.contains(|c: char| c.is_whitespace() || c == ',');
        let signature = if tokenized {
            collect_variances(
                self.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|tok| !tok.is_empty()),
            )?
        } else if let Ok(whole) = self.into_variance() {
            vec![whole]
        } else {
            collect_variances(self.chars())?
        };
        check_rank(signature, rank)
    }
}
