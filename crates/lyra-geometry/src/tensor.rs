//! Tensors bound to a space.
//!
//! A [`Tensor`] stores its components in one *native* signature. Other
//! placements are produced on demand by contracting axes with the metric
//! or its inverse and are memoised in a cache that every re-signatured view
//! of the same geometric object shares.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index as IndexOp;
use std::rc::Rc;

use lyra_symbolic::{Expr, SymArray};
use tracing::trace;

use crate::contraction::contract_factors;
use crate::error::{GeometryError, GeometryResult};
use crate::index::{IndexedTensor, Label, Slot};
use crate::signature::{signature_string, Signature, SignatureSpec, Variance};
use crate::space::SpaceContext;

/// What a tensor may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorKind {
    /// Ordinary tensor; any signature is reachable through the metric
    Plain,
    /// Connection coefficients; index placement is fixed
    Connection,
    /// Fixed-placement symbol such as the Kronecker delta
    Symbol,
}

impl TensorKind {
    pub fn is_fixed(self) -> bool {
        !matches!(self, TensorKind::Plain)
    }
}

#[derive(Debug, Default)]
struct SignatureCache {
    generation: u64,
    entries: HashMap<Signature, SymArray>,
}

/// Components, signature and owning space.
#[derive(Clone)]
pub struct Tensor {
    name: String,
    label: String,
    kind: TensorKind,
    signature: Signature,
    components: SymArray,
    space: Rc<SpaceContext>,
    cache: Rc<RefCell<SignatureCache>>,
}

/// Contract `operator`'s second axis with `axis` of `array`, keeping axis order.
fn transform_axis(operator: &SymArray, array: &SymArray, axis: usize) -> GeometryResult<SymArray> {
    let contracted = operator
        .tensor_product(array)
        .contract(&[(1, axis + 2)])?;
    let perm: Vec<usize> = (0..array.rank())
        .map(|i| match i.cmp(&axis) {
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Less => i + 1,
            std::cmp::Ordering::Greater => i,
        })
        .collect();
    Ok(contracted.permute(&perm)?)
}

impl Tensor {
    pub(crate) fn from_parts(
        space: Rc<SpaceContext>,
        components: SymArray,
        signature: Signature,
        kind: TensorKind,
        name: String,
    ) -> Self {
        let mut entries = HashMap::new();
        entries.insert(signature.clone(), components.clone());
        let cache = SignatureCache {
            generation: space.generation(),
            entries,
        };
        Tensor {
            label: name.clone(),
            name,
            kind,
            signature,
            components,
            space,
            cache: Rc::new(RefCell::new(cache)),
        }
    }

    /// Plain tensor with an automatic name.
    pub(crate) fn derived(space: &Rc<SpaceContext>, components: SymArray, signature: Signature) -> Self {
        let name = space.next_tensor_name();
        Tensor::from_parts(Rc::clone(space), components, signature, TensorKind::Plain, name)
    }

    /// Unnamed plain tensor used for intermediate conversions.
    pub(crate) fn transient(space: &Rc<SpaceContext>, components: SymArray, signature: Signature) -> Self {
        Tensor::from_parts(
            Rc::clone(space),
            components,
            signature,
            TensorKind::Plain,
            String::new(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn kind(&self) -> TensorKind {
        self.kind
    }

    pub fn is_connection(&self) -> bool {
        self.kind == TensorKind::Connection
    }

    pub fn signature(&self) -> &[Variance] {
        &self.signature
    }

    /// Components in the native signature.
    pub fn components(&self) -> &SymArray {
        &self.components
    }

    pub fn rank(&self) -> usize {
        self.signature.len()
    }

    pub fn dim(&self) -> usize {
        self.space.dim()
    }

    pub fn get(&self, idx: &[usize]) -> Option<&Expr> {
        self.components.get(idx)
    }

    pub(crate) fn belongs_to(&self, space: &Rc<SpaceContext>) -> bool {
        Rc::ptr_eq(&self.space, space)
    }

    pub fn same_space(&self, other: &Tensor) -> bool {
        Rc::ptr_eq(&self.space, &other.space)
    }

    /// The scalar held by a rank-0 tensor.
    pub fn expr(&self) -> GeometryResult<Expr> {
        self.components.as_scalar().cloned().ok_or_else(|| {
            GeometryError::RankMismatch(format!(
                "tensor '{}' has rank {}; only rank-0 tensors convert to a scalar",
                self.name,
                self.rank()
            ))
        })
    }

    /// Components in the requested signature.
    ///
    /// Each axis whose variance differs is raised with the inverse metric or
    /// lowered with the metric. Results are memoised per signature.
    pub fn as_signature(&self, target: impl SignatureSpec) -> GeometryResult<SymArray> {
        let target = target.to_signature(Some(self.rank()))?;
        self.convert(&target)
    }

    pub(crate) fn convert(&self, target: &[Variance]) -> GeometryResult<SymArray> {
        if target == self.signature.as_slice() {
            return Ok(self.components.clone());
        }
        if self.kind.is_fixed() {
            return Err(GeometryError::ImmutableConnection {
                name: self.name.clone(),
            });
        }
        if target.len() != self.rank() {
            return Err(GeometryError::InvalidSignature(format!(
                "signature has {} entries but rank is {}",
                target.len(),
                self.rank()
            )));
        }

        {
            let mut cache = self.cache.borrow_mut();
            let generation = self.space.generation();
            if cache.generation != generation {
                cache.entries.clear();
                cache.generation = generation;
            }
            if let Some(hit) = cache.entries.get(target) {
                trace!(tensor = %self.name, target = %signature_string(target), "signature cache hit");
                return Ok(hit.clone());
            }
        }

        trace!(tensor = %self.name, target = %signature_string(target), "converting signature");
        let mut current = self.components.clone();
        for (axis, (&from, &to)) in self.signature.iter().zip(target).enumerate() {
            if from == to {
                continue;
            }
            let operator = match to {
                Variance::Up => self
                    .space
                    .metric_inv()?
                    .ok_or_else(|| GeometryError::missing_metric("raising an index"))?,
                Variance::Down => self
                    .space
                    .metric()
                    .ok_or_else(|| GeometryError::missing_metric("lowering an index"))?,
            };
            current = transform_axis(&operator, &current, axis)?;
        }
        let current = current.simplify()?;

        self.cache
            .borrow_mut()
            .entries
            .insert(target.to_vec(), current.clone());
        Ok(current)
    }

    /// The same object exposed with `target` as its native signature.
    ///
    /// The returned tensor shares this tensor's cache.
    pub fn with_signature(&self, target: impl SignatureSpec) -> GeometryResult<Tensor> {
        let target = target.to_signature(Some(self.rank()))?;
        let components = self.convert(&target)?;
        Ok(Tensor {
            name: self.name.clone(),
            label: self.label.clone(),
            kind: self.kind,
            signature: target,
            components,
            space: Rc::clone(&self.space),
            cache: Rc::clone(&self.cache),
        })
    }

    /// Bind labels to axes without contracting repeated ones.
    pub(crate) fn label_slots(&self, slots: Vec<Slot>) -> GeometryResult<IndexedTensor> {
        if slots.len() != self.rank() {
            return Err(GeometryError::RankMismatch(format!(
                "tensor '{}' has rank {} but {} indices were given",
                self.name,
                self.rank(),
                slots.len()
            )));
        }
        let mut labels = Vec::with_capacity(slots.len());
        let mut target = Vec::with_capacity(slots.len());
        for (slot, &native) in slots.iter().zip(&self.signature) {
            labels.push(match slot.index().name() {
                Some(name) => Label::Named(name.into()),
                None => Label::Anonymous(self.space.next_label()),
            });
            target.push(slot.variance().unwrap_or(native));
        }
        let components = if self.kind.is_fixed() {
            self.components.clone()
        } else {
            self.convert(&target)?
        };
        Ok(IndexedTensor::from_parts(
            components,
            target,
            labels,
            Rc::clone(&self.space),
        ))
    }

    /// Label every axis; repeated labels are summed immediately.
    ///
    /// Plain tensors are converted to the requested variances. Connections
    /// and symbols only record them.
    pub fn idx<I>(&self, slots: I) -> GeometryResult<IndexedTensor>
    where
        I: IntoIterator,
        I::Item: Into<Slot>,
    {
        let labeled = self.label_slots(slots.into_iter().map(Into::into).collect())?;
        contract_factors(&self.space, vec![labeled], Expr::one())
    }

    /// Every axis labelled with a fresh anonymous index.
    pub fn bare(&self) -> GeometryResult<IndexedTensor> {
        self.label_slots(vec![Slot::unlabeled(None); self.rank()])
    }

    /// Sum over axes `pos1` and `pos2`.
    ///
    /// Opposite variances contract directly. Equal variances are rejected
    /// unless `use_metric` is set, in which case `pos2` is flipped first.
    pub fn contract(&self, pos1: usize, pos2: usize, use_metric: bool) -> GeometryResult<Tensor> {
        let rank = self.rank();
        if pos1 >= rank || pos2 >= rank || pos1 == pos2 {
            return Err(GeometryError::RankMismatch(format!(
                "cannot contract axes {pos1} and {pos2} of a rank-{rank} tensor"
            )));
        }
        let components = if self.signature[pos1] == self.signature[pos2] {
            if !use_metric {
                return Err(GeometryError::RepeatedVariance {
                    label: format!("axes {pos1} and {pos2} of '{}'", self.name),
                    variance: self.signature[pos1],
                });
            }
            let mut target = self.signature.clone();
            target[pos2] = target[pos2].flip();
            self.convert(&target)?
        } else {
            self.components.clone()
        };
        let contracted = components.contract(&[(pos1, pos2)])?;
        let signature = self
            .signature
            .iter()
            .enumerate()
            .filter(|&(ax, _)| ax != pos1 && ax != pos2)
            .map(|(_, &v)| v)
            .collect();
        Ok(Tensor::derived(&self.space, contracted, signature))
    }

    /// Multiply every component; the result is always a plain tensor.
    pub fn scale(&self, factor: impl Into<Expr>) -> Tensor {
        let factor = factor.into();
        Tensor::derived(
            &self.space,
            self.components.scale(&factor),
            self.signature.clone(),
        )
    }

    /// Copy with every component simplified.
    pub fn simplify(&self) -> GeometryResult<Tensor> {
        Ok(Tensor::from_parts(
            Rc::clone(&self.space),
            self.components.simplify()?,
            self.signature.clone(),
            self.kind,
            self.name.clone(),
        )
        .with_label(self.label.clone()))
    }
}

impl<const N: usize> IndexOp<[usize; N]> for Tensor {
    type Output = Expr;

    fn index(&self, idx: [usize; N]) -> &Expr {
        &self.components[idx]
    }
}

impl IndexOp<&[usize]> for Tensor {
    type Output = Expr;

    fn index(&self, idx: &[usize]) -> &Expr {
        &self.components[idx]
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("signature", &signature_string(&self.signature))
            .field("components", &self.components)
            .finish()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) = {}",
            self.name,
            signature_string(&self.signature),
            self.components
        )
    }
}

#[cfg(test)]
mod tests {
    use lyra_symbolic::{on_engine_thread, Expr, SymArray, Symbol};

    use crate::signature::{D, U};
    use crate::space::TensorSpace;

    fn polar() -> TensorSpace {
        let r = Symbol::new("r");
        let theta = Symbol::new("theta");
        let metric = SymArray::diagonal(vec![Expr::one(), r.expr().powi(2)]);
        TensorSpace::builder(vec![r, theta]).metric(metric).build().unwrap()
    }

    #[test]
    fn test_raise_then_lower_is_identity() {
        on_engine_thread(|| {
            let space = polar();
            let v = space
                .from_array(
                    SymArray::from_shape_vec(&[2], vec![Expr::sym("a"), Expr::sym("b")]).unwrap(),
                    [D],
                    None,
                )
                .unwrap();
            let up = v.with_signature([U]).unwrap();
            let expected = Expr::sym("b") / Expr::sym("r").powi(2);
            assert!((up[[1]].clone() - expected).is_identically_zero().unwrap());
            let back = up.as_signature([D]).unwrap();
            assert_eq!(back, v.components().clone());
        });
    }

    #[test]
    fn test_cache_hits_are_identical() {
        on_engine_thread(|| {
            let space = polar();
            let t = space.generic("T", [D, D]).unwrap();
            let first = t.as_signature([U, D]).unwrap();
            let second = t.as_signature("ud").unwrap();
            assert_eq!(first, second);
            let view = t.with_signature([U, U]).unwrap();
            assert_eq!(view.as_signature([D, D]).unwrap(), t.components().clone());
        });
    }

    #[test]
    fn test_contract_by_position() {
        on_engine_thread(|| {
            let space = polar();
            let t = space.generic("T", [U, D]).unwrap();
            let trace = t.contract(0, 1, false).unwrap();
            assert_eq!(trace.rank(), 0);
            assert_eq!(trace.expr().unwrap(), t[[0, 0]].clone() + t[[1, 1]].clone());

            let s = space.generic("S", [D, D]).unwrap();
            assert!(s.contract(0, 1, false).is_err());
            assert!(s.contract(0, 0, true).is_err());
            let traced = s.contract(0, 1, true).unwrap().expr().unwrap();
            let expected = s[[0, 0]].clone() + s[[1, 1]].clone() / Expr::sym("r").powi(2);
            assert!((traced - expected).is_identically_zero().unwrap());
        });
    }

    #[test]
    fn test_expr_requires_rank_zero() {
        on_engine_thread(|| {
            let space = polar();
            let scalar = space.scalar(Expr::sym("r"), None);
            assert_eq!(scalar.expr().unwrap(), Expr::sym("r"));
            assert!(space.delta().expr().is_err());
        });
    }

    #[test]
    fn test_scaling_yields_plain_tensor() {
        on_engine_thread(|| {
            let space = polar();
            let gamma = space.connection().unwrap().clone();
            let scaled = gamma.scale(2);
            assert!(!scaled.is_connection());
            assert_eq!(scaled[[0, 1, 1]], gamma[[0, 1, 1]].clone() * 2);
        });
    }
}
