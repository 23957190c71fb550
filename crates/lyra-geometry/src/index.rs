//! Index labels and labelled tensors.
//!
//! An [`Index`] is a name. A [`Slot`] pairs an index with an optional
//! variance request: `a.up()`, `a.down()` (or `-&a`), or bare `&a`, which
//! inherits the tensor's own variance. Labelling a tensor yields an
//! [`IndexedTensor`] whose axes are matched by label, never by position.

use std::fmt;
use std::ops::Neg;
use std::rc::Rc;

use lyra_symbolic::{Expr, SymArray};

use crate::contraction::{contract_factors, Operand};
use crate::error::{GeometryError, GeometryResult};
use crate::signature::{signature_string, Signature, Variance};
use crate::space::SpaceContext;
use crate::tensor::Tensor;

/// A named index, or the empty index that always receives a fresh label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    name: Option<Rc<str>>,
}

impl Index {
    pub fn new(name: impl AsRef<str>) -> Self {
        Index {
            name: Some(Rc::from(name.as_ref())),
        }
    }

    pub fn empty() -> Self {
        Index { name: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_unlabeled(&self) -> bool {
        self.name.is_none()
    }

    pub fn up(&self) -> Slot {
        Slot::new(self.clone(), Some(Variance::Up))
    }

    pub fn down(&self) -> Slot {
        Slot::new(self.clone(), Some(Variance::Down))
    }

    pub fn bare(&self) -> Slot {
        Slot::new(self.clone(), None)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().unwrap_or("_"))
    }
}

impl Neg for &Index {
    type Output = Slot;

    fn neg(self) -> Slot {
        self.down()
    }
}

impl Neg for Index {
    type Output = Slot;

    fn neg(self) -> Slot {
        Slot::new(self, Some(Variance::Down))
    }
}

/// One axis position in an indexing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    index: Index,
    variance: Option<Variance>,
}

impl Slot {
    pub fn new(index: Index, variance: Option<Variance>) -> Self {
        Slot { index, variance }
    }

    /// Slot that receives a fresh anonymous label.
    pub fn unlabeled(variance: Option<Variance>) -> Self {
        Slot::new(Index::empty(), variance)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Requested variance; `None` inherits the tensor's.
    pub fn variance(&self) -> Option<Variance> {
        self.variance
    }
}

impl From<Index> for Slot {
    fn from(index: Index) -> Self {
        Slot::new(index, None)
    }
}

impl From<&Index> for Slot {
    fn from(index: &Index) -> Self {
        index.bare()
    }
}

/// Label carried by an axis of an [`IndexedTensor`].
///
/// Anonymous labels come from the space's counter and never equal a named
/// label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Named(Rc<str>),
    Anonymous(usize),
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Named(name) => Some(name),
            Label::Anonymous(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Named(name) => write!(f, "{name}"),
            Label::Anonymous(n) => write!(f, "_{n}"),
        }
    }
}

/// Components whose axes carry labels and variances.
#[derive(Clone)]
pub struct IndexedTensor {
    pub(crate) components: SymArray,
    pub(crate) signature: Signature,
    pub(crate) labels: Vec<Label>,
    pub(crate) space: Rc<SpaceContext>,
}

impl IndexedTensor {
    pub(crate) fn from_parts(
        components: SymArray,
        signature: Signature,
        labels: Vec<Label>,
        space: Rc<SpaceContext>,
    ) -> Self {
        IndexedTensor {
            components,
            signature,
            labels,
            space,
        }
    }

    pub fn components(&self) -> &SymArray {
        &self.components
    }

    pub fn signature(&self) -> &[Variance] {
        &self.signature
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn rank(&self) -> usize {
        self.signature.len()
    }

    pub(crate) fn belongs_to(&self, space: &Rc<SpaceContext>) -> bool {
        Rc::ptr_eq(&self.space, space)
    }

    /// The scalar held by a fully contracted result.
    pub fn expr(&self) -> GeometryResult<Expr> {
        self.components.as_scalar().cloned().ok_or_else(|| {
            GeometryError::RankMismatch(format!(
                "indexed tensor has free indices {}; only rank-0 results convert to a scalar",
                self.label_string()
            ))
        })
    }

    /// Plain, automatically named tensor with the same components.
    pub fn to_tensor(&self) -> Tensor {
        Tensor::derived(&self.space, self.components.clone(), self.signature.clone())
    }

    pub fn into_tensor(self) -> Tensor {
        Tensor::derived(&self.space, self.components, self.signature)
    }

    /// Einstein product with another operand.
    pub fn times(&self, other: impl Into<Operand>) -> GeometryResult<IndexedTensor> {
        let operands = [Operand::Indexed(self.clone()), other.into()];
        crate::contraction::contract_operands(&self.space, &operands)
    }

    pub fn scale(&self, factor: impl Into<Expr>) -> IndexedTensor {
        let factor = factor.into();
        IndexedTensor {
            components: self.components.scale(&factor),
            ..self.clone()
        }
    }

    /// Components of `other` with axes rearranged to match this tensor's labels.
    fn aligned(&self, other: &IndexedTensor) -> GeometryResult<SymArray> {
        if !other.belongs_to(&self.space) {
            return Err(GeometryError::ForeignSpace {
                name: other.label_string(),
            });
        }
        if self.rank() != other.rank() {
            return Err(GeometryError::LabelMismatch(format!(
                "cannot combine {} with {}",
                self.label_string(),
                other.label_string()
            )));
        }
        let perm = self
            .labels
            .iter()
            .map(|label| {
                other.labels.iter().position(|l| l == label).ok_or_else(|| {
                    GeometryError::LabelMismatch(format!(
                        "index {label} of {} is missing from {}",
                        self.label_string(),
                        other.label_string()
                    ))
                })
            })
            .collect::<GeometryResult<Vec<_>>>()?;
        let components = other.components.permute(&perm)?;
        let signature: Signature = perm.iter().map(|&p| other.signature[p]).collect();
        if signature == self.signature {
            return Ok(components);
        }
        Tensor::transient(&self.space, components, signature).convert(&self.signature)
    }

    /// Sum with `other`, matching axes by label.
    pub fn plus(&self, other: &IndexedTensor) -> GeometryResult<IndexedTensor> {
        let rhs = self.aligned(other)?;
        Ok(IndexedTensor {
            components: self.components.add(&rhs)?,
            ..self.clone()
        })
    }

    /// Difference with `other`, matching axes by label.
    pub fn minus(&self, other: &IndexedTensor) -> GeometryResult<IndexedTensor> {
        let rhs = self.aligned(other)?;
        Ok(IndexedTensor {
            components: self.components.sub(&rhs)?,
            ..self.clone()
        })
    }

    /// Relabel the result as if it were a tensor in its own right.
    pub fn idx<I>(&self, slots: I) -> GeometryResult<IndexedTensor>
    where
        I: IntoIterator,
        I::Item: Into<Slot>,
    {
        Tensor::transient(&self.space, self.components.clone(), self.signature.clone()).idx(slots)
    }

    /// Tensor whose axes follow the order of `slots`.
    ///
    /// Every slot must name one of the free labels. A slot that requests a
    /// variance converts that axis through the metric.
    pub fn reorder<I>(&self, slots: I) -> GeometryResult<Tensor>
    where
        I: IntoIterator,
        I::Item: Into<Slot>,
    {
        let slots: Vec<Slot> = slots.into_iter().map(Into::into).collect();
        if slots.len() != self.rank() {
            return Err(GeometryError::RankMismatch(format!(
                "reorder of {} needs {} indices, got {}",
                self.label_string(),
                self.rank(),
                slots.len()
            )));
        }
        let mut perm = Vec::with_capacity(slots.len());
        for slot in &slots {
            let name = slot.index().name().ok_or_else(|| {
                GeometryError::LabelMismatch("reorder needs named indices".to_string())
            })?;
            let pos = self
                .labels
                .iter()
                .position(|l| l.name() == Some(name))
                .ok_or_else(|| {
                    GeometryError::LabelMismatch(format!(
                        "index {name} is not free in {}",
                        self.label_string()
                    ))
                })?;
            if perm.contains(&pos) {
                return Err(GeometryError::LabelMismatch(format!(
                    "index {name} requested twice"
                )));
            }
            perm.push(pos);
        }
        let components = self.components.permute(&perm)?;
        let signature: Signature = perm.iter().map(|&p| self.signature[p]).collect();
        let target: Signature = slots
            .iter()
            .zip(&signature)
            .map(|(slot, &native)| slot.variance().unwrap_or(native))
            .collect();
        let components = if target == signature {
            components
        } else {
            Tensor::transient(&self.space, components, signature).convert(&target)?
        };
        Ok(Tensor::derived(&self.space, components, target))
    }

    /// Append an axis of partial derivatives labelled by `slot`.
    ///
    /// The new axis is covariant unless the slot asks for `Up`. When the
    /// label already occurs it is summed like any repeated index.
    pub fn partial(&self, slot: impl Into<Slot>) -> GeometryResult<IndexedTensor> {
        let slot = slot.into();
        let name = slot.index().name().ok_or_else(|| {
            GeometryError::LabelMismatch("partial derivative needs a named index".to_string())
        })?;
        let rank = self.rank();
        let derivatives: Vec<SymArray> = self
            .space
            .coords()
            .iter()
            .map(|x| self.components.diff(x))
            .collect();
        let mut shape = self.components.shape().to_vec();
        shape.push(self.space.dim());
        let components = SymArray::from_fn(&shape, |idx| derivatives[idx[rank]][&idx[..rank]].clone());

        let mut signature = self.signature.clone();
        signature.push(Variance::Down);
        let components = match slot.variance() {
            Some(Variance::Up) => {
                let mut target = signature.clone();
                target[rank] = Variance::Up;
                let raised =
                    Tensor::transient(&self.space, components, signature).convert(&target)?;
                signature = target;
                raised
            }
            _ => components,
        };
        let mut labels = self.labels.clone();
        labels.push(Label::Named(name.into()));
        let labeled = IndexedTensor::from_parts(components, signature, labels, Rc::clone(&self.space));
        contract_factors(&self.space, vec![labeled], Expr::one())
    }

    pub fn simplify(&self) -> GeometryResult<IndexedTensor> {
        Ok(IndexedTensor {
            components: self.components.simplify()?,
            ..self.clone()
        })
    }

    fn label_string(&self) -> String {
        self.labels
            .iter()
            .zip(&self.signature)
            .map(|(l, v)| format!("{v}{l}"))
            .collect::<Vec<_>>()
            .join("")
    }
}

impl fmt::Debug for IndexedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedTensor")
            .field("labels", &self.labels)
            .field("signature", &signature_string(&self.signature))
            .field("components", &self.components)
            .finish()
    }
}
