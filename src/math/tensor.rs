use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dense N-dimensional tensor of `f64`, stored row-major.
///
/// A rank-0 tensor (shape `[]`) holds exactly one element. The shape and
/// element count are checked on every construction path, JSON included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorRepr")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct TensorRepr {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<TensorRepr> for Tensor {
    type Error = Error;

    fn try_from(repr: TensorRepr) -> Result<Tensor> {
        Tensor::new(repr.shape, repr.data)
    }
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Tensor> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Tensor { shape, data })
    }

    pub fn zeros(shape: &[usize]) -> Result<Tensor> {
        Ok(Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; element_count(shape)?],
        })
    }

    pub fn scalar(value: f64) -> Tensor {
        Tensor { shape: vec![], data: vec![value] }
    }

    /// Uniform samples in `[0, 1)`.
    pub fn random(shape: &[usize]) -> Result<Tensor> {
        let mut rng = rand::thread_rng();
        let len = element_count(shape)?;
        Ok(Tensor {
            shape: shape.to_vec(),
            data: (0..len).map(|_| rng.gen::<f64>()).collect(),
        })
    }

    /// Builds a rank-2 tensor from equally long rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Tensor> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(Error::RaggedRows { row, expected: cols, got: values.len() });
            }
            data.extend_from_slice(values);
        }
        Ok(Tensor { shape: vec![rows.len(), cols], data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Element at a full multi-index, or `None` if the index is out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.rank() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &dim), stride) in index.iter().zip(&self.shape).zip(strides(&self.shape)) {
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        self.data.get(offset).copied()
    }

    /// Reorders axes so that axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Tensor> {
        let rank = self.rank();
        let mut seen = vec![false; rank];
        let valid = perm.len() == rank
            && perm.iter().all(|&p| p < rank && !std::mem::replace(&mut seen[p], true));
        if !valid {
            return Err(Error::InvalidPermutation { perm: perm.to_vec(), rank });
        }

        let src_strides = strides(&self.shape);
        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let mut data = Vec::with_capacity(self.data.len());
        let mut idx = vec![0usize; rank];
        for _ in 0..self.data.len() {
            let offset: usize = idx.iter().zip(perm).map(|(&i, &p)| i * src_strides[p]).sum();
            data.push(self.data[offset]);
            for axis in (0..rank).rev() {
                idx[axis] += 1;
                if idx[axis] < shape[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }
        Ok(Tensor { shape, data })
    }

    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Tensor> {
        let rank = self.rank();
        for axis in [a, b] {
            check_axis(axis, rank)?;
        }
        let mut perm: Vec<usize> = (0..rank).collect();
        perm.swap(a, b);
        self.permute(&perm)
    }

    /// Moves `axis` to the end; the other axes keep their relative order.
    pub fn move_axis_to_last(&self, axis: usize) -> Result<Tensor> {
        let rank = self.rank();
        check_axis(axis, rank)?;
        let perm: Vec<usize> = (0..rank).filter(|&a| a != axis).chain([axis]).collect();
        self.permute(&perm)
    }

    /// Inverse of [`Tensor::move_axis_to_last`].
    pub fn move_last_axis_to(&self, axis: usize) -> Result<Tensor> {
        let rank = self.rank();
        check_axis(axis, rank)?;
        let mut perm: Vec<usize> = (0..rank - 1).collect();
        perm.insert(axis, rank - 1);
        self.permute(&perm)
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor> {
        if element_count(shape)? != self.len() {
            return Err(Error::ReshapeElementMismatch { src: self.len(), dst: shape.to_vec() });
        }
        Ok(Tensor { shape: shape.to_vec(), data: self.data.clone() })
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Elementwise combination of two tensors of identical shape.
    pub fn zip_map<F>(&self, other: &Tensor, functor: F) -> Result<Tensor>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape != other.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: other.shape.clone(),
            });
        }
        Ok(Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| functor(a, b)).collect(),
        })
    }

    /// Clamps every element into `[lo, hi]`. NaN stays NaN.
    pub fn clip(&self, lo: f64, hi: f64) -> Tensor {
        self.map(|x| if x < lo { lo } else if x > hi { hi } else { x })
    }

    pub fn ln(&self) -> Tensor {
        self.map(f64::ln)
    }

    /// Sums over `axis`, removing it from the shape.
    pub fn sum_axis(&self, axis: usize) -> Result<Tensor> {
        check_axis(axis, self.rank())?;
        let outer = element_count(&self.shape[..axis])?;
        let n = self.shape[axis];
        let inner = element_count(&self.shape[axis + 1..])?;
        let out_len = outer
            .checked_mul(inner)
            .ok_or_else(|| Error::ShapeOverflow { shape: self.shape.clone() })?;

        let mut data = vec![0.0; out_len];
        for o in 0..outer {
            for k in 0..n {
                let src = &self.data[(o * n + k) * inner..(o * n + k + 1) * inner];
                for (acc, &x) in data[o * inner..(o + 1) * inner].iter_mut().zip(src) {
                    *acc += x;
                }
            }
        }
        let mut shape = self.shape.clone();
        shape.remove(axis);
        Ok(Tensor { shape, data })
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Mean over all elements; NaN for an empty tensor.
    pub fn mean(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    /// Softmax along `axis`, shifted by the per-slice maximum.
    pub fn softmax(&self, axis: usize) -> Result<Tensor> {
        let moved = self.move_axis_to_last(axis)?;
        let classes = self.shape[axis];
        let mut data = moved.data;
        if classes > 0 {
            for row in data.chunks_mut(classes) {
                let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mut total = 0.0;
                for x in row.iter_mut() {
                    *x = (*x - max).exp();
                    total += *x;
                }
                for x in row.iter_mut() {
                    *x /= total;
                }
            }
        }
        Tensor { shape: moved.shape, data }.move_last_axis_to(axis)
    }
}

fn check_axis(axis: usize, rank: usize) -> Result<()> {
    if axis >= rank {
        return Err(Error::AxisOutOfRange { axis, rank });
    }
    Ok(())
}

/// Number of elements a shape describes, or `ShapeOverflow` if that does not fit a `usize`.
pub fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| Error::ShapeOverflow { shape: shape.to_vec() })
}

// Saturates: a stride can only overflow right of a zero-length axis, where it
// is never reached.
fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(shape[i + 1]);
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arange(shape: &[usize]) -> Tensor {
        let len = shape.iter().product::<usize>();
        Tensor::new(shape.to_vec(), (0..len).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn new_rejects_wrong_element_count() {
        let err = Tensor::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert_eq!(err, Error::ElementCountMismatch { shape: vec![2, 3], expected: 6, got: 5 });
    }

    #[test]
    fn scalar_has_rank_zero_and_one_element() {
        let t = Tensor::scalar(4.0);
        assert_eq!(t.rank(), 0);
        assert_eq!(t.get(&[]), Some(4.0));
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Tensor::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err, Error::RaggedRows { row: 1, expected: 2, got: 1 });
    }

    #[test]
    fn get_checks_bounds() {
        let t = arange(&[2, 3]);
        assert_eq!(t.get(&[1, 2]), Some(5.0));
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn swap_axes_transposes_matrix() {
        let t = arange(&[2, 3]).swap_axes(0, 1).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.data(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn permute_rank3_matches_manual_indexing() {
        let t = arange(&[2, 3, 4]);
        let p = t.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.shape(), &[4, 2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(p.get(&[k, i, j]), t.get(&[i, j, k]));
                }
            }
        }
    }

    #[test]
    fn permute_rejects_duplicates() {
        let t = arange(&[2, 3]);
        assert!(matches!(t.permute(&[0, 0]), Err(Error::InvalidPermutation { .. })));
        assert!(matches!(t.permute(&[0]), Err(Error::InvalidPermutation { .. })));
    }

    #[test]
    fn move_axis_round_trips() {
        let t = arange(&[2, 3, 4]);
        for axis in 0..3 {
            let moved = t.move_axis_to_last(axis).unwrap();
            assert_eq!(moved.shape()[2], t.shape()[axis]);
            assert_eq!(moved.move_last_axis_to(axis).unwrap(), t);
        }
    }

    #[test]
    fn swap_axes_rejects_out_of_range_axis() {
        let err = arange(&[2, 3]).swap_axes(0, 2).unwrap_err();
        assert_eq!(err, Error::AxisOutOfRange { axis: 2, rank: 2 });
    }

    #[test]
    fn reshape_keeps_order_and_checks_count() {
        let t = arange(&[2, 3]).reshape(&[3, 2]).unwrap();
        assert_eq!(t.get(&[2, 1]), Some(5.0));
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn sum_axis_reduces_each_axis() {
        let t = arange(&[2, 3]);
        assert_eq!(t.sum_axis(0).unwrap().data(), &[3.0, 5.0, 7.0]);
        assert_eq!(t.sum_axis(1).unwrap().data(), &[3.0, 12.0]);
        let s = Tensor::new(vec![3], vec![1.0, 2.0, 3.0]).unwrap().sum_axis(0).unwrap();
        assert_eq!(s.shape(), &[] as &[usize]);
        assert_eq!(s.data(), &[6.0]);
    }

    #[test]
    fn clip_clamps_both_ends() {
        let t = Tensor::new(vec![3], vec![0.0, 0.5, 1.0]).unwrap().clip(0.1, 0.9);
        assert_eq!(t.data(), &[0.1, 0.5, 0.9]);
    }

    #[test]
    fn zip_map_requires_equal_shapes() {
        let a = arange(&[2, 3]);
        let b = arange(&[3, 2]);
        assert!(matches!(a.zip_map(&b, |x, y| x * y), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let t = arange(&[2, 3, 4]).map(|x| x * 0.3 - 2.0);
        let p = t.softmax(1).unwrap();
        let sums = p.sum_axis(1).unwrap();
        for &s in sums.data() {
            assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        }
        assert!(p.data().iter().all(|&x| x > 0.0));
    }

    #[test]
    fn random_is_in_unit_interval() {
        let t = Tensor::random(&[4, 5]).unwrap();
        assert_eq!(t.len(), 20);
        assert!(t.data().iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn json_deserialization_validates_shape() {
        let ok: Tensor = serde_json::from_str(r#"{"shape":[2],"data":[0.5,0.5]}"#).unwrap();
        assert_eq!(ok.shape(), &[2]);
        let bad = serde_json::from_str::<Tensor>(r#"{"shape":[3],"data":[0.5,0.5]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn overflowing_shapes_are_errors() {
        let huge = 1usize << (usize::BITS / 2);
        let wraps = serde_json::from_str::<Tensor>(&format!(r#"{{"shape":[{huge},{huge}],"data":[]}}"#));
        assert!(wraps.is_err());
        let zero_sized = serde_json::from_str::<Tensor>(&format!(r#"{{"shape":[{huge},{huge},0],"data":[]}}"#));
        assert!(zero_sized.is_err());

        assert_eq!(
            Tensor::new(vec![huge, huge], vec![]),
            Err(Error::ShapeOverflow { shape: vec![huge, huge] })
        );
        assert!(Tensor::zeros(&[huge, huge]).is_err());
        assert!(Tensor::random(&[huge, huge]).is_err());
        assert!(Tensor::scalar(1.0).reshape(&[huge, huge, 0, 1]).is_err());

        let empty = Tensor::zeros(&[0, huge, huge]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.sum_axis(0).is_err());
    }
}
