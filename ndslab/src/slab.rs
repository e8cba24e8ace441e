/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::path::PathBuf;

use itertools::izip;
use serde::Deserialize;
use serde::Serialize;

use crate::descriptor::ArrayDescriptor;
use crate::stream::StreamError;

/// The type of error for slab reads.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SlabError {
    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("negative offset {offset} in dimension {dim}")]
    NegativeOffset { dim: usize, offset: i64 },

    #[error("nonpositive size {size} in dimension {dim}")]
    NonPositiveSize { dim: usize, size: i64 },

    #[error("slab end {end} out of range for dimension {dim} of size {size}")]
    OutOfBounds { dim: usize, end: i64, size: usize },

    #[error("buffer holds {got} elements, slab has {expected}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("token position overflows in dimension {dim}")]
    SkipOverflow { dim: usize },

    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEndOfInput { expected: &'static str },

    #[error("token '{actual}' is not a '{expected_type}'")]
    WrongTokenType {
        expected_type: &'static str,
        actual: String,
    },

    #[error("resource {path:?} unavailable: {source}")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`SlabError`]s.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    /// The request does not fit the array; reported before any I/O.
    InvalidRequest,
    /// The input ended before all required tokens were read.
    UnexpectedEndOfInput,
    /// The backing file could not be opened.
    ResourceUnavailable,
    /// A token in the data region is not a number of the requested type.
    Malformed,
    /// Any other failure of the underlying reader.
    Io,
}

impl SlabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlabError::InvalidDims { .. }
            | SlabError::NegativeOffset { .. }
            | SlabError::NonPositiveSize { .. }
            | SlabError::OutOfBounds { .. }
            | SlabError::BufferSizeMismatch { .. }
            | SlabError::SkipOverflow { .. } => ErrorKind::InvalidRequest,
            SlabError::UnexpectedEndOfInput { .. } => ErrorKind::UnexpectedEndOfInput,
            SlabError::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            SlabError::WrongTokenType { .. } => ErrorKind::Malformed,
            SlabError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<StreamError> for SlabError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::UnexpectedEndOfInput { expected } => {
                SlabError::UnexpectedEndOfInput { expected }
            }
            StreamError::WrongTokenType {
                expected_type,
                actual,
            } => SlabError::WrongTokenType {
                expected_type,
                actual,
            },
            StreamError::Io(err) => SlabError::Io(err),
        }
    }
}

/// A slab is a rectangular region of an array, given by a zero-based
/// offset and a size in each dimension. Offsets are relative to the
/// descriptor's own base offsets.
///
/// Offsets and sizes are signed so that malformed requests can be
/// expressed and rejected by [`Slab::check_dimensions`].
///
/// ```
/// # use ndslab::ArrayDescriptor;
/// # use ndslab::Resource;
/// # use ndslab::Slab;
/// let desc = ArrayDescriptor::new_dense([3, 4], 1, Resource::Inline(String::new())).unwrap();
/// let slab = Slab::new(vec![1, 1], vec![2, 2]).unwrap();
/// assert!(slab.check_dimensions(&desc).is_ok());
/// assert_eq!(slab.len(), 4);
///
/// let slab = Slab::new(vec![0, 0], vec![3, 5]).unwrap();
/// assert!(slab.check_dimensions(&desc).is_err());
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
#[serde(try_from = "RawSlab")]
pub struct Slab {
    offsets: Vec<i64>,
    sizes: Vec<i64>,
}

impl Slab {
    /// Create a new slab. Offsets and sizes must have the same length;
    /// their values are checked against an array by
    /// [`Slab::check_dimensions`].
    pub fn new(offsets: Vec<i64>, sizes: Vec<i64>) -> Result<Self, SlabError> {
        if offsets.len() != sizes.len() {
            return Err(SlabError::InvalidDims {
                expected: offsets.len(),
                got: sizes.len(),
            });
        }
        Ok(Self { offsets, sizes })
    }

    /// The slab covering the whole of the described array.
    pub fn full(desc: &ArrayDescriptor) -> Self {
        Self {
            offsets: vec![0; desc.rank()],
            sizes: izip!(desc.sizes(), desc.offsets())
                .map(|(&size, &offset)| i64::try_from(size - offset).unwrap_or(i64::MAX))
                .collect(),
        }
    }

    /// The number of dimensions in this slab.
    pub fn num_dim(&self) -> usize {
        self.sizes.len()
    }

    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    /// The number of elements in the slab. Nonpositive sizes count as
    /// empty. Saturates at `usize::MAX`; see [`Slab::checked_len`].
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// The number of elements in the slab, failing with
    /// [`SlabError::SkipOverflow`] at the first dimension whose size
    /// makes the count overflow.
    pub fn checked_len(&self) -> Result<usize, SlabError> {
        self.sizes
            .iter()
            .enumerate()
            .try_fold(1usize, |len, (dim, &size)| {
                len.checked_mul(size.max(0) as usize)
                    .ok_or(SlabError::SkipOverflow { dim })
            })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that this slab lies within the declared extent of `desc`.
    /// For every dimension `i`:
    ///
    /// ```text
    /// offsets[i] ≥ 0
    /// sizes[i] > 0
    /// desc.offsets[i] + offsets[i] + sizes[i] ≤ desc.sizes[i]
    /// ```
    ///
    /// This performs no I/O.
    pub fn check_dimensions(&self, desc: &ArrayDescriptor) -> Result<(), SlabError> {
        if self.num_dim() != desc.rank() {
            return Err(SlabError::InvalidDims {
                expected: desc.rank(),
                got: self.num_dim(),
            });
        }

        for (dim, (&offset, &size, &base, &extent)) in
            izip!(&self.offsets, &self.sizes, desc.offsets(), desc.sizes()).enumerate()
        {
            if offset < 0 {
                return Err(SlabError::NegativeOffset { dim, offset });
            }
            if size <= 0 {
                return Err(SlabError::NonPositiveSize { dim, size });
            }
            let end = (base as i64)
                .checked_add(offset)
                .and_then(|start| start.checked_add(size))
                .unwrap_or(i64::MAX);
            if end > extent as i64 {
                return Err(SlabError::OutOfBounds {
                    dim,
                    end,
                    size: extent,
                });
            }
        }

        Ok(())
    }

    /// The absolute coordinate of the slab's first element within the
    /// stored text. Only meaningful for a checked slab.
    pub(crate) fn origin(&self, desc: &ArrayDescriptor) -> Vec<usize> {
        izip!(&self.offsets, desc.offsets())
            .map(|(&offset, &base)| base + offset as usize)
            .collect()
    }

    /// The absolute coordinate of the slab's last element within the
    /// stored text. Only meaningful for a checked slab.
    pub(crate) fn last(&self, desc: &ArrayDescriptor) -> Vec<usize> {
        izip!(self.origin(desc), &self.sizes)
            .map(|(origin, &size)| origin + size as usize - 1)
            .collect()
    }
}

/// Unvalidated form of [`Slab`], so that deserialized slabs go
/// through [`Slab::new`].
#[derive(Deserialize)]
struct RawSlab {
    offsets: Vec<i64>,
    sizes: Vec<i64>,
}

impl TryFrom<RawSlab> for Slab {
    type Error = SlabError;

    fn try_from(raw: RawSlab) -> Result<Self, Self::Error> {
        Slab::new(raw.offsets, raw.sizes)
    }
}

impl std::fmt::Display for Slab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}+{:?}", self.offsets, self.sizes)
    }
}

/// Iterates over all coordinate tuples in an N-dimensional space,
/// like an odometer: the last (innermost) counter is incremented
/// first, and carries into the counter before it when it wraps.
///
/// Coordinates are yielded in row-major order. A zero-dimensional
/// space yields a single empty coordinate; a space with any
/// zero-sized dimension yields nothing.
///
/// ```
/// # use ndslab::Odometer;
/// let coords: Vec<_> = Odometer::new(vec![2, 3]).collect();
/// assert_eq!(coords, vec![
///     vec![0, 0], vec![0, 1], vec![0, 2],
///     vec![1, 0], vec![1, 1], vec![1, 2],
/// ]);
/// ```
pub struct Odometer {
    dims: Vec<usize>,
    counter: Vec<usize>,
    done: bool,
}

impl Odometer {
    pub fn new(dims: Vec<usize>) -> Self {
        let done = dims.contains(&0);
        let counter = vec![0; dims.len()];
        Odometer {
            dims,
            counter,
            done,
        }
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.counter.clone();
        self.done = true;
        for (count, &dim) in self.counter.iter_mut().zip(&self.dims).rev() {
            *count += 1;
            if *count < dim {
                self.done = false;
                break;
            }
            *count = 0;
        }
        Some(current)
    }
}
