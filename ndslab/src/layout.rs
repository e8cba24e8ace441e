/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::descriptor::ArrayDescriptor;
use crate::slab::SlabError;

mod sealed {
    // Private trait — only types in this module can implement it
    pub trait Sealed {}
}

/// A trait for text layouts that map multidimensional coordinates
/// (in `ℕⁿ`) to token positions (`ℕ¹`) in the stored text, via an
/// affine transformation:
///
/// ```text
/// token_of(x) = dot(strides, x)
/// ```
///
/// Positions are counted in tokens from the first data token, and are
/// computed with checked arithmetic: a coordinate whose position does
/// not fit in a `u64` is an error, not a wraparound.
pub trait LayoutMap: sealed::Sealed {
    /// The number of dimensions in the domain of the map.
    fn rank(&self) -> usize;

    /// The number of tokens spanned by one unit of each dimension.
    fn strides(&self) -> &[u64];

    /// Maps a multidimensional coordinate to a token position.
    fn token_of(&self, coord: &[usize]) -> Result<u64, SlabError>;
}

/// The row-major layout of an array's stored text.
///
/// The stride of dimension `i` is `∏ text_sizes[j] for j > i`; the
/// innermost dimension always has stride 1.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TextLayout {
    strides: Vec<u64>,
}

impl TextLayout {
    /// Compute the layout of the descriptor's stored text, failing
    /// with [`SlabError::SkipOverflow`] if any stride overflows.
    pub fn new(desc: &ArrayDescriptor) -> Result<Self, SlabError> {
        Self::from_text_sizes(desc.text_sizes())
    }

    pub(crate) fn from_text_sizes(text_sizes: &[usize]) -> Result<Self, SlabError> {
        let mut strides = vec![1u64; text_sizes.len()];
        for dim in (0..text_sizes.len().saturating_sub(1)).rev() {
            strides[dim] = strides[dim + 1]
                .checked_mul(text_sizes[dim + 1] as u64)
                .ok_or(SlabError::SkipOverflow { dim })?;
        }
        Ok(Self { strides })
    }
}

impl sealed::Sealed for TextLayout {}

impl LayoutMap for TextLayout {
    fn rank(&self) -> usize {
        self.strides.len()
    }

    fn strides(&self) -> &[u64] {
        &self.strides
    }

    fn token_of(&self, coord: &[usize]) -> Result<u64, SlabError> {
        if coord.len() != self.rank() {
            return Err(SlabError::InvalidDims {
                expected: self.rank(),
                got: coord.len(),
            });
        }

        // Dot product ∑ᵢ (strideᵢ × coordᵢ)
        self.strides
            .iter()
            .zip(coord)
            .enumerate()
            .try_fold(0u64, |acc, (dim, (&stride, &i))| {
                stride
                    .checked_mul(i as u64)
                    .and_then(|step| acc.checked_add(step))
                    .ok_or(SlabError::SkipOverflow { dim })
            })
    }
}
