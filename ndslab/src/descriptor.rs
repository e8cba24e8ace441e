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

/// The type of error for descriptor construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DescriptorError {
    #[error("array rank must be at least 1")]
    ZeroRank,

    #[error("invalid dims for {field}: expected {expected}, got {got}")]
    InvalidDims {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("dimension {dim} has zero size")]
    ZeroSize { dim: usize },

    #[error("size {size} of dimension {dim} exceeds the largest request extent")]
    SizeTooLarge { dim: usize, size: usize },

    #[error("base offset {offset} out of range for dimension {dim} of size {size}")]
    OffsetOutOfRange {
        dim: usize,
        offset: usize,
        size: usize,
    },

    #[error("text size {text_size} is narrower than size {size} in dimension {dim}")]
    TextTooNarrow {
        dim: usize,
        text_size: usize,
        size: usize,
    },
}

/// Where the text of an array lives.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// A file, opened as given.
    File(PathBuf),
    /// A file named relative to the configured resource root.
    Href(String),
    /// The array text itself.
    Inline(String),
}

/// Describes an array stored as text: its declared shape, the base
/// offset of the array within the stored text, the extents of the
/// stored text itself, and the line on which the data begins.
///
/// Dimension 0 is outermost. One unit of dimension `i` spans
/// `∏ text_sizes[j] for j > i` tokens of the stored text, so
/// `text_sizes[0]` never contributes to a stride.
///
/// ```
/// # use ndslab::ArrayDescriptor;
/// # use ndslab::Resource;
/// let text = "1 2 3 4\n5 6 7 8\n9 10 11 12\n";
/// let desc = ArrayDescriptor::new(
///     vec![3, 4],
///     vec![0, 0],
///     vec![3, 4],
///     1,
///     Resource::Inline(text.to_string()),
/// )
/// .unwrap();
/// assert_eq!(desc.rank(), 2);
/// assert_eq!(desc.len(), 12);
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
#[serde(try_from = "RawArrayDescriptor")]
pub struct ArrayDescriptor {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    text_sizes: Vec<usize>,
    first_line: usize,
    resource: Resource,
}

impl ArrayDescriptor {
    /// Create a new descriptor. Validates that:
    ///   - the rank (length of `sizes`) is at least 1
    ///   - `offsets` and `text_sizes` have one entry per dimension
    ///   - every size is nonzero and fits in an `i64`, and every base
    ///     offset lies within it
    ///   - the stored text is at least as wide as the declared array in
    ///     every dimension that contributes to a stride
    pub fn new(
        sizes: Vec<usize>,
        offsets: Vec<usize>,
        text_sizes: Vec<usize>,
        first_line: usize,
        resource: Resource,
    ) -> Result<Self, DescriptorError> {
        if sizes.is_empty() {
            return Err(DescriptorError::ZeroRank);
        }
        for (field, len) in [("offsets", offsets.len()), ("text_sizes", text_sizes.len())] {
            if len != sizes.len() {
                return Err(DescriptorError::InvalidDims {
                    field,
                    expected: sizes.len(),
                    got: len,
                });
            }
        }
        for (dim, (&size, &offset, &text_size)) in izip!(&sizes, &offsets, &text_sizes).enumerate()
        {
            if size == 0 {
                return Err(DescriptorError::ZeroSize { dim });
            }
            if i64::try_from(size).is_err() {
                return Err(DescriptorError::SizeTooLarge { dim, size });
            }
            if offset >= size {
                return Err(DescriptorError::OffsetOutOfRange { dim, offset, size });
            }
            if dim > 0 && text_size < size {
                return Err(DescriptorError::TextTooNarrow {
                    dim,
                    text_size,
                    size,
                });
            }
        }

        Ok(Self {
            sizes,
            offsets,
            text_sizes,
            first_line,
            resource,
        })
    }

    /// A dense descriptor: no base offset, and stored text of exactly
    /// the declared size.
    pub fn new_dense(
        sizes: impl Into<Vec<usize>>,
        first_line: usize,
        resource: Resource,
    ) -> Result<Self, DescriptorError> {
        let sizes = sizes.into();
        let offsets = vec![0; sizes.len()];
        let text_sizes = sizes.clone();
        Self::new(sizes, offsets, text_sizes, first_line, resource)
    }

    /// The number of dimensions.
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    /// Declared extent of each dimension.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Base offset added to every request, per dimension.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Extents of the stored text, per dimension.
    pub fn text_sizes(&self) -> &[usize] {
        &self.text_sizes
    }

    /// 1-based line number of the first data line.
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Total number of declared elements.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unvalidated form of [`ArrayDescriptor`], so that deserialized
/// descriptors go through [`ArrayDescriptor::new`].
#[derive(Deserialize)]
struct RawArrayDescriptor {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    text_sizes: Vec<usize>,
    first_line: usize,
    resource: Resource,
}

impl TryFrom<RawArrayDescriptor> for ArrayDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawArrayDescriptor) -> Result<Self, Self::Error> {
        ArrayDescriptor::new(
            raw.sizes,
            raw.offsets,
            raw.text_sizes,
            raw.first_line,
            raw.resource,
        )
    }
}
