/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Slab reads over multidimensional arrays stored as text.
//!
//! Provides [`TextArrayReader`], which extracts rectangular
//! sub-regions ([`Slab`]s) of an array whose elements are stored as
//! whitespace- or comma-separated numbers in a file or an inline
//! string. See [`TextArrayReader`] for more details.
//!
//! The array's declared shape, its placement within the stored text,
//! and the location of the text are given by an [`ArrayDescriptor`].
//! Reads are validated against the descriptor before any I/O, and the
//! position of the first data token is computed once and cached.

mod descriptor;
pub use descriptor::ArrayDescriptor;
pub use descriptor::DescriptorError;
pub use descriptor::Resource;

mod slab;
pub use slab::ErrorKind;
pub use slab::Odometer;
pub use slab::Slab;
pub use slab::SlabError;

/// Reader configuration, loadable from the environment or YAML.
pub mod config;
pub use config::ReaderConfig;

/// Token positions of coordinates within the stored text.
pub mod layout;

/// Slab reader and its element types.
pub mod reader;
pub use reader::Scalar;
pub use reader::TextArrayReader;

/// Token streams over files and strings.
pub mod stream;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
