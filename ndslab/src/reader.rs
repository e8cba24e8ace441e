/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Reading slabs of text arrays.
//!
//! A [`TextArrayReader`] owns a [`TokenStream`] positioned over the
//! text of one array, as described by an [`ArrayDescriptor`]. Each
//! slab read is a self-contained traversal from the first data token:
//!
//! 1. The [`Slab`] is checked against the descriptor, and the token
//!    position of its last element is computed, before any I/O.
//! 2. On the first read, the preamble (`first_line - 1` lines) is
//!    skipped and the resulting position is cached. Later reads seek
//!    straight back to it.
//! 3. An [`Odometer`] walks the outer dimensions of the slab in
//!    row-major order. For each outer coordinate, the stream skips
//!    forward to the start of the innermost run and copies the run
//!    into the output buffer.
//!
//! Skipped tokens are always parsed as `f64`, whatever the element
//! type of the slab.

use crate::config::ReaderConfig;
use crate::descriptor::ArrayDescriptor;
use crate::descriptor::Resource;
use crate::layout::LayoutMap;
use crate::layout::TextLayout;
use crate::slab::Odometer;
use crate::slab::Slab;
use crate::slab::SlabError;
use crate::stream::InputStream;
use crate::stream::StreamError;
use crate::stream::TokenStream;

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// Element types a slab can be read as.
pub trait Scalar: sealed::Sealed + Copy + Default {
    /// Consume the next token of `stream` as a `Self`.
    fn read_from<S: TokenStream + ?Sized>(stream: &mut S) -> Result<Self, StreamError>;
}

impl Scalar for i32 {
    fn read_from<S: TokenStream + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        stream.read_int()
    }
}

impl Scalar for f64 {
    fn read_from<S: TokenStream + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        stream.read_double()
    }
}

/// A checked slab, ready to be traversed.
struct ReadPlan {
    layout: TextLayout,
    origin: Vec<usize>,
    outer_sizes: Vec<usize>,
    run: usize,
}

impl ReadPlan {
    fn new(desc: &ArrayDescriptor, slab: &Slab, buffer_len: usize) -> Result<Self, SlabError> {
        slab.check_dimensions(desc)?;
        let len = slab.checked_len()?;
        if buffer_len != len {
            return Err(SlabError::BufferSizeMismatch {
                expected: len,
                got: buffer_len,
            });
        }

        let layout = TextLayout::new(desc)?;
        // Token positions grow with every coordinate, so if the last
        // element's position fits, all of them do.
        layout.token_of(&slab.last(desc))?;

        let mut sizes: Vec<usize> = slab.sizes().iter().map(|&size| size as usize).collect();
        let run = sizes.pop().unwrap_or(1);
        Ok(Self {
            layout,
            origin: slab.origin(desc),
            outer_sizes: sizes,
            run,
        })
    }
}

/// Reads rectangular slabs of an array stored as text.
///
/// ```
/// # use ndslab::ArrayDescriptor;
/// # use ndslab::Resource;
/// # use ndslab::TextArrayReader;
/// # use ndslab::stream::InputStream;
/// let text = "x y z\n1.0 2.0 3.0 4.0\n5.0 6.0 7.0 8.0\n9.0 10.0 11.0 12.0\n";
/// let desc = ArrayDescriptor::new_dense([3, 4], 2, Resource::Inline(text.into())).unwrap();
/// let mut reader = TextArrayReader::new(InputStream::from_string(text), desc);
///
/// let mut buffer = [0.0; 4];
/// reader.read_double_slab(&[1, 1], &[2, 2], &mut buffer).unwrap();
/// assert_eq!(buffer, [6.0, 7.0, 10.0, 11.0]);
/// ```
pub struct TextArrayReader<S = InputStream> {
    stream: S,
    desc: ArrayDescriptor,
    start_pos: Option<u64>,
}

impl TextArrayReader<InputStream> {
    /// Create a reader over the descriptor's resource. File resources
    /// are opened as given; hrefs are resolved against the configured
    /// root; inline text is copied into the reader.
    ///
    /// Fails with [`SlabError::ResourceUnavailable`] if the file cannot
    /// be opened.
    pub fn open(config: &ReaderConfig, desc: ArrayDescriptor) -> Result<Self, SlabError> {
        let stream = match desc.resource() {
            Resource::Inline(text) => InputStream::from_string(text.as_str()),
            Resource::File(path) => Self::open_file(path.clone())?,
            Resource::Href(href) => Self::open_file(config.resolve(href))?,
        };
        Ok(Self::new(stream, desc))
    }

    fn open_file(path: std::path::PathBuf) -> Result<InputStream, SlabError> {
        match InputStream::open(&path) {
            Ok(stream) => Ok(stream),
            Err(source) => {
                tracing::warn!(path = %path.display(), "cannot open array resource: {}", source);
                Err(SlabError::ResourceUnavailable { path, source })
            }
        }
    }
}

impl<S: TokenStream> TextArrayReader<S> {
    /// Create a reader over an existing stream. The stream must be
    /// positioned at the start of the array's text.
    pub fn new(stream: S, desc: ArrayDescriptor) -> Self {
        Self {
            stream,
            desc,
            start_pos: None,
        }
    }

    pub fn descriptor(&self) -> &ArrayDescriptor {
        &self.desc
    }

    /// The cached position of the first data token, once known.
    pub fn start_position(&self) -> Option<u64> {
        self.start_pos
    }

    /// Release the reader, returning its stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read a slab of integers into `buffer`, which must hold exactly
    /// `∏ sizes` elements. See [`TextArrayReader::read_slab`].
    pub fn read_int_slab(
        &mut self,
        offsets: &[i64],
        sizes: &[i64],
        buffer: &mut [i32],
    ) -> Result<(), SlabError> {
        let slab = Slab::new(offsets.to_vec(), sizes.to_vec())?;
        self.read_slab(&slab, buffer)
    }

    /// Read a slab of doubles into `buffer`, which must hold exactly
    /// `∏ sizes` elements. See [`TextArrayReader::read_slab`].
    pub fn read_double_slab(
        &mut self,
        offsets: &[i64],
        sizes: &[i64],
        buffer: &mut [f64],
    ) -> Result<(), SlabError> {
        let slab = Slab::new(offsets.to_vec(), sizes.to_vec())?;
        self.read_slab(&slab, buffer)
    }

    /// Read `slab` into `buffer` in row-major order.
    ///
    /// Invalid requests are rejected before the stream is touched. On
    /// any other error the buffer may have been partially written and
    /// its contents must not be used.
    pub fn read_slab<T: Scalar>(&mut self, slab: &Slab, buffer: &mut [T]) -> Result<(), SlabError> {
        let plan = ReadPlan::new(&self.desc, slab, buffer.len())?;
        tracing::trace!(%slab, "reading slab");
        self.ensure_position()?;
        self.read_slice(&plan, buffer)
    }

    /// Like [`TextArrayReader::read_slab`], allocating the buffer.
    pub fn read_slab_vec<T: Scalar>(&mut self, slab: &Slab) -> Result<Vec<T>, SlabError> {
        slab.check_dimensions(&self.desc)?;
        let mut buffer = vec![T::default(); slab.checked_len()?];
        self.read_slab(slab, &mut buffer)?;
        Ok(buffer)
    }

    fn ensure_position(&mut self) -> Result<(), SlabError> {
        match self.start_pos {
            Some(pos) => self.stream.seek(pos)?,
            None => self.skip_preamble()?,
        }
        Ok(())
    }

    fn skip_preamble(&mut self) -> Result<(), SlabError> {
        for _ in 1..self.desc.first_line() {
            self.stream.skip_line()?;
        }
        if self.stream.is_eof()? {
            return Err(SlabError::UnexpectedEndOfInput {
                expected: "array data",
            });
        }

        let pos = self.stream.tell();
        tracing::debug!(
            first_line = self.desc.first_line(),
            start_pos = pos,
            "cached array data position"
        );
        self.start_pos = Some(pos);
        Ok(())
    }

    /// Discard `count` tokens.
    fn apply_offsets(&mut self, count: u64) -> Result<(), SlabError> {
        for _ in 0..count {
            self.stream.read_double()?;
        }
        Ok(())
    }

    fn read_slice<T: Scalar>(&mut self, plan: &ReadPlan, buffer: &mut [T]) -> Result<(), SlabError> {
        let mut coord = plan.origin.clone();
        // Tokens consumed since the start of data.
        let mut cursor = 0u64;

        let runs = Odometer::new(plan.outer_sizes.clone());
        for (outer, chunk) in runs.zip(buffer.chunks_mut(plan.run)) {
            for (c, (&origin, &index)) in coord.iter_mut().zip(plan.origin.iter().zip(&outer)) {
                *c = origin + index;
            }
            // Runs are visited in increasing token order.
            let target = plan.layout.token_of(&coord)?;
            self.apply_offsets(target - cursor)?;
            for value in chunk.iter_mut() {
                *value = T::read_from(&mut self.stream)?;
            }
            cursor = target + plan.run as u64;
        }

        Ok(())
    }
}
