/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for [`ArrayDescriptor`]s and [`Slab`]s.
//!
//! Generated descriptors carry inline text in which every token's
//! value is its position in the stored text (see [`text_value`]), so
//! tests can compute the expected contents of any slab from the text
//! layout alone.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::descriptor::ArrayDescriptor;
use crate::descriptor::Resource;
use crate::slab::Slab;

/// The value written at token position `pos` of generated text.
pub fn text_value(pos: u64) -> i32 {
    pos as i32
}

/// Render the stored text for `text_sizes`: `first_line - 1` preamble
/// lines, then one line per innermost row.
pub fn render_text(text_sizes: &[usize], first_line: usize) -> String {
    let mut text = String::new();
    for line in 1..first_line {
        text.push_str(&format!("# preamble line {}\n", line));
    }
    let row = text_sizes.last().copied().unwrap_or(1);
    let total: usize = text_sizes.iter().product();
    for pos in 0..total {
        text.push_str(&text_value(pos as u64).to_string());
        text.push(if (pos + 1) % row == 0 { '\n' } else { ' ' });
    }
    text
}

/// Generates a random [`ArrayDescriptor`] with up to `max_dims`
/// dimensions, each of declared size between 1 and `max_len`
/// (inclusive). Base offsets, extra text width and the preamble
/// length vary independently.
pub fn gen_descriptor(max_dims: usize, max_len: usize) -> impl Strategy<Value = ArrayDescriptor> {
    let dim = (1..=max_len).prop_flat_map(|size| (Just(size), 0..size, 0..=2usize));
    (prop::collection::vec(dim, 1..=max_dims), 1..=3usize).prop_map(|(dims, first_line)| {
        let sizes: Vec<usize> = dims.iter().map(|&(size, _, _)| size).collect();
        let offsets: Vec<usize> = dims.iter().map(|&(_, offset, _)| offset).collect();
        let text_sizes: Vec<usize> = dims.iter().map(|&(size, _, extra)| size + extra).collect();
        let text = render_text(&text_sizes, first_line);
        ArrayDescriptor::new(
            sizes,
            offsets,
            text_sizes,
            first_line,
            Resource::Inline(text),
        )
        .expect("valid descriptor")
    })
}

/// Generates a pair `(desc, slab)` where `slab` is a valid
/// rectangular region of `desc`.
pub fn gen_descriptor_and_slab(
    max_dims: usize,
    max_len: usize,
) -> impl Strategy<Value = (ArrayDescriptor, Slab)> {
    gen_descriptor(max_dims, max_len).prop_flat_map(|desc| {
        let ranges: Vec<BoxedStrategy<(i64, i64)>> = desc
            .sizes()
            .iter()
            .zip(desc.offsets())
            .map(|(&size, &base)| {
                let extent = (size - base) as i64;
                (0..extent)
                    .prop_flat_map(move |start| (Just(start), 1..=extent - start))
                    .boxed()
            })
            .collect();
        (Just(desc), ranges).prop_map(|(desc, ranges)| {
            let (offsets, sizes): (Vec<_>, Vec<_>) = ranges.into_iter().unzip();
            let slab = Slab::new(offsets, sizes).expect("valid slab");
            (desc, slab)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        assert_eq!(render_text(&[2, 3], 1), "0 1 2\n3 4 5\n");
        assert_eq!(render_text(&[2], 2), "# preamble line 1\n0 1\n");
    }

    proptest! {
        #[test]
        fn test_generated_slabs_are_valid((desc, slab) in gen_descriptor_and_slab(4, 5)) {
            prop_assert!(slab.check_dimensions(&desc).is_ok());
            prop_assert!(!slab.is_empty());
        }
    }
}
