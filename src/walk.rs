//! Access patterns. One pass touches every cache line of the region once and
//! dirties it.

use std::hint::black_box;
use std::iter::StepBy;
use std::ops::Range;

use crate::chain::Chain;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Ascending address order. A stride prefetcher may still keep up, so this
    /// is the baseline.
    Sequential,
    /// Data dependent walk along a shuffled chain.
    Random,
}

impl Pattern {
    /// A selector starting with `r` picks the random walk, anything else the
    /// sequential one.
    pub fn from_selector(selector: &str) -> Self {
        if selector.starts_with('r') {
            Pattern::Random
        } else {
            Pattern::Sequential
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Sequential => write!(f, "sequential"),
            Pattern::Random => write!(f, "random"),
        }
    }
}

pub trait Traversal {
    /// Walks the whole region once and returns the number of lines touched.
    fn pass(&mut self) -> usize;
}

/// Offset of the first byte of every line, ascending.
pub fn line_offsets(len: usize, line_size: usize) -> StepBy<Range<usize>> {
    (0..len).step_by(line_size)
}

pub struct SequentialWalk<'a> {
    bytes: &'a mut [u8],
    line_size: usize,
}

impl<'a> SequentialWalk<'a> {
    pub fn new(bytes: &'a mut [u8], line_size: usize) -> Self {
        SequentialWalk { bytes, line_size }
    }
}

impl Traversal for SequentialWalk<'_> {
    fn pass(&mut self) -> usize {
        let mut touched = 0;
        for offset in line_offsets(self.bytes.len(), self.line_size) {
            self.bytes[offset] = self.bytes[offset].wrapping_add(1);
            touched += 1;
        }
        // Keep the stores of every pass observable
        black_box(&mut *self.bytes);
        touched
    }
}

pub struct ChainWalk<'a> {
    chain: Chain<'a>,
    cursor: usize,
}

impl<'a> ChainWalk<'a> {
    pub fn new(chain: Chain<'a>) -> Self {
        ChainWalk { chain, cursor: 0 }
    }

    pub fn chain(&self) -> &Chain<'a> {
        &self.chain
    }
}

impl Traversal for ChainWalk<'_> {
    fn pass(&mut self) -> usize {
        let start = self.cursor;
        let mut touched = 0;
        loop {
            self.cursor = self.chain.touch(self.cursor);
            touched += 1;
            if self.cursor == start {
                break;
            }
        }
        black_box(self.cursor);
        touched
    }
}
