//! Circular doubly linked chain laid out in place inside the region.
//!
//! Every cache line holds one entry at its start:
//!
//! ```text
//! word 0   index of the next entry
//! word 1   index of the previous entry
//! word 2   payload bumped by each visit
//! ```
//!
//! Links are entry indices, so the chain is an arena over the region. After
//! construction the `next` links form a single cycle through every entry and
//! `prev` is always the exact inverse of `next`.

use rand::Rng;

use crate::error::{Error, Result};
use crate::region::{Region, WORD};

const NEXT: usize = 0;
const PREV: usize = 1;
const PAYLOAD: usize = 2;

/// Words an entry occupies at the start of its line.
pub const ENTRY_WORDS: usize = 3;

pub struct Chain<'a> {
    words: &'a mut [u64],
    /// Words per cache line.
    stride: usize,
    len: usize,
}

impl<'a> Chain<'a> {
    /// Links every line of the region in address order.
    pub fn in_order(region: &'a mut Region) -> Result<Self> {
        let len = region.lines();
        Self::in_order_over(region, len)
    }

    /// Links the first `len` lines of the region in address order.
    fn in_order_over(region: &'a mut Region, len: usize) -> Result<Self> {
        let stride = region.line_size() / WORD;
        if len > region.lines() {
            return Err(Error::Geometry(format!(
                "a chain of {} entries does not fit in {} lines",
                len,
                region.lines()
            )));
        }
        if stride < ENTRY_WORDS {
            return Err(Error::Geometry(format!(
                "a {} byte line cannot hold a chain entry",
                region.line_size()
            )));
        }
        if len < 2 {
            return Err(Error::Geometry(format!(
                "a chain needs at least 2 lines, the region has {}",
                len
            )));
        }

        let mut chain = Chain {
            words: region.words_mut(),
            stride,
            len,
        };
        for i in 0..len {
            chain.set_next(i, (i + 1) % len);
            chain.set_prev(i, (i + len - 1) % len);
        }
        Ok(chain)
    }

    /// Links the region in a random order drawn from `rng`.
    pub fn shuffled<R: Rng>(region: &'a mut Region, rng: &mut R) -> Result<Self> {
        let mut chain = Self::in_order(region)?;
        chain.shuffle(rng);
        chain.check()?;
        log::debug!("shuffled a chain of {} entries", chain.len);
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn next(&self, entry: usize) -> usize {
        self.words[entry * self.stride + NEXT] as usize
    }

    #[inline(always)]
    pub fn prev(&self, entry: usize) -> usize {
        self.words[entry * self.stride + PREV] as usize
    }

    pub fn payload(&self, entry: usize) -> u64 {
        self.words[entry * self.stride + PAYLOAD]
    }

    /// Bumps the payload of `entry` and returns the entry after it.
    #[inline(always)]
    pub fn touch(&mut self, entry: usize) -> usize {
        let base = entry * self.stride;
        self.words[base + PAYLOAD] = self.words[base + PAYLOAD].wrapping_add(1);
        self.words[base + NEXT] as usize
    }

    #[inline(always)]
    fn set_next(&mut self, entry: usize, to: usize) {
        self.words[entry * self.stride + NEXT] = to as u64;
    }

    #[inline(always)]
    fn set_prev(&mut self, entry: usize, to: usize) {
        self.words[entry * self.stride + PREV] = to as u64;
    }

    /// Unbiased in place shuffle of the chain order: for every slot `i` pick
    /// `choice` in `[i, len)` and swap the chain positions of both entries.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.shuffle_observed(rng, |_| {});
    }

    /// Same as [`Chain::shuffle`], calling `observe` after every swap.
    pub fn shuffle_observed<R, F>(&mut self, rng: &mut R, mut observe: F)
    where
        R: Rng,
        F: FnMut(&Chain<'a>),
    {
        for i in 0..self.len - 1 {
            let choice = rng.gen_range(i..self.len);
            self.swap_positions(i, choice);
            observe(self);
        }
    }

    /// Swaps where `a` and `b` sit in the chain, relinking their neighbours.
    pub fn swap_positions(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (a_prev, a_next) = (self.prev(a), self.next(a));
        let (b_prev, b_next) = (self.prev(b), self.next(b));

        if a_next == b && b_next == a {
            // Two entry cycle, both orders are the same cycle
            return;
        }
        if a_next == b {
            self.swap_adjacent(a_prev, a, b, b_next);
        } else if b_next == a {
            self.swap_adjacent(b_prev, b, a, a_next);
        } else {
            // a_prev may equal b_next (and b_prev a_next) when the chain is
            // short; the writes below touch distinct fields in that case.
            self.set_prev(a, b_prev);
            self.set_next(a, b_next);
            self.set_prev(b, a_prev);
            self.set_next(b, a_next);
            self.set_next(a_prev, b);
            self.set_prev(a_next, b);
            self.set_next(b_prev, a);
            self.set_prev(b_next, a);
        }
    }

    /// `before -> first -> second -> after` becomes
    /// `before -> second -> first -> after`. Relinking the pair through each
    /// other instead of through their old neighbours avoids self loops.
    fn swap_adjacent(&mut self, before: usize, first: usize, second: usize, after: usize) {
        self.set_next(before, second);
        self.set_prev(second, before);
        self.set_next(second, first);
        self.set_prev(first, second);
        self.set_next(first, after);
        self.set_prev(after, first);
    }

    /// Verifies that the links form one cycle over all entries and that
    /// `prev` inverts `next`.
    pub fn check(&self) -> Result<()> {
        for entry in 0..self.len {
            let next = self.next(entry);
            let prev = self.prev(entry);
            if next >= self.len || prev >= self.len {
                return Err(Error::BrokenChain {
                    entry,
                    reason: "link points outside the region",
                });
            }
            if next == entry || prev == entry {
                return Err(Error::BrokenChain {
                    entry,
                    reason: "entry links to itself",
                });
            }
            if self.prev(next) != entry || self.next(prev) != entry {
                return Err(Error::BrokenChain {
                    entry,
                    reason: "backward link is not the inverse of the forward link",
                });
            }
        }

        let mut cursor = 0;
        for step in 1..=self.len {
            cursor = self.next(cursor);
            if cursor == 0 && step != self.len {
                return Err(Error::BrokenChain {
                    entry: 0,
                    reason: "cycle does not cover every entry",
                });
            }
        }
        Ok(())
    }

    /// Entries in chain order, starting at `start`.
    pub fn order_from(&self, start: usize) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len);
        let mut cursor = start;
        loop {
            order.push(cursor);
            cursor = self.next(cursor);
            if cursor == start || order.len() > self.len {
                break;
            }
        }
        order
    }
}
