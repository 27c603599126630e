// src/engine/reassembly.rs

//! Ordered re-assembly of section drafts.
//!
//! Drafts complete in arbitrary order. The reassembler buffers out-of-order
//! completions and releases the maximal contiguous run starting at the next
//! expected index each time a new completion arrives. Sections that were
//! never drafted (skipped after cancellation) are marked as gaps so later
//! indices are not held back behind them.
//!
//! Pure data structure; the fan-out drives it.

use std::collections::BTreeMap;

use crate::types::SectionDraft;

#[derive(Debug, Default)]
pub struct SectionReassembler {
    next: usize,
    /// `None` marks a skipped index.
    buffered: BTreeMap<usize, Option<String>>,
}

impl SectionReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next draft that may be emitted.
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Number of completions held back waiting for an earlier index.
    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    /// Accept a completed draft and return every draft that is now ready,
    /// in ascending index order.
    pub fn push(&mut self, draft: SectionDraft) -> Vec<SectionDraft> {
        if draft.index < self.next {
            return Vec::new();
        }
        self.buffered.insert(draft.index, Some(draft.html));
        self.drain_ready()
    }

    /// Mark `index` as never drafted. Returns drafts unblocked by the gap.
    pub fn skip(&mut self, index: usize) -> Vec<SectionDraft> {
        if index < self.next {
            return Vec::new();
        }
        self.buffered.entry(index).or_insert(None);
        self.drain_ready()
    }

    /// Release everything still buffered, in index order, ignoring gaps.
    pub fn flush(&mut self) -> Vec<SectionDraft> {
        let drained = std::mem::take(&mut self.buffered);
        if let Some(last) = drained.keys().next_back() {
            self.next = self.next.max(last + 1);
        }
        drained
            .into_iter()
            .filter_map(|(index, html)| html.map(|html| SectionDraft { index, html }))
            .collect()
    }

    fn drain_ready(&mut self) -> Vec<SectionDraft> {
        let mut ready = Vec::new();
        while let Some(slot) = self.buffered.remove(&self.next) {
            if let Some(html) = slot {
                ready.push(SectionDraft {
                    index: self.next,
                    html,
                });
            }
            self.next += 1;
        }
        ready
    }
}
