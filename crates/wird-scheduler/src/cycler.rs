//! Content cycler: which pages a release carries and where the next one starts.
//!
//! Pages are numbered `1..=corpus_size`. A release takes `run_length`
//! consecutive pages and wraps past the last page back to page 1. A release
//! that contains the last page completes the cycle (a khatma).

/// One release of the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Page numbers in delivery order.
    pub pages: Vec<u32>,
    /// Start page of the following release.
    pub next_position: u32,
    /// The release contains the final page.
    pub completed: bool,
}

/// Map any index `>= 1` into `[1, corpus_size]`; 0 maps to 1.
fn wrap(index: u32, corpus_size: u32) -> u32 {
    if index == 0 {
        return 1;
    }
    (index - 1) % corpus_size + 1
}

/// Compute the release starting at `position`. Pure: the caller commits
/// `next_position` only once delivery succeeded.
///
/// `corpus_size` must be positive (checked by config validation).
pub fn advance(position: u32, run_length: u32, corpus_size: u32) -> Release {
    let start = wrap(position, corpus_size);
    let pages: Vec<u32> = (0..run_length)
        .map(|offset| wrap(start + offset, corpus_size))
        .collect();
    let completed = pages.contains(&corpus_size);
    let next_position = wrap(start + run_length, corpus_size);
    Release {
        pages,
        next_position,
        completed,
    }
}
