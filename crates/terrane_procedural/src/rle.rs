//! # Run-Length Codec
//!
//! Lazy run-length encoding for any sequence of comparable values.
//!
//! ```text
//!   [5, 5, 5, 2, 2, 5]  ──compress──▶  (3, 5) (2, 2) (1, 5)
//! ```
//!
//! Runs are `u16`. A run that hits the limit is emitted and a new run of the
//! same value starts, so a well-formed stream only repeats a value across
//! adjacent nodes when the first node is saturated. Zero-length nodes are
//! never emitted.

/// Longest run a node can hold.
pub const MAX_RUN: u16 = u16::MAX;

/// One run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RleNode<T> {
    /// How many times `value` repeats. Never zero in encoder output.
    pub run_length: u16,
    /// The repeated value.
    pub value: T,
}

impl<T> RleNode<T> {
    /// Creates a node.
    #[inline]
    #[must_use]
    pub const fn new(run_length: u16, value: T) -> Self {
        Self { run_length, value }
    }
}

/// Lazy encoder returned by [`compress`].
#[derive(Clone, Debug)]
pub struct Compress<I: Iterator> {
    input: I,
    current: I::Item,
    run: u16,
    limit: u16,
    finished: bool,
}

impl<I> Iterator for Compress<I>
where
    I: Iterator,
    I::Item: PartialEq + Clone,
{
    type Item = RleNode<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let Some(element) = self.input.next() else {
                // Mandatory flush of the last run
                self.finished = true;
                return (self.run > 0).then(|| RleNode::new(self.run, self.current.clone()));
            };

            if element == self.current && self.run < self.limit {
                self.run += 1;
                continue;
            }

            let value = std::mem::replace(&mut self.current, element);
            let run = std::mem::replace(&mut self.run, 1);
            // The seed value only becomes a node if it actually occurred
            if run > 0 {
                return Some(RleNode::new(run, value));
            }
        }
    }
}

/// Encodes `sequence`. `first` seeds the comparison and is not emitted
/// unless the sequence starts with it.
pub fn compress<S>(sequence: S, first: S::Item) -> Compress<S::IntoIter>
where
    S: IntoIterator,
    S::Item: PartialEq + Clone,
{
    compress_with_limit(sequence, first, MAX_RUN)
}

/// Encodes with a run ceiling below [`MAX_RUN`]. A zero limit is treated as 1.
pub fn compress_with_limit<S>(sequence: S, first: S::Item, limit: u16) -> Compress<S::IntoIter>
where
    S: IntoIterator,
    S::Item: PartialEq + Clone,
{
    Compress {
        input: sequence.into_iter(),
        current: first,
        run: 0,
        limit: limit.max(1),
        finished: false,
    }
}

/// Lazily expands nodes back into values.
pub fn decompress<N, T>(nodes: N) -> impl Iterator<Item = T>
where
    N: IntoIterator<Item = RleNode<T>>,
    T: Clone,
{
    nodes
        .into_iter()
        .flat_map(|node| std::iter::repeat(node.value).take(usize::from(node.run_length)))
}

/// Length of the decoded sequence.
#[must_use]
pub fn decoded_len<T>(nodes: &[RleNode<T>]) -> usize {
    nodes.iter().map(|n| usize::from(n.run_length)).sum()
}

/// Checks the encoder invariants: no empty runs, no runs above `limit`, and
/// adjacent equal values only after a saturated run.
#[must_use]
pub fn is_well_formed<T: PartialEq>(nodes: &[RleNode<T>], limit: u16) -> bool {
    nodes.iter().all(|n| n.run_length > 0 && n.run_length <= limit)
        && nodes
            .windows(2)
            .all(|pair| pair[0].value != pair[1].value || pair[0].run_length == limit)
}
