//! Fixed-size grouping of a lazy stream.
//!
//! Both adapters pull at most one batch worth of items from the source
//! before yielding, so memory stays bounded by the batch size.

/// Groups an iterator into `Vec`s of up to `size` items.
pub struct Batches<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.size);
        for item in self.inner.by_ref() {
            batch.push(item);
            if batch.len() == self.size {
                break;
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Groups an iterator of `Result`s into `Result<Vec<T>, E>` batches.
///
/// The first error is yielded on its own and ends the stream; items already
/// collected into the unfinished batch are dropped.
pub struct TryBatches<I> {
    inner: I,
    size: usize,
    done: bool,
}

impl<I, T, E> Iterator for TryBatches<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = Result<Vec<T>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(Ok(item)) => batch.push(item),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Adds `.batches(n)` and `.try_batches(n)` to every iterator.
///
/// A size of 0 is treated as 1.
pub trait BatchExt: Iterator + Sized {
    fn batches(self, size: usize) -> Batches<Self> {
        Batches {
            inner: self,
            size: size.max(1),
        }
    }

    fn try_batches(self, size: usize) -> TryBatches<Self> {
        TryBatches {
            inner: self,
            size: size.max(1),
            done: false,
        }
    }
}

impl<I: Iterator> BatchExt for I {}
