//! Temporary-buffer pool (spec §4.4/§5): a thread-safe, size-classed
//! free-list for the matmul driver's activation scratch buffer and similar
//! short-lived allocations. Reuse is an optimization, not a correctness
//! requirement — a size-class miss falls straight back to the system
//! allocator, and every acquired buffer is released on every exit path
//! (including panics, via `Drop`) per spec's "Temporary buffer lifetime in
//! matmul" design note.

use std::sync::Mutex;

/// Rounds a requested byte length up to its size class. Classes are powers
/// of two from 64 B up; anything smaller still gets a 64 B slot so the
/// free-list has a bounded number of buckets.
fn size_class(len: usize) -> usize {
    len.max(64).next_power_of_two()
}

fn class_index(class: usize) -> usize {
    class.trailing_zeros() as usize
}

/// A pool of reusable byte buffers, one free-list per size class.
pub struct BufferPool {
    free_lists: Mutex<Vec<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            free_lists: Mutex::new(Vec::new()),
        }
    }

    /// Acquire a zeroed buffer of at least `len` bytes. A cache miss
    /// allocates fresh rather than blocking.
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_> {
        let class = size_class(len);
        let idx = class_index(class);
        let mut buf = {
            let mut lists = self.free_lists.lock().expect("buffer pool mutex poisoned");
            if idx < lists.len() {
                lists[idx].pop()
            } else {
                None
            }
        }
        .unwrap_or_else(|| vec![0u8; class]);
        buf.truncate(len);
        buf.resize(len, 0);
        PooledBuffer {
            pool: self,
            class,
            buf: Some(buf),
        }
    }

    fn release(&self, class: usize, mut buf: Vec<u8>) {
        buf.clear();
        buf.resize(class, 0);
        let idx = class_index(class);
        let mut lists = self.free_lists.lock().expect("buffer pool mutex poisoned");
        if lists.len() <= idx {
            lists.resize_with(idx + 1, Vec::new);
        }
        lists[idx].push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer checked out from a [`BufferPool`]. Returned to its size class's
/// free-list on drop — the scoped-release contract holds on every exit
/// path, including an early `return` or a panic unwind, since this is
/// ordinary `Drop`, not a manually-paired acquire/release call.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    class: usize,
    buf: Option<Vec<u8>>,
}

impl std::ops::Deref for PooledBuffer<'_> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.buf.as_deref().expect("buffer taken before drop")
    }
}

impl std::ops::DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().expect("buffer taken before drop")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(self.class, buf);
        }
    }
}
