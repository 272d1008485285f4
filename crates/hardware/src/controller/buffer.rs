//! Bounded FIFO request buffers.
//!
//! Buffers own their requests; a request lives in exactly one buffer (or the
//! controller's pending deque) at a time. Indices are positional and only
//! valid until the next mutation.

use std::collections::VecDeque;

use crate::request::Request;

/// A bounded FIFO of requests.
#[derive(Debug)]
pub struct ReqBuffer {
    reqs: VecDeque<Request>,
    max_size: usize,
}

impl ReqBuffer {
    /// Creates a buffer with the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            reqs: VecDeque::with_capacity(max_size.min(64)),
            max_size,
        }
    }

    /// Number of queued requests.
    #[inline]
    pub fn len(&self) -> usize {
        self.reqs.len()
    }

    /// True when no requests are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reqs.is_empty()
    }

    /// Capacity of this buffer.
    #[inline]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// True when another request can be admitted.
    #[inline]
    pub fn has_space(&self) -> bool {
        self.reqs.len() < self.max_size
    }

    /// Enqueues a request, handing it back when the buffer is full.
    pub fn enqueue(&mut self, req: Request) -> Result<(), Request> {
        if self.has_space() {
            self.reqs.push_back(req);
            Ok(())
        } else {
            Err(req)
        }
    }

    /// Removes and returns the request at `idx`.
    ///
    /// # Panics
    ///
    /// Panics when `idx` is out of bounds; indices come from the scheduler
    /// within the same tick.
    pub fn remove(&mut self, idx: usize) -> Request {
        match self.reqs.remove(idx) {
            Some(req) => req,
            None => unreachable!("buffer index {idx} out of bounds"),
        }
    }

    /// The request at `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> &Request {
        &self.reqs[idx]
    }

    /// Mutable access to the request at `idx`.
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut Request {
        &mut self.reqs[idx]
    }

    /// Iterates the queued requests front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.reqs.iter()
    }

    /// Mutable iteration front to back.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Request> {
        self.reqs.iter_mut()
    }
}
