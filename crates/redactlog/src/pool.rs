//! Reusable byte buffers for response capture.

use bytes::BytesMut;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

/// Default number of idle buffers kept for reuse.
pub const DEFAULT_MAX_BUFFERS: usize = 64;

/// Default capacity above which a returned buffer is dropped instead of kept.
pub const DEFAULT_MAX_CAPACITY: usize = 64 * 1024;

const INITIAL_CAPACITY: usize = 4 * 1024;

struct Shared {
    idle: Mutex<Vec<BytesMut>>,
    max_buffers: usize,
    max_capacity: usize,
}

impl Shared {
    fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > self.max_capacity {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_buffers {
            idle.push(buf);
        }
    }
}

/// Pool of byte buffers shared by all in-flight requests.
///
/// Cloning shares the same pool.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<Shared>,
}

impl BufferPool {
    /// Pool with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_BUFFERS, DEFAULT_MAX_CAPACITY)
    }

    /// Pool keeping at most `max_buffers` idle buffers of at most
    /// `max_capacity` bytes each
    pub fn with_limits(max_buffers: usize, max_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::new()),
                max_buffers,
                max_capacity,
            }),
        }
    }

    /// Take an empty buffer out of the pool, allocating if none is idle.
    pub fn acquire(&self) -> PooledBuffer {
        let recycled = self
            .shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let mut buf = recycled.unwrap_or_else(|| {
            BytesMut::with_capacity(INITIAL_CAPACITY.min(self.shared.max_capacity))
        });
        buf.clear();
        PooledBuffer {
            buf,
            pool: self.shared.clone(),
        }
    }

    /// Number of idle buffers currently held
    pub fn idle(&self) -> usize {
        self.shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("max_buffers", &self.shared.max_buffers)
            .field("max_capacity", &self.shared.max_capacity)
            .finish()
    }
}

/// Buffer checked out of a [`BufferPool`].
///
/// Goes back to the pool when dropped, whether the request finished normally
/// or its task unwound.
pub struct PooledBuffer {
    buf: BytesMut,
    pool: Arc<Shared>,
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
