//! Single pre-sized byte arena with a high-water pointer.
//!
//! Ground truth: `armsrc/BigBuf.c`. The firmware declares one
//! `static uint32_t BigBuf[BIGBUF_SIZE / 4]` and hands out chunks from the top
//! down via a high-water mark (`BigBuf_hi`), rounding each request up to a
//! multiple of 4 so every returned offset stays 4-aligned. There is no free
//! list: lifetime is scoped to a malloc epoch, reset in bulk by `free_all`
//! (`BigBuf_free`) or `free_keep_em` (`BigBuf_free_keep_EM`).
//!
//! A generational, sharded-mutex arena with use-after-free detection would
//! be overkill here: BigBuf has no such requirement (§5: the firmware-like
//! core is single-threaded cooperative), so this is a single
//! `parking_lot::Mutex` guarding the epoch semantics directly — the right
//! amount of machinery for what the spec actually asks for.

use parking_lot::Mutex;

/// Default arena size in bytes, matching `BIGBUF_SIZE` in `armsrc/BigBuf.h`.
pub const BIGBUF_SIZE: usize = 40_000;

/// Size reserved for MIFARE/DESFire emulator memory, matching `CARD_MEMORY_SIZE`.
pub const CARD_MEMORY_SIZE: usize = 4096;

struct Inner {
    buf: Vec<u8>,
    /// High-water mark: bytes `[hi, buf.len())` are allocated, `[0, hi)` is free.
    hi: usize,
    /// Base offset of the emulator memory region, once reserved.
    em_base: Option<usize>,
    tracing: bool,
    trace_len: usize,
}

impl Inner {
    fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            hi: size,
            em_base: None,
            tracing: true,
            trace_len: 0,
        }
    }

    fn malloc(&mut self, chunk_size: usize) -> Option<usize> {
        let rounded = (chunk_size + 3) & !3usize;
        if rounded > self.hi {
            return None;
        }
        self.hi -= rounded;
        Some(self.hi)
    }
}

/// The arena. Cheaply cloneable (an `Arc`-free handle is not provided; callers
/// share one `BigBuf` the way firmware shares the single static array).
pub struct BigBuf {
    inner: Mutex<Inner>,
    size: usize,
}

impl BigBuf {
    /// Create a new arena of `size` bytes (rounded behavior matches
    /// `BigBuf_malloc`'s 4-byte alignment; `size` itself is not required to
    /// be 4-aligned, matching the firmware's raw byte array).
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::new(size)),
            size,
        }
    }

    /// Arena sized per `BIGBUF_SIZE`.
    #[must_use]
    pub fn with_default_size() -> Self {
        Self::new(BIGBUF_SIZE)
    }

    /// Total arena capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.size
    }

    /// `BigBuf_malloc`: allocate `chunk_size` bytes from the high end, rounded
    /// up to a multiple of 4. Returns the byte offset into the arena, or
    /// `None` when the request would push the high-water mark below the
    /// still-unallocated trace region.
    pub fn malloc(&self, chunk_size: usize) -> Option<usize> {
        self.inner.lock().malloc(chunk_size)
    }

    /// `BigBuf_get_EM_addr`: the emulator memory region, reserving it via
    /// `malloc` on first access (lazily, as the firmware does).
    pub fn em_addr(&self) -> Option<usize> {
        let mut inner = self.inner.lock();
        if inner.em_base.is_none() {
            let base = inner.malloc(CARD_MEMORY_SIZE)?;
            inner.em_base = Some(base);
        }
        inner.em_base
    }

    /// `BigBuf_max_traceLen`: the unallocated (trace-eligible) size.
    pub fn max_trace_len(&self) -> usize {
        self.inner.lock().hi
    }

    /// `BigBuf_free`: release every allocation, including the emulator region.
    pub fn free_all(&self) {
        let mut inner = self.inner.lock();
        inner.hi = self.size;
        inner.em_base = None;
    }

    /// `BigBuf_free_keep_EM`: release everything except the emulator region.
    pub fn free_keep_em(&self) {
        let mut inner = self.inner.lock();
        inner.hi = inner.em_base.unwrap_or(self.size);
    }

    /// `BigBuf_Clear`: zero the whole arena.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let len = inner.buf.len();
        inner.buf[..len].fill(0);
    }

    /// `BigBuf_Clear_EM`: zero only the emulator region, reserving it first
    /// if it hasn't been allocated yet.
    pub fn clear_em(&self) {
        let base = match self.em_addr() {
            Some(b) => b,
            None => return,
        };
        let mut inner = self.inner.lock();
        let end = (base + CARD_MEMORY_SIZE).min(inner.buf.len());
        inner.buf[base..end].fill(0);
    }

    /// Copy `data` into the arena at absolute byte `offset`. Errors if the
    /// write would run past the end of the arena (`emlSet`'s bounds check).
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<(), BigBufError> {
        let mut inner = self.inner.lock();
        let end = offset
            .checked_add(data.len())
            .ok_or(BigBufError::OutOfBounds)?;
        if end > inner.buf.len() {
            return Err(BigBufError::OutOfBounds);
        }
        inner.buf[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Read `len` bytes from absolute byte `offset`.
    pub fn read_at(&self, offset: usize, len: usize) -> Result<Vec<u8>, BigBufError> {
        let inner = self.inner.lock();
        let end = offset
            .checked_add(len)
            .ok_or(BigBufError::OutOfBounds)?;
        if end > inner.buf.len() {
            return Err(BigBufError::OutOfBounds);
        }
        Ok(inner.buf[offset..end].to_vec())
    }

    pub fn set_tracing(&self, enabled: bool) {
        self.inner.lock().tracing = enabled;
    }

    #[must_use]
    pub fn tracing(&self) -> bool {
        self.inner.lock().tracing
    }

    #[must_use]
    pub fn trace_len(&self) -> usize {
        self.inner.lock().trace_len
    }

    pub fn clear_trace(&self) {
        self.inner.lock().trace_len = 0;
    }

    /// Append raw trace bytes at the front of the arena (offset `trace_len`),
    /// disabling tracing if the write would overrun the unallocated region.
    /// Returns `false` without writing when tracing was already off or the
    /// entry does not fit, mirroring `LogTrace`'s silent-stop behavior.
    pub(crate) fn append_trace_bytes(&self, bytes: &[u8]) -> bool {
        let mut inner = self.inner.lock();
        if !inner.tracing {
            return false;
        }
        let new_len = inner.trace_len + bytes.len();
        if new_len >= inner.hi {
            inner.tracing = false;
            return false;
        }
        let start = inner.trace_len;
        inner.buf[start..new_len].copy_from_slice(bytes);
        inner.trace_len = new_len;
        true
    }

    pub(crate) fn trace_bytes(&self) -> Vec<u8> {
        let inner = self.inner.lock();
        inner.buf[..inner.trace_len].to_vec()
    }

    pub fn print_status(&self) -> String {
        let inner = self.inner.lock();
        format!(
            "Memory\n  BIGBUF_SIZE.............{}\n  Available memory........{}\nTracing\n  tracing ................{}\n  traceLen ...............{}",
            self.size, inner.hi, inner.tracing, inner.trace_len
        )
    }
}

impl Default for BigBuf {
    fn default() -> Self {
        Self::with_default_size()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BigBufError {
    #[error("write or read would run outside the arena")]
    OutOfBounds,
}
