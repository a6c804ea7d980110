/// Destinations for formatted bytes.
///
/// The format engine only ever pushes single bytes. A [`MemorySink`] keeps
/// them inside a caller-provided buffer and terminates it, a [`StreamSink`]
/// caches them and hands complete lines (or full caches) to a
/// [`FlushHandler`], and a `Vec<u8>` simply grows.

/// Byte destination driven by the format engine.
pub trait Sink {
    fn write_byte(&mut self, byte: u8);

    fn write_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Called once after a complete expansion.
    fn finish(&mut self) {}
}

impl Sink for Vec<u8> {
    #[inline(always)]
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn write_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Bounded sink over a borrowed buffer.
///
/// Bytes past the end of the buffer are dropped. [`Sink::finish`] writes a
/// terminating zero at the cursor, or over the last byte when the buffer is
/// full, so the result is always terminated inside the bound (an empty
/// buffer is left untouched).
pub struct MemorySink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> MemorySink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes stored so far, excluding the terminator.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

impl Sink for MemorySink<'_> {
    #[inline(always)]
    fn write_byte(&mut self, byte: u8) {
        if let Some(slot) = self.buf.get_mut(self.pos) {
            *slot = byte;
            self.pos += 1;
        }
    }

    fn finish(&mut self) {
        let end = self.buf.len();
        if self.pos < end {
            self.buf[self.pos] = 0;
        } else if end > 0 {
            self.buf[end - 1] = 0;
            self.pos = end - 1;
        }
    }
}

/// Receives the cached bytes of a [`StreamSink`].
///
/// The slice is only valid for the duration of the call; the sink reuses
/// its cache as soon as the handler returns. Handlers do their own I/O and
/// the sink never retries a short write.
pub trait FlushHandler {
    fn handle_flush(&mut self, bytes: &[u8]);
}

impl<F> FlushHandler for F
where
    F: FnMut(&[u8]),
{
    fn handle_flush(&mut self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Line-oriented sink with a fixed cache of `CAP` bytes.
///
/// The cache is handed to the handler whenever it fills up or a `\n` is
/// written. Bytes after the last line break stay cached until the next
/// trigger or an explicit [`StreamSink::flush`].
pub struct StreamSink<const CAP: usize, H: FlushHandler> {
    cache: [u8; CAP],
    pos: usize,
    handler: H,
}

impl<const CAP: usize, H: FlushHandler> StreamSink<CAP, H> {
    pub fn new(handler: H) -> Self {
        debug_assert!(CAP > 0, "stream sink needs a non-empty cache");
        Self {
            cache: [0u8; CAP],
            pos: 0,
            handler,
        }
    }

    /// Hands any pending bytes to the handler.
    pub fn flush(&mut self) {
        if self.pos > 0 {
            self.handler.handle_flush(&self.cache[..self.pos]);
            self.pos = 0;
        }
    }

    /// Bytes waiting for the next flush trigger.
    pub fn pending(&self) -> &[u8] {
        &self.cache[..self.pos]
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(mut self) -> H {
        self.flush();
        self.handler
    }
}

impl<const CAP: usize, H: FlushHandler> Sink for StreamSink<CAP, H> {
    fn write_byte(&mut self, byte: u8) {
        if self.pos < CAP {
            self.cache[self.pos] = byte;
            self.pos += 1;
        }
        if self.pos == CAP || byte == b'\n' {
            self.handler.handle_flush(&self.cache[..self.pos]);
            self.pos = 0;
        }
    }
}
