use crate::error::{Result, SolverError};
use memmap2::Mmap;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Byte that ends a statement in the dump notation
pub const STATEMENT_TERMINATOR: u8 = b';';

/// Default cap on buffered statement bytes before a forced flush
pub const DEFAULT_MAX_STATEMENT_LEN: usize = 64 * 1024;

/// How the dataset file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Stream through a `BufReader`
    #[default]
    Buffered,
    /// Memory-map the file and stream over the mapped bytes
    Mmap,
}

/// Configuration for a streaming scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Buffered bytes allowed without a terminator before the buffer is flushed
    pub max_statement_len: usize,

    /// How the source file is opened
    pub load_mode: LoadMode,

    /// Optional ceiling on statements examined by a single query scan
    pub max_statements: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_statement_len: DEFAULT_MAX_STATEMENT_LEN,
            load_mode: LoadMode::Buffered,
            max_statements: None,
        }
    }
}

// ============================================================================
// Source readers
// ============================================================================

/// Reader over a memory-mapped file
pub struct MappedReader {
    mmap: Mmap,
    position: usize,
}

impl Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.mmap[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl BufRead for MappedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.position..])
    }

    fn consume(&mut self, amt: usize) {
        self.position = (self.position + amt).min(self.mmap.len());
    }
}

/// Dataset reader, either buffered or memory-mapped
pub enum SourceReader {
    Buffered(BufReader<File>),
    Mapped(MappedReader),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::Buffered(r) => r.read(buf),
            SourceReader::Mapped(r) => r.read(buf),
        }
    }
}

impl BufRead for SourceReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            SourceReader::Buffered(r) => r.fill_buf(),
            SourceReader::Mapped(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            SourceReader::Buffered(r) => r.consume(amt),
            SourceReader::Mapped(r) => r.consume(amt),
        }
    }
}

/// Open the dataset at `path` and return its statement stream
pub fn open_statements(path: &Path, config: &ScanConfig) -> Result<Statements<SourceReader>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SolverError::SourceNotFound(path.display().to_string()),
        _ => SolverError::from(e),
    })?;
    let reader = match config.load_mode {
        // Zero-length files cannot be mapped on every platform
        LoadMode::Mmap if file.metadata()?.len() > 0 => {
            let mmap = unsafe { Mmap::map(&file)? };
            SourceReader::Mapped(MappedReader { mmap, position: 0 })
        }
        _ => SourceReader::Buffered(BufReader::new(file)),
    };

    Ok(Statements::new(reader, config.max_statement_len))
}

// ============================================================================
// Statement tokenizer
// ============================================================================

/// Iterator that yields terminator-delimited statements from a byte stream
///
/// Physical lines are joined (line breaks dropped) until a terminator shows
/// up, then every complete statement in the buffer is emitted and only the
/// trailing remainder is kept. A buffer that grows past `max_len` without a
/// terminator is flushed whole. Reads are capped at `max_len` bytes, so the
/// buffer never holds more than twice that.
///
/// Statements are trimmed and empty ones are skipped. Bytes are decoded
/// lossily when a statement is emitted.
///
/// A read error ends the stream and drops the partially read buffer. The
/// error is kept; check [`Statements::take_error`] once iteration stops to
/// tell a failed read from end of input.
pub struct Statements<R> {
    reader: R,
    buffer: Vec<u8>,
    chunk: Vec<u8>,
    pending: VecDeque<String>,
    max_len: usize,
    forced_flushes: usize,
    high_water_mark: usize,
    finished: bool,
    error: Option<io::Error>,
}

impl<R: BufRead> Statements<R> {
    pub fn new(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            chunk: Vec::new(),
            pending: VecDeque::new(),
            max_len: max_len.max(1),
            forced_flushes: 0,
            high_water_mark: 0,
            finished: false,
            error: None,
        }
    }

    /// Number of times the buffer was flushed without a terminator
    pub fn forced_flushes(&self) -> usize {
        self.forced_flushes
    }

    /// Largest number of bytes ever held in the statement buffer
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// The read error that ended the stream, if any
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Read one physical line into `chunk`, stopping early at `max_len` bytes.
    /// Returns false at end of stream.
    fn read_chunk(&mut self) -> io::Result<bool> {
        self.chunk.clear();

        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(!self.chunk.is_empty());
            }

            let room = self.max_len - self.chunk.len();
            let window = &available[..available.len().min(room)];

            let (take, saw_newline) = match window.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (window.len(), false),
            };

            self.chunk.extend_from_slice(&window[..take]);
            self.reader.consume(take);

            if saw_newline || self.chunk.len() >= self.max_len {
                return Ok(true);
            }
        }
    }

    /// Append the current chunk to the buffer without its line break
    fn absorb_chunk(&mut self) -> bool {
        let mut line = &self.chunk[..];
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped.strip_suffix(b"\r").unwrap_or(stripped);
        }

        let has_terminator = line.contains(&STATEMENT_TERMINATOR);
        self.buffer.extend_from_slice(line);
        self.high_water_mark = self.high_water_mark.max(self.buffer.len());
        has_terminator
    }

    /// Move every complete statement out of the buffer, keeping the remainder
    fn split_complete(&mut self) {
        let mut start = 0;
        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|&b| b == STATEMENT_TERMINATOR)
        {
            let end = start + offset + 1;
            push_statement(&mut self.pending, &self.buffer[start..end]);
            start = end;
        }
        self.buffer.drain(..start);
    }

    fn flush_all(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        push_statement(&mut self.pending, &buffer);
    }
}

fn push_statement(pending: &mut VecDeque<String>, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        pending.push_back(trimmed.to_string());
    }
}

impl<R: BufRead> Iterator for Statements<R> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(statement) = self.pending.pop_front() {
                return Some(statement);
            }

            if self.finished {
                return None;
            }

            match self.read_chunk() {
                Ok(true) => {
                    if self.absorb_chunk() {
                        self.split_complete();
                    }

                    if self.buffer.len() > self.max_len {
                        log::debug!(
                            "Statement buffer exceeded {} bytes without a terminator, flushing",
                            self.max_len
                        );
                        self.forced_flushes += 1;
                        self.flush_all();
                    }
                }
                Ok(false) => {
                    self.finished = true;
                    self.flush_all();
                }
                Err(e) => {
                    log::warn!("Read error while scanning statements: {e}");
                    self.finished = true;
                    self.buffer.clear();
                    self.error = Some(e);
                }
            }
        }
    }
}
