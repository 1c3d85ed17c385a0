//! Plain and gzip-compressed byte sources and sinks.
//!
//! A source is opened without trusting its file extension: the first four
//! bytes are always inspected, and a `.gz`-named file that actually starts
//! with the `MCPL` magic is treated as uncompressed. This mirrors
//! `MCPLFile._open_file` in the original Python bindings, which does the
//! same probe before deciding whether to hand the stream to `gzip.GzipFile`.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

/// A source of MCPL bytes: either a plain file or a gzip-compressed one.
///
/// Only the `Plain` variant supports seeking; gzip streams are forward-only.
pub enum Source {
    /// An uncompressed file, openable for random access.
    Plain(BufReader<File>),
    /// A gzip-compressed file, readable only forward.
    Gzip(Box<GzDecoder<BufReader<File>>>),
}

impl Source {
    /// Opens `path`, probing its first four bytes to decide whether it's
    /// really gzip-compressed regardless of what the name suggests.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Source> {
        let mut file = BufReader::new(File::open(path)?);
        let mut magic = [0u8; 2];
        let read = read_up_to(&mut file, &mut magic)?;
        file.rewind()?;
        // Real gzip streams always start with this two-byte magic. A file
        // named `*.gz` that starts with MCPL's own `MCPL` magic instead is
        // trusted as uncompressed, matching the original bindings' fallback.
        if read == 2 && magic == [0x1f, 0x8b] {
            Ok(Source::Gzip(Box::new(GzDecoder::new(file))))
        } else {
            Ok(Source::Plain(file))
        }
    }

    /// Whether this source supports [`Seek`].
    pub fn is_seekable(&self) -> bool {
        matches!(self, Source::Plain(_))
    }

    /// Seeks a plain source to an absolute byte offset.
    ///
    /// Returns [`crate::Error::NotSeekable`] for a gzip source.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        match self {
            Source::Plain(file) => {
                file.seek(SeekFrom::Start(offset))?;
                Ok(())
            }
            Source::Gzip(_) => Err(crate::Error::NotSeekable),
        }
    }

    /// The size in bytes of the underlying file, for plain sources.
    ///
    /// Used by the reader to recover the particle count of an unclosed
    /// uncompressed file (§7 case 3).
    pub fn file_size(&mut self) -> Result<Option<u64>> {
        match self {
            Source::Plain(file) => {
                let current = file.stream_position()?;
                let size = file.seek(SeekFrom::End(0))?;
                file.seek(SeekFrom::Start(current))?;
                Ok(Some(size))
            }
            Source::Gzip(_) => Ok(None),
        }
    }
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Plain(file) => file.read(buf),
            Source::Gzip(gz) => gz.read(buf),
        }
    }
}

fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// A sink for MCPL bytes.
///
/// `Writer` (see [`crate::writer`]) only ever constructs [`Sink::Plain`],
/// since writing compressed output directly is an explicit non-goal of
/// this crate (compression is meant to be an external pass over a finished
/// plain file). [`Sink::Gzip`] exists so the byte-I/O layer is symmetric
/// and independently testable.
pub enum Sink<W: Write> {
    /// An uncompressed sink.
    Plain(W),
    /// A gzip-compressing sink.
    Gzip(GzEncoder<W>),
}

impl<W: Write> Sink<W> {
    /// Wraps `inner` as an uncompressed sink.
    pub fn plain(inner: W) -> Sink<W> {
        Sink::Plain(inner)
    }

    /// Wraps `inner` as a gzip-compressing sink at the default compression
    /// level.
    pub fn gzip(inner: W) -> Sink<W> {
        Sink::Gzip(GzEncoder::new(inner, Compression::default()))
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn plain_file_detected_despite_gz_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.mcpl.gz");
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(b"MCPLnotreallygzipped").unwrap();
        }
        let source = Source::open(&path).unwrap();
        assert!(source.is_seekable());
    }

    #[test]
    fn gzip_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.mcpl.gz");
        {
            let f = File::create(&path).unwrap();
            let mut enc = GzEncoder::new(f, Compression::default());
            enc.write_all(b"MCPL003L hello world").unwrap();
            enc.finish().unwrap();
        }
        let source = Source::open(&path).unwrap();
        assert!(!source.is_seekable());
    }
}
