//! Writes MCPL files.
//!
//! The header is written immediately (with a placeholder particle count)
//! the first time a particle is written -- "freezing" the format options,
//! source name, comments and blobs against further changes, mirroring
//! `las::Writer`'s `freeze_header` behavior. [`Writer::close`] (only
//! available when the sink is [`Seek`]) patches in the true particle
//! count; [`Writer::finish`] (available for any sink) does not, leaving
//! the file for a later [`crate::tool::repair`] pass or a [`Reader`]'s
//! own size-based recovery to fix up, matching the non-seekable-sink
//! behavior called for in §4.6.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;
use crate::header::{Builder, Header};
use crate::particle::{write_particle, Particle};

/// Byte offset of the `nparticles` field within the header, constant
/// across every file (right after the 8-byte magic/version/endian prefix).
const NPARTICLES_OFFSET: u64 = 8;

/// A writer for a new MCPL file.
pub struct Writer<W: Write> {
    sink: W,
    header: Header,
    particle_count: u64,
    frozen: bool,
}

impl Writer<File> {
    /// Creates a new file at `path` and prepares to write particles with
    /// default options. Use [`Writer::from_builder`] for non-default
    /// options (userflags, polarisation, single precision, universal
    /// pdgcode/weight).
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        Writer::from_builder(Builder::new(), File::create(path)?)
    }
}

impl<W: Write> Writer<W> {
    /// Builds a writer from an accumulated [`Builder`] and an arbitrary
    /// sink. The header is written to `sink` immediately, with a
    /// placeholder particle count.
    pub fn from_builder(builder: Builder, mut sink: W) -> Result<Writer<W>> {
        let header = builder.build();
        header.to_raw().write_to(&mut sink)?;
        Ok(Writer {
            sink,
            header,
            particle_count: 0,
            frozen: true,
        })
    }

    /// The header as it will be written (or already has been, since it's
    /// frozen as soon as the writer is constructed).
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Writes one particle record.
    pub fn write_particle(&mut self, particle: &Particle) -> Result<()> {
        debug_assert!(self.frozen, "header is always frozen by construction");
        write_particle(&mut self.sink, self.header.endianness, &self.header.options, particle)?;
        self.particle_count += 1;
        Ok(())
    }

    /// Writes every particle from an iterator.
    pub fn write_particles<I>(&mut self, particles: I) -> Result<()>
    where
        I: IntoIterator<Item = Particle>,
    {
        for particle in particles {
            self.write_particle(&particle)?;
        }
        Ok(())
    }

    /// Flushes and returns the sink without patching the true particle
    /// count into the header. The resulting file looks "unclosed" -- a
    /// [`crate::reader::Reader`] opening it will recover the count from
    /// the file's size if the sink is later read back as a seekable file,
    /// or a [`crate::tool::repair`] pass can fix it up directly.
    pub fn finish(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Flushes, patches the true particle count into the header, and
    /// returns the sink.
    pub fn close(mut self) -> Result<W> {
        self.sink.flush()?;
        let end = self.sink.stream_position()?;
        self.sink.seek(SeekFrom::Start(NPARTICLES_OFFSET))?;
        self.header
            .endianness
            .write_u64(&mut self.sink, self.particle_count)?;
        self.sink.seek(SeekFrom::Start(end))?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use std::io::Cursor;

    #[test]
    fn close_patches_particle_count() {
        let mut builder = Builder::new();
        builder.sourcename = b"test".to_vec();
        let mut writer = Writer::from_builder(builder, Cursor::new(Vec::new())).unwrap();
        for _ in 0..7 {
            writer.write_particle(&Particle::default()).unwrap();
        }
        let mut cursor = writer.close().unwrap();
        cursor.set_position(0);
        let raw = crate::header::raw::RawHeader::read_from(&mut cursor).unwrap();
        assert_eq!(raw.nparticles, 7);
    }

    #[test]
    fn finish_leaves_count_unpatched_but_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unclosed.mcpl");
        let mut writer = Writer::create(&path).unwrap();
        for _ in 0..4 {
            writer.write_particle(&Particle::default()).unwrap();
        }
        // Deliberately use finish() instead of close() to simulate a sink
        // that couldn't be seeked back into, then reopen normally: the
        // file on disk is still seekable, so Reader recovers the count.
        let file = writer.finish().unwrap();
        drop(file);

        let reader = Reader::open(&path).unwrap();
        assert_eq!(reader.header().nparticles, 4);
    }
}
