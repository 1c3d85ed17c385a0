//! Runtime-selected byte order.
//!
//! Unlike most binary formats this crate's teacher deals with (which fix
//! their endianness at the format level), MCPL records its endianness as a
//! one-byte marker inside every file, so the order to use for every other
//! field is only known once that marker has been read. [`Endianness`]
//! dispatches to `byteorder`'s `LittleEndian`/`BigEndian` marker types with
//! a `match` rather than a generic parameter for exactly that reason.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Byte order of a particular MCPL file, read from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least-significant byte first. Marker character `'L'`.
    Little,
    /// Most-significant byte first. Marker character `'B'`.
    Big,
}

impl Endianness {
    /// Decodes the one-byte endianness marker used right after the version
    /// digits in the file header.
    pub fn from_marker(marker: u8) -> Option<Endianness> {
        match marker {
            b'L' => Some(Endianness::Little),
            b'B' => Some(Endianness::Big),
            _ => None,
        }
    }

    /// The marker byte this endianness is written as.
    pub fn marker(self) -> u8 {
        match self {
            Endianness::Little => b'L',
            Endianness::Big => b'B',
        }
    }

    pub(crate) fn read_u32<R: Read>(self, r: &mut R) -> io::Result<u32> {
        match self {
            Endianness::Little => r.read_u32::<LittleEndian>(),
            Endianness::Big => r.read_u32::<BigEndian>(),
        }
    }

    pub(crate) fn read_u64<R: Read>(self, r: &mut R) -> io::Result<u64> {
        match self {
            Endianness::Little => r.read_u64::<LittleEndian>(),
            Endianness::Big => r.read_u64::<BigEndian>(),
        }
    }

    pub(crate) fn read_i32<R: Read>(self, r: &mut R) -> io::Result<i32> {
        match self {
            Endianness::Little => r.read_i32::<LittleEndian>(),
            Endianness::Big => r.read_i32::<BigEndian>(),
        }
    }

    pub(crate) fn read_f32<R: Read>(self, r: &mut R) -> io::Result<f32> {
        match self {
            Endianness::Little => r.read_f32::<LittleEndian>(),
            Endianness::Big => r.read_f32::<BigEndian>(),
        }
    }

    pub(crate) fn read_f64<R: Read>(self, r: &mut R) -> io::Result<f64> {
        match self {
            Endianness::Little => r.read_f64::<LittleEndian>(),
            Endianness::Big => r.read_f64::<BigEndian>(),
        }
    }

    pub(crate) fn write_u32<W: Write>(self, w: &mut W, v: u32) -> io::Result<()> {
        match self {
            Endianness::Little => w.write_u32::<LittleEndian>(v),
            Endianness::Big => w.write_u32::<BigEndian>(v),
        }
    }

    pub(crate) fn write_u64<W: Write>(self, w: &mut W, v: u64) -> io::Result<()> {
        match self {
            Endianness::Little => w.write_u64::<LittleEndian>(v),
            Endianness::Big => w.write_u64::<BigEndian>(v),
        }
    }

    pub(crate) fn write_i32<W: Write>(self, w: &mut W, v: i32) -> io::Result<()> {
        match self {
            Endianness::Little => w.write_i32::<LittleEndian>(v),
            Endianness::Big => w.write_i32::<BigEndian>(v),
        }
    }

    pub(crate) fn write_f32<W: Write>(self, w: &mut W, v: f32) -> io::Result<()> {
        match self {
            Endianness::Little => w.write_f32::<LittleEndian>(v),
            Endianness::Big => w.write_f32::<BigEndian>(v),
        }
    }

    pub(crate) fn write_f64<W: Write>(self, w: &mut W, v: f64) -> io::Result<()> {
        match self {
            Endianness::Little => w.write_f64::<LittleEndian>(v),
            Endianness::Big => w.write_f64::<BigEndian>(v),
        }
    }
}
