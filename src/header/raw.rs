//! The byte-exact MCPL header: magic, version, endianness, and every field
//! that follows them, in file order. This mirrors the structure (and the
//! `read_from`/`write_to` naming) of a LAS header codec, but the layout
//! itself -- and the order fields must appear in -- comes from
//! `MCPLFile._loadhdr` in the original Python bindings, the most precise
//! available description of the wire format.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::endian::Endianness;
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"MCPL";

/// One length-prefixed, arbitrary-bytes field: a 4-byte little/file-endian
/// length followed by that many bytes. Used for the source name, each
/// comment, and each blob key/value.
fn read_blob<R: Read>(r: &mut R, endianness: Endianness) -> Result<Vec<u8>> {
    let len = endianness.read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated {
                expected: len,
                actual: 0,
            }
        } else {
            Error::Io(e)
        }
    })?;
    Ok(buf)
}

fn write_blob<W: Write>(w: &mut W, endianness: Endianness, data: &[u8]) -> Result<()> {
    endianness.write_u32(w, data.len() as u32)?;
    w.write_all(data)?;
    Ok(())
}

/// The raw, byte-exact MCPL header.
///
/// Field order here is also file order. `blobs` keeps keys and values
/// paired for convenience, but [`RawHeader::write_to`] writes all keys
/// before all values, matching the on-disk layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeader {
    /// `2` or `3`. Version `2` can only be read, never written.
    pub version: u8,
    /// Byte order of every field after the endianness marker itself.
    pub endianness: Endianness,
    /// Number of particle records in the file.
    pub nparticles: u64,
    /// Whether each particle record carries a per-particle userflags word.
    pub opt_userflags: bool,
    /// Whether each particle record carries a polarisation vector.
    pub opt_polarisation: bool,
    /// Whether floating point fields are stored as `f32` (`true`) or `f64`.
    pub opt_singleprec: bool,
    /// Nonzero: every particle shares this PDG code, which is not stored
    /// per-particle. Zero: the PDG code is stored per-particle.
    pub opt_universalpdgcode: i32,
    /// Byte size of one particle record, as declared in the header.
    pub particlesize: u32,
    /// `Some(w)`: every particle shares weight `w`, not stored per-particle.
    /// `None`: weight is stored per-particle.
    pub opt_universalweight: Option<f64>,
    /// Free-form description of where the file came from.
    pub sourcename: Vec<u8>,
    /// Free-form metadata lines, conventionally `stat:sum:<key>:<value>`.
    pub comments: Vec<Vec<u8>>,
    /// Named binary attachments, in storage order.
    pub blobs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RawHeader {
    /// Reads a header, including the magic/version/endianness prefix, from
    /// `read`.
    pub fn read_from<R: Read>(mut read: R) -> Result<RawHeader> {
        let mut magic = [0u8; 4];
        read.read_exact(&mut magic)
            .map_err(|_| Error::InvalidHeader("file too short for magic bytes".to_string()))?;
        if &magic != MAGIC {
            return Err(Error::InvalidHeader(format!(
                "bad magic bytes {:?}, expected {:?}",
                magic, MAGIC
            )));
        }

        let mut version_digits = [0u8; 3];
        read.read_exact(&mut version_digits)
            .map_err(|_| Error::InvalidHeader("file too short for version".to_string()))?;
        let version = parse_version(&version_digits)?;

        let marker = read.read_u8()?;
        let endianness = Endianness::from_marker(marker)
            .ok_or_else(|| Error::InvalidHeader(format!("bad endianness marker {:?}", marker)))?;

        let nparticles = endianness.read_u64(&mut read)?;
        let ncomments = endianness.read_u32(&mut read)?;
        let nblobs = endianness.read_u32(&mut read)?;
        let opt_userflags = endianness.read_u32(&mut read)? != 0;
        let opt_polarisation = endianness.read_u32(&mut read)? != 0;
        let opt_singleprec = endianness.read_u32(&mut read)? != 0;
        let opt_universalpdgcode = endianness.read_i32(&mut read)?;
        let particlesize = endianness.read_u32(&mut read)?;
        let has_universal_weight = endianness.read_u32(&mut read)? != 0;
        let opt_universalweight = if has_universal_weight {
            Some(endianness.read_f64(&mut read)?)
        } else {
            None
        };

        let sourcename = read_blob(&mut read, endianness)?;

        let mut comments = Vec::with_capacity(ncomments as usize);
        for _ in 0..ncomments {
            comments.push(read_blob(&mut read, endianness)?);
        }

        let mut blob_keys = Vec::with_capacity(nblobs as usize);
        for _ in 0..nblobs {
            blob_keys.push(read_blob(&mut read, endianness)?);
        }
        let mut blobs = Vec::with_capacity(nblobs as usize);
        for key in blob_keys {
            let value = read_blob(&mut read, endianness)?;
            blobs.push((key, value));
        }

        Ok(RawHeader {
            version,
            endianness,
            nparticles,
            opt_userflags,
            opt_polarisation,
            opt_singleprec,
            opt_universalpdgcode,
            particlesize,
            opt_universalweight,
            sourcename,
            comments,
            blobs,
        })
    }

    /// Writes this header, including the magic/version/endianness prefix,
    /// to `write`. Always writes version `3`, since version `2` is
    /// decoder-only.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_all(MAGIC)?;
        write.write_all(b"003")?;
        write.write_u8(self.endianness.marker())?;

        let endianness = self.endianness;
        endianness.write_u64(&mut write, self.nparticles)?;
        endianness.write_u32(&mut write, self.comments.len() as u32)?;
        endianness.write_u32(&mut write, self.blobs.len() as u32)?;
        endianness.write_u32(&mut write, self.opt_userflags as u32)?;
        endianness.write_u32(&mut write, self.opt_polarisation as u32)?;
        endianness.write_u32(&mut write, self.opt_singleprec as u32)?;
        endianness.write_i32(&mut write, self.opt_universalpdgcode)?;
        endianness.write_u32(&mut write, self.particlesize)?;
        endianness.write_u32(&mut write, self.opt_universalweight.is_some() as u32)?;
        if let Some(w) = self.opt_universalweight {
            endianness.write_f64(&mut write, w)?;
        }

        write_blob(&mut write, endianness, &self.sourcename)?;
        for comment in &self.comments {
            write_blob(&mut write, endianness, comment)?;
        }
        for (key, _) in &self.blobs {
            write_blob(&mut write, endianness, key)?;
        }
        for (_, value) in &self.blobs {
            write_blob(&mut write, endianness, value)?;
        }

        Ok(())
    }

    /// The total size in bytes of the encoded header, i.e. the byte offset
    /// at which the first particle record begins.
    pub fn header_size(&self) -> u64 {
        let mut size: u64 = 8 // magic + version + endian marker
            + 8 // nparticles
            + 4 + 4 // ncomments, nblobs
            + 4 + 4 + 4 // userflags, polarisation, singleprec
            + 4 // universalpdgcode
            + 4 // particlesize
            + 4; // has_universal_weight flag
        if self.opt_universalweight.is_some() {
            size += 8;
        }
        size += 4 + self.sourcename.len() as u64;
        for comment in &self.comments {
            size += 4 + comment.len() as u64;
        }
        for (key, value) in &self.blobs {
            size += 4 + key.len() as u64;
            size += 4 + value.len() as u64;
        }
        size
    }
}

fn parse_version(digits: &[u8; 3]) -> Result<u8> {
    let s = std::str::from_utf8(digits)
        .map_err(|_| Error::InvalidHeader("version digits are not ASCII".to_string()))?;
    let version: u8 = s
        .parse()
        .map_err(|_| Error::InvalidHeader(format!("version digits {:?} are not numeric", s)))?;
    match version {
        2 | 3 => Ok(version),
        other => Err(Error::InvalidHeader(format!(
            "unsupported format version {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawHeader {
        RawHeader {
            version: 3,
            endianness: Endianness::Little,
            nparticles: 42,
            opt_userflags: true,
            opt_polarisation: false,
            opt_singleprec: true,
            opt_universalpdgcode: 2112,
            particlesize: 24,
            opt_universalweight: Some(1.0),
            sourcename: b"mymcgenerator".to_vec(),
            comments: vec![b"stat:sum:nprimaries:1.5e6".to_vec()],
            blobs: vec![(b"geometry".to_vec(), b"\x00\x01\x02".to_vec())],
        }
    }

    fn write_read(header: &RawHeader) -> RawHeader {
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, header.header_size());
        RawHeader::read_from(std::io::Cursor::new(buf)).unwrap()
    }

    #[test]
    fn roundtrip() {
        let header = sample();
        let read_back = write_read(&header);
        let mut expected = header;
        expected.version = 3; // write_to always emits version 3
        assert_eq!(expected, read_back);
    }

    #[test]
    fn roundtrip_big_endian() {
        let mut header = sample();
        header.endianness = Endianness::Big;
        let read_back = write_read(&header);
        assert_eq!(header, read_back);
    }

    #[test]
    fn roundtrip_no_universal_fields() {
        let mut header = sample();
        header.opt_universalpdgcode = 0;
        header.opt_universalweight = None;
        let read_back = write_read(&header);
        assert_eq!(header, read_back);
    }

    #[test]
    fn bad_magic() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"NOPE003L");
        let err = RawHeader::read_from(std::io::Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn bad_version() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"MCPL999L");
        let err = RawHeader::read_from(std::io::Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn bad_endianness_marker() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"MCPL003X");
        let err = RawHeader::read_from(std::io::Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn truncated_blob() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"MCPL003L");
        Endianness::Little
            .write_u64(&mut buf, 0)
            .unwrap();
        for _ in 0..8 {
            Endianness::Little.write_u32(&mut buf, 0).unwrap();
        }
        Endianness::Little.write_u32(&mut buf, 100).unwrap(); // claims 100 bytes
        buf.extend_from_slice(b"short");
        let err = RawHeader::read_from(std::io::Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
