//! Recovers an uncompressed file whose `nparticles` field was never
//! patched because the process that wrote it never reached
//! [`crate::writer::Writer::close`] (a crash, a non-seekable sink that
//! could only call `finish`, etc).

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};
use crate::header::raw::RawHeader;

/// Byte offset of the `nparticles` field, constant across every header.
const NPARTICLES_OFFSET: u64 = 8;

/// Rewrites `nparticles` in place for a truncated-looking uncompressed
/// MCPL file, returning the recovered count.
///
/// Fails with [`Error::UnclosedFile`] (`recoverable: false`) for a
/// gzip-compressed file -- the true extent of a gzip stream can't be
/// determined without decompressing it in full, which this function does
/// not do. Fails with [`Error::NotBroken`] if the header's declared
/// particle count already matches the file size.
pub fn repair<P: AsRef<Path>>(path: P) -> Result<u64> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let mut magic_probe = [0u8; 2];
    let probed = {
        let mut total = 0;
        while total < magic_probe.len() {
            match file.read(&mut magic_probe[total..])? {
                0 => break,
                n => total += n,
            }
        }
        total
    };
    file.seek(SeekFrom::Start(0))?;
    if probed == 2 && magic_probe == [0x1f, 0x8b] {
        return Err(Error::UnclosedFile { recoverable: false });
    }

    let raw = RawHeader::read_from(&mut file)?;
    let data_start = raw.header_size();
    let particle_size = raw.particlesize as u64;
    let file_size = file.metadata()?.len();

    if raw.nparticles != 0 {
        let expected = data_start + raw.nparticles * particle_size;
        if expected == file_size {
            return Err(Error::NotBroken);
        }
        return Err(Error::InvalidConfig(
            "recorded particle count is nonzero but inconsistent with file size; \
             only files with a recorded count of zero are repairable"
                .to_string(),
        ));
    }

    let remainder = file_size.saturating_sub(data_start);
    if remainder == 0 {
        return Err(Error::NotBroken);
    }
    if particle_size == 0 || remainder % particle_size != 0 {
        return Err(Error::InvalidHeader(format!(
            "file size {} is not consistent with a whole number of {}-byte particle records after the {}-byte header",
            file_size, particle_size, data_start
        )));
    }
    let recovered = remainder / particle_size;

    file.seek(SeekFrom::Start(NPARTICLES_OFFSET))?;
    raw.endianness.write_u64(&mut file, recovered)?;
    Ok(recovered)
}
