//! Accumulates configuration for a file that's about to be written.
//!
//! Mirrors `las::header::Builder`: per-format flags live on [`Options`], a
//! small `Copy` struct, while heap-owned data (source name, comments,
//! blobs) accumulates on the `Builder` itself.

use std::collections::HashSet;

use crate::endian::Endianness;
use crate::error::{Error, Result};
use crate::header::{Header, Options};
use crate::statsum;

/// Per-particle-record format flags, shared by every particle in a file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Options {
    /// Each particle record carries a userflags word.
    pub userflags: bool,
    /// Each particle record carries a polarisation vector.
    pub polarisation: bool,
    /// Floating point fields are stored as `f32` rather than `f64`.
    pub singleprec: bool,
    /// Nonzero: shared by every particle, not stored per-particle.
    pub universal_pdgcode: i32,
    /// `Some`: shared by every particle, not stored per-particle.
    pub universal_weight: Option<f64>,
}

impl Options {
    /// Width in bytes of one floating point field under this format.
    pub fn float_width(&self) -> usize {
        if self.singleprec {
            4
        } else {
            8
        }
    }

    /// Byte size of one particle record under this format.
    pub fn particle_size(&self) -> u32 {
        let f = self.float_width();
        let mut size = f * 3 // position
            + f * 3 // packed direction + kinetic energy
            + f; // time
        if self.universal_weight.is_none() {
            size += f;
        }
        if self.universal_pdgcode == 0 {
            size += 4;
        }
        if self.userflags {
            size += 4;
        }
        if self.polarisation {
            size += f * 3;
        }
        size as u32
    }
}

/// Accumulates a new file's header before the first particle is written.
#[derive(Debug, Clone)]
pub struct Builder {
    /// Format flags for every particle record in the file-to-be.
    pub options: Options,
    /// Byte order to write the file in.
    pub endianness: Endianness,
    /// Free-form description of where the file came from.
    pub sourcename: Vec<u8>,
    comments: Vec<Vec<u8>>,
    blobs: Vec<(Vec<u8>, Vec<u8>)>,
    blob_keys: HashSet<Vec<u8>>,
    stat_sum_keys: HashSet<String>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            options: Options::default(),
            endianness: Endianness::Little,
            sourcename: Vec::new(),
            comments: Vec::new(),
            blobs: Vec::new(),
            blob_keys: HashSet::new(),
            stat_sum_keys: HashSet::new(),
        }
    }
}

impl Builder {
    /// Creates an empty builder with default options (double precision, no
    /// polarisation, no userflags, per-particle pdgcode and weight).
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Appends a free-form comment line.
    ///
    /// If `comment` looks like a `stat:sum:<key>:<value>` entry but fails
    /// the stat:sum format rules, this only logs a warning and still
    /// stores the comment verbatim -- use [`Builder::add_stat_sum`] for a
    /// validated stat:sum entry that hard-errors instead.
    pub fn add_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        let comment = comment.into();
        if comment.contains(&0u8) {
            return Err(Error::InvalidConfig(
                "comments may not contain NUL bytes".to_string(),
            ));
        }
        if let Some(text) = std::str::from_utf8(&comment).ok() {
            if let Some(rest) = text.strip_prefix("stat:sum:") {
                if statsum::parse_entry(rest).is_none() {
                    log::warn!("malformed stat:sum comment ignored by parser: {text:?}");
                }
            }
        }
        self.comments.push(comment);
        Ok(())
    }

    /// Appends a validated `stat:sum:<key>:<value>` comment.
    ///
    /// Returns [`Error::InvalidConfig`] if `key` or `value` do not satisfy
    /// the stat:sum format rules (see [`crate::statsum`]).
    pub fn add_stat_sum(&mut self, key: &str, value: f64) -> Result<()> {
        let comment = statsum::format_entry(key, value)?;
        if !self.stat_sum_keys.insert(key.to_string()) {
            return Err(Error::InvalidConfig(format!(
                "duplicate stat:sum key {:?}",
                key
            )));
        }
        self.comments.push(format!("stat:sum:{comment}").into_bytes());
        Ok(())
    }

    /// Attaches a named binary blob. Errors if `key` has already been used.
    pub fn add_blob(&mut self, key: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Result<()> {
        let key = key.into();
        if !self.blob_keys.insert(key.clone()) {
            return Err(Error::InvalidConfig(format!(
                "duplicate blob key {:?}",
                String::from_utf8_lossy(&key)
            )));
        }
        self.blobs.push((key, data.into()));
        Ok(())
    }

    /// Finishes configuration and produces a [`Header`] with `nparticles`
    /// set to zero, ready to be frozen by a writer.
    pub fn build(self) -> Header {
        Header {
            version: 3,
            endianness: self.endianness,
            nparticles: 0,
            options: self.options,
            sourcename: self.sourcename,
            comments: self.comments,
            blobs: self.blobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_size_defaults() {
        let options = Options::default();
        // position(3) + packed dir/ekin(3) + time(1) + weight(1) + pdgcode(4 bytes fixed), all f64
        assert_eq!(options.particle_size(), 8 * 8 + 4);
    }

    #[test]
    fn particle_size_singleprec_universal() {
        let options = Options {
            singleprec: true,
            universal_pdgcode: 2112,
            universal_weight: Some(1.0),
            ..Options::default()
        };
        // position(3) + packed(3) + time(1) = 7 floats at 4 bytes, no weight/pdgcode stored
        assert_eq!(options.particle_size(), 7 * 4);
    }

    #[test]
    fn rejects_duplicate_blob_key() {
        let mut builder = Builder::new();
        builder.add_blob("geometry", vec![1, 2, 3]).unwrap();
        assert!(builder.add_blob("geometry", vec![4]).is_err());
    }

    #[test]
    fn rejects_nul_in_comment() {
        let mut builder = Builder::new();
        assert!(builder.add_comment(vec![0u8]).is_err());
    }
}
