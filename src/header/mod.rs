//! The friendly header type, built atop [`raw::RawHeader`].
//!
//! Mirrors how `las::Header` sits atop `las::raw::Header`: the raw type is
//! a literal byte layout, this type is what application code actually
//! works with.

mod builder;
pub mod raw;

pub use self::builder::{Builder, Options};

use std::collections::HashMap;

use crate::endian::Endianness;
use crate::error::Result;
use crate::statsum;
use raw::RawHeader;

/// A parsed MCPL file header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// `2` or `3`.
    pub version: u8,
    /// Byte order the file is stored in.
    pub endianness: Endianness,
    /// Number of particle records in the file.
    pub nparticles: u64,
    /// Per-particle-record format flags.
    pub options: Options,
    /// Free-form description of where the file came from.
    pub sourcename: Vec<u8>,
    /// Free-form metadata lines, conventionally `stat:sum:<key>:<value>`.
    pub comments: Vec<Vec<u8>>,
    /// Named binary attachments, in storage order.
    pub blobs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Header {
    /// Builds the friendly header from a parsed [`RawHeader`].
    pub fn from_raw(raw: RawHeader) -> Result<Header> {
        let options = Options {
            userflags: raw.opt_userflags,
            polarisation: raw.opt_polarisation,
            singleprec: raw.opt_singleprec,
            universal_pdgcode: raw.opt_universalpdgcode,
            universal_weight: raw.opt_universalweight,
        };
        Ok(Header {
            version: raw.version,
            endianness: raw.endianness,
            nparticles: raw.nparticles,
            options,
            sourcename: raw.sourcename,
            comments: raw.comments,
            blobs: raw.blobs,
        })
    }

    /// Converts back to the byte-exact representation for writing.
    pub fn to_raw(&self) -> RawHeader {
        RawHeader {
            version: self.version,
            endianness: self.endianness,
            nparticles: self.nparticles,
            opt_userflags: self.options.userflags,
            opt_polarisation: self.options.polarisation,
            opt_singleprec: self.options.singleprec,
            opt_universalpdgcode: self.options.universal_pdgcode,
            particlesize: self.options.particle_size(),
            opt_universalweight: self.options.universal_weight,
            sourcename: self.sourcename.clone(),
            comments: self.comments.clone(),
            blobs: self.blobs.clone(),
        }
    }

    /// Byte size of one particle record.
    pub fn particle_size(&self) -> u32 {
        self.options.particle_size()
    }

    /// Byte offset of the first particle record.
    pub fn header_size(&self) -> u64 {
        self.to_raw().header_size()
    }

    /// The source name as text, replacing invalid UTF-8 with the
    /// replacement character.
    pub fn sourcename_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.sourcename)
    }

    /// The comments as text, replacing invalid UTF-8 with the replacement
    /// character.
    pub fn comments_str(&self) -> Vec<std::borrow::Cow<'_, str>> {
        self.comments
            .iter()
            .map(|c| String::from_utf8_lossy(c))
            .collect()
    }

    /// Parses every `stat:sum:<key>:<value>` comment into a map.
    ///
    /// A key whose value fails to parse is still present in the map, with
    /// a `None` payload -- "the key becomes opaque" rather than being
    /// dropped, matching the original bindings' `stat_sum` property.
    pub fn stat_sum(&self) -> HashMap<String, Option<f64>> {
        let mut map = HashMap::new();
        for comment in self.comments_str() {
            if let Some(rest) = comment.strip_prefix("stat:sum:") {
                if let Some((key, value)) = rest.split_once(':') {
                    let parsed = statsum::parse_value(value);
                    map.insert(key.to_string(), parsed);
                }
            }
        }
        map
    }

    /// Blob keys in storage order.
    pub fn blob_storage_order(&self) -> Vec<&[u8]> {
        self.blobs.iter().map(|(k, _)| k.as_slice()).collect()
    }

    /// Looks up a blob by key.
    pub fn blob(&self, key: &[u8]) -> Option<&[u8]> {
        self.blobs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }
}
