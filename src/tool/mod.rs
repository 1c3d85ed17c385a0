//! The operations behind the `mcpltool` binary: `dump`, `extract`,
//! `merge`/`forcemerge`/`--inplace`, `repair`, the ASCII round-trip, and
//! blob extraction. Everything here is a plain library function over
//! [`crate::reader::Reader`]/[`crate::writer::Writer`] -- the binary in
//! `src/bin/mcpltool.rs` only parses arguments and formats exit codes.

pub mod ascii;
pub mod dump;
pub mod extract;
mod format;
pub mod merge;
pub mod repair;

pub use ascii::convert_to_ascii;
pub use dump::{dump_header, dump_particles};
pub use extract::{extract, extract_file, ExtractOptions};
pub use merge::{merge, merge_inplace, MergeOptions};
pub use repair::repair;

use crate::error::{Error, Result};
use crate::header::Header;

/// `mcpltool -b<key>`: writes the raw bytes of the blob named `key` to
/// `out`, or errors if the header carries no such blob.
pub fn extract_blob(header: &Header, key: &[u8], out: &mut dyn std::io::Write) -> Result<()> {
    let data = header.blob(key).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "no blob with key {:?} in this file",
            String::from_utf8_lossy(key)
        ))
    })?;
    out.write_all(data)?;
    Ok(())
}
