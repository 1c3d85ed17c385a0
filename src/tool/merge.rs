//! Concatenates the particle streams of two or more files into a fresh
//! output, or appends them onto an existing one in place.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::header::{raw::RawHeader, Builder, Header, Options};
use crate::particle::write_particle;
use crate::reader::Reader;
use crate::statsum;
use crate::writer::Writer;

/// Byte offset of the `nparticles` field, constant across every header.
const NPARTICLES_OFFSET: u64 = 8;

/// Switches that loosen the rules [`merge`]/[`merge_inplace`] otherwise
/// enforce.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Allow merging inputs whose floating-point precision differs
    /// (the output is downgraded to double precision) instead of failing.
    pub forcemerge: bool,
    /// Keep per-particle userflags in the output even if some (but not
    /// all) inputs lack them, zero-filling the particles that don't have
    /// them. Without this, userflags only survive if every input has them.
    pub keepuserflags: bool,
}

/// Merges `sources` (at least two) into a freshly created file at `dest`.
/// Returns the total number of particles written.
pub fn merge(dest: &Path, sources: &[PathBuf], options: MergeOptions) -> Result<u64> {
    if sources.len() < 2 {
        return Err(Error::InvalidConfig(
            "merge needs at least two source files".to_string(),
        ));
    }
    reject_duplicate_paths(sources)?;

    let mut readers: Vec<Reader> = sources
        .iter()
        .map(Reader::open)
        .collect::<Result<_>>()?;
    let headers: Vec<Header> = readers.iter().map(|r| r.header().clone()).collect();

    warn_on_mixed_versions(&headers);
    let merged_options = merged_options(&headers, options)?;
    let (universal_pdgcode, universal_weight) = universal_inference(&headers);

    let mut builder = Builder::new();
    builder.options = Options {
        universal_pdgcode,
        universal_weight,
        ..merged_options
    };
    builder.sourcename = b"mcpltool: merged output".to_vec();
    apply_merged_comments_and_blobs(&mut builder, &headers);

    let mut writer = Writer::from_builder(builder, std::fs::File::create(dest)?)?;
    let mut total = 0u64;
    for reader in &mut readers {
        while let Some(particle) = reader.read()? {
            writer.write_particle(&particle)?;
            total += 1;
        }
    }
    writer.close()?;
    Ok(total)
}

/// Appends `sources` onto the existing file at `dest`, rewriting its
/// `nparticles` field in place. Fails rather than migrate already-written
/// particle bytes if the merged format options would require a different
/// record layout than `dest` already has on disk.
pub fn merge_inplace(dest: &Path, sources: &[PathBuf], options: MergeOptions) -> Result<u64> {
    if sources.is_empty() {
        return Err(Error::InvalidConfig(
            "in-place merge needs at least one additional source file".to_string(),
        ));
    }
    let mut all_paths: Vec<PathBuf> = vec![dest.to_path_buf()];
    all_paths.extend(sources.iter().cloned());
    reject_duplicate_paths(&all_paths)?;

    let dest_reader = Reader::open(dest)?;
    let dest_header = dest_reader.header().clone();
    drop(dest_reader);

    let mut readers: Vec<Reader> = sources
        .iter()
        .map(Reader::open)
        .collect::<Result<_>>()?;
    let source_headers: Vec<Header> = readers.iter().map(|r| r.header().clone()).collect();

    for header in &source_headers {
        if header.version != dest_header.version {
            return Err(Error::IncompatibleMerge(format!(
                "cannot merge format version {} into version {} in place",
                header.version, dest_header.version
            )));
        }
    }

    let mut all_headers = source_headers.clone();
    all_headers.push(dest_header.clone());
    let merged = merged_options(&all_headers, options)?;
    let (universal_pdgcode, universal_weight) = universal_inference(&all_headers);
    if merged != dest_header.options
        || universal_pdgcode != dest_header.options.universal_pdgcode
        || universal_weight != dest_header.options.universal_weight
    {
        return Err(Error::IncompatibleMerge(
            "merging these inputs in place would require changing dest's particle record \
             layout or universal values, which can't be done without rewriting already-written \
             bytes; use a fresh (non-inplace) merge instead"
                .to_string(),
        ));
    }

    let mut file = OpenOptions::new().read(true).write(true).open(dest)?;
    let raw = RawHeader::read_from(&mut file)?;
    let data_start = raw.header_size();
    file.seek(SeekFrom::End(0))?;

    let mut added = 0u64;
    for reader in &mut readers {
        while let Some(particle) = reader.read()? {
            write_particle(&mut file, dest_header.endianness, &dest_header.options, &particle)?;
            added += 1;
        }
    }

    let new_total = dest_header.nparticles + added;
    file.seek(SeekFrom::Start(NPARTICLES_OFFSET))?;
    dest_header.endianness.write_u64(&mut file, new_total)?;
    file.seek(SeekFrom::Start(data_start + dest_header.nparticles * dest_header.particle_size() as u64))?;
    Ok(added)
}

/// Resolves paths to an absolute, symlink-free form and errors if any two
/// resolve to the same file -- merging a file with itself, whether named
/// directly, through a relative path, or through a hard/soft link.
fn reject_duplicate_paths(paths: &[PathBuf]) -> Result<()> {
    let mut seen = HashSet::new();
    for path in paths {
        let canonical = std::fs::canonicalize(path)?;
        if !seen.insert(canonical.clone()) {
            return Err(Error::IncompatibleMerge(format!(
                "{} is supplied more than once (possibly via a different path or a link)",
                path.display()
            )));
        }
    }
    Ok(())
}

fn warn_on_mixed_versions(headers: &[Header]) {
    let versions: HashSet<u8> = headers.iter().map(|h| h.version).collect();
    if versions.len() > 1 {
        log::warn!(
            "merging files with mixed MCPL format versions ({:?}); the output uses version 3",
            versions
        );
    }
}

/// Computes the output's polarisation/userflags/singleprec flags from the
/// inputs' headers. `universal_pdgcode`/`universal_weight` are left at
/// their default (per-particle) here; see [`universal_inference`].
fn merged_options(headers: &[Header], options: MergeOptions) -> Result<Options> {
    let polarisation = headers.iter().any(|h| h.options.polarisation);

    let all_singleprec = headers.iter().all(|h| h.options.singleprec);
    let any_singleprec = headers.iter().any(|h| h.options.singleprec);
    let singleprec = if all_singleprec {
        true
    } else if any_singleprec && !options.forcemerge {
        return Err(Error::IncompatibleMerge(
            "inputs disagree on floating point precision; pass --forcemerge to downgrade the \
             output to double precision"
                .to_string(),
        ));
    } else {
        false
    };

    let all_userflags = headers.iter().all(|h| h.options.userflags);
    let any_userflags = headers.iter().any(|h| h.options.userflags);
    let userflags = all_userflags || (any_userflags && options.keepuserflags);

    Ok(Options {
        userflags,
        polarisation,
        singleprec,
        universal_pdgcode: 0,
        universal_weight: None,
    })
}

/// Mirrors the reference test suite's rule: a universal value (pdgcode or
/// weight) survives into the merged output only if every *nonempty* input
/// already declares the very same universal value; files with zero
/// particles don't get a vote.
fn universal_inference(headers: &[Header]) -> (i32, Option<f64>) {
    let nonempty: Vec<&Header> = headers.iter().filter(|h| h.nparticles > 0).collect();
    if nonempty.is_empty() {
        return (0, None);
    }
    let first_pdg = nonempty[0].options.universal_pdgcode;
    let pdgcode = if nonempty.iter().all(|h| h.options.universal_pdgcode == first_pdg) {
        first_pdg
    } else {
        0
    };
    let first_weight = nonempty[0].options.universal_weight;
    let weight = if nonempty.iter().all(|h| h.options.universal_weight == first_weight) {
        first_weight
    } else {
        None
    };
    (pdgcode, weight)
}

/// Sums `stat:sum:` comments with matching keys across `headers`, keeps
/// comments present in only one input, and carries forward the first
/// input's blobs (logging a warning for any later input whose blob key
/// collides with one already taken).
fn apply_merged_comments_and_blobs(builder: &mut Builder, headers: &[Header]) {
    let mut stat_sums = std::collections::HashMap::new();
    let mut other_comments = Vec::new();
    for header in headers {
        for comment in header.comments_str() {
            if let Some(rest) = comment.strip_prefix("stat:sum:") {
                if let Some((key, value)) = statsum::parse_entry(rest) {
                    stat_sums
                        .entry(key)
                        .and_modify(|v: &mut f64| *v += value)
                        .or_insert(value);
                    continue;
                }
            }
            let bytes = comment.into_owned().into_bytes();
            if !other_comments.contains(&bytes) {
                other_comments.push(bytes);
            }
        }
    }
    for comment in other_comments {
        let _ = builder.add_comment(comment);
    }
    for (key, value) in stat_sums {
        let _ = builder.add_stat_sum(&key, value);
    }

    for header in headers {
        for (key, value) in &header.blobs {
            if builder.add_blob(key.clone(), value.clone()).is_err() {
                log::warn!(
                    "blob key {:?} present in more than one merge input; keeping the first copy",
                    String::from_utf8_lossy(key)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Builder as HeaderBuilder;
    use crate::particle::Particle;
    use crate::writer::Writer as FileWriter;

    fn write_file(path: &Path, particles: &[Particle]) {
        let mut writer = FileWriter::create(path).unwrap();
        for p in particles {
            writer.write_particle(p).unwrap();
        }
        writer.close().unwrap();
    }

    fn write_file_with(path: &Path, builder: HeaderBuilder, particles: &[Particle]) {
        let mut writer = FileWriter::from_builder(builder, std::fs::File::create(path).unwrap()).unwrap();
        for p in particles {
            writer.write_particle(p).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn merge_concatenates_and_infers_universal_pdgcode() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mcpl");
        let b = dir.path().join("b.mcpl");
        let dest = dir.path().join("out.mcpl");

        let mut builder_a = HeaderBuilder::new();
        builder_a.options.universal_pdgcode = 2112;
        write_file_with(&a, builder_a, &[Particle::default(), Particle::default()]);
        let mut builder_b = HeaderBuilder::new();
        builder_b.options.universal_pdgcode = 2112;
        write_file_with(&b, builder_b, &[Particle::default()]);

        let written = merge(&dest, &[a, b], MergeOptions::default()).unwrap();
        assert_eq!(written, 3);

        let reader = Reader::open(&dest).unwrap();
        assert_eq!(reader.header().nparticles, 3);
        assert_eq!(reader.header().options.universal_pdgcode, 2112);
    }

    #[test]
    fn merge_rejects_duplicate_source() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mcpl");
        write_file(&a, &[Particle::default()]);
        let dest = dir.path().join("out.mcpl");
        let err = merge(&dest, &[a.clone(), a], MergeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::IncompatibleMerge(_)));
    }

    #[test]
    fn merge_promotes_polarisation_and_drops_mismatched_userflags() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mcpl");
        let b = dir.path().join("b.mcpl");
        let dest = dir.path().join("out.mcpl");

        let mut builder_a = HeaderBuilder::new();
        builder_a.options.polarisation = true;
        builder_a.options.userflags = true;
        write_file_with(&a, builder_a, &[Particle::default()]);
        write_file(&b, &[Particle::default()]);

        merge(&dest, &[a, b], MergeOptions::default()).unwrap();
        let reader = Reader::open(&dest).unwrap();
        assert!(reader.header().options.polarisation);
        assert!(!reader.header().options.userflags);
    }

    #[test]
    fn keepuserflags_promotes_mismatched_userflags() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mcpl");
        let b = dir.path().join("b.mcpl");
        let dest = dir.path().join("out.mcpl");

        let mut builder_a = HeaderBuilder::new();
        builder_a.options.userflags = true;
        write_file_with(&a, builder_a, &[Particle { userflags: 7, ..Particle::default() }]);
        write_file(&b, &[Particle::default()]);

        let options = MergeOptions { keepuserflags: true, ..Default::default() };
        merge(&dest, &[a, b], options).unwrap();
        let reader = Reader::open(&dest).unwrap();
        assert!(reader.header().options.userflags);
    }

    #[test]
    fn merge_inplace_appends_and_patches_count() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.mcpl");
        let src = dir.path().join("src.mcpl");
        write_file(&dest, &[Particle::default(), Particle::default()]);
        write_file(&src, &[Particle::default()]);

        let added = merge_inplace(&dest, &[src], MergeOptions::default()).unwrap();
        assert_eq!(added, 1);
        let reader = Reader::open(&dest).unwrap();
        assert_eq!(reader.header().nparticles, 3);
    }

    #[test]
    fn merge_inplace_rejects_incompatible_layout() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest.mcpl");
        let src = dir.path().join("src.mcpl");
        write_file(&dest, &[Particle::default()]);
        let mut builder = HeaderBuilder::new();
        builder.options.polarisation = true;
        write_file_with(&src, builder, &[Particle::default()]);

        let err = merge_inplace(&dest, &[src], MergeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::IncompatibleMerge(_)));
    }

    #[test]
    fn stat_sum_comments_are_summed_on_fresh_merge() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mcpl");
        let b = dir.path().join("b.mcpl");
        let dest = dir.path().join("out.mcpl");

        let mut builder_a = HeaderBuilder::new();
        builder_a.add_stat_sum("hello", 1.0).unwrap();
        write_file_with(&a, builder_a, &[Particle::default()]);
        let mut builder_b = HeaderBuilder::new();
        builder_b.add_stat_sum("hello", 2.0).unwrap();
        write_file_with(&b, builder_b, &[Particle::default()]);

        merge(&dest, &[a, b], MergeOptions::default()).unwrap();
        let reader = Reader::open(&dest).unwrap();
        assert_eq!(reader.header().stat_sum().get("hello"), Some(&Some(3.0)));
    }
}
