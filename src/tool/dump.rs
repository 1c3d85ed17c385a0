//! Human-readable header and particle listings, ported from
//! `MCPLFile.dump_hdr` / `dump_particles` in the original Python bindings.

use std::fmt::Write as _;

use super::format::{g, pad};
use crate::error::Result;
use crate::header::Header;
use crate::reader::Reader;

/// Renders the header summary block printed by `mcpltool` before the
/// particle listing.
pub fn dump_header(header: &Header) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n  Basic info");
    let _ = writeln!(out, "    Format             : MCPL-{}", header.version);
    let _ = writeln!(out, "    No. of particles   : {}", header.nparticles);
    let _ = writeln!(out, "    Header storage     : {} bytes", header.header_size());
    let _ = writeln!(
        out,
        "    Data storage       : {} bytes",
        header.nparticles * header.particle_size() as u64
    );
    let _ = writeln!(out, "\n  Custom meta data");
    let _ = writeln!(out, "    Source             : \"{}\"", header.sourcename_str());
    let _ = writeln!(out, "    Number of comments : {}", header.comments.len());
    for (i, comment) in header.comments_str().iter().enumerate() {
        let _ = writeln!(out, "          -> comment {} : \"{}\"", i, comment);
    }
    let _ = writeln!(out, "    Number of blobs    : {}", header.blobs.len());
    for (key, value) in &header.blobs {
        let _ = writeln!(
            out,
            "          -> {} bytes of data with key \"{}\"",
            value.len(),
            String::from_utf8_lossy(key)
        );
    }
    let _ = writeln!(out, "\n  Particle data format");
    let _ = writeln!(
        out,
        "    User flags         : {}",
        if header.options.userflags { "yes" } else { "no" }
    );
    let _ = writeln!(
        out,
        "    Polarisation info  : {}",
        if header.options.polarisation { "yes" } else { "no" }
    );
    if header.options.universal_pdgcode != 0 {
        let _ = writeln!(
            out,
            "    Fixed part. type   : yes (pdgcode {})",
            header.options.universal_pdgcode
        );
    } else {
        let _ = writeln!(out, "    Fixed part. type   : no");
    }
    match header.options.universal_weight {
        Some(w) => {
            let _ = writeln!(out, "    Fixed part. weight : yes (weight {})", g(w, 6));
        }
        None => {
            let _ = writeln!(out, "    Fixed part. weight : no");
        }
    }
    let _ = writeln!(
        out,
        "    FP precision       : {}",
        if header.options.singleprec { "single" } else { "double" }
    );
    let _ = writeln!(
        out,
        "    Endianness         : {}",
        match header.endianness {
            crate::endian::Endianness::Little => "little",
            crate::endian::Endianness::Big => "big",
        }
    );
    let _ = writeln!(out, "    Storage            : {} bytes/particle", header.particle_size());
    let _ = writeln!(out);
    out
}

/// Renders a particle listing, starting `skip` particles in and printing
/// at most `limit` of them (`limit == 0` means no limit). Rewinds and
/// leaves the reader positioned just after the last printed particle.
pub fn dump_particles(reader: &mut Reader, limit: u64, skip: u64) -> Result<String> {
    reader.rewind()?;
    reader.skip_forward(skip)?;

    let options = reader.header().options;
    let mut out = String::new();
    let mut header_line = String::from(
        "index     pdgcode   ekin[MeV]       x[cm]       y[cm]       z[cm]          ux          uy          uz    time[ms]",
    );
    if options.universal_weight.is_none() {
        header_line.push_str("      weight");
    }
    if options.polarisation {
        header_line.push_str("       pol-x       pol-y       pol-z");
    }
    if options.userflags {
        header_line.push_str("  userflags");
    }
    let _ = writeln!(out, "{header_line}");

    let count = if limit == 0 { reader.header().nparticles } else { limit };
    for index in 0..count {
        let Some(particle) = reader.read()? else {
            break;
        };
        let mut line = format!(
            "{} {} {} {} {} {} {} {} {} {}",
            pad(&(skip + index).to_string(), 5),
            pad(&particle.pdgcode.to_string(), 11),
            pad(&g(particle.ekin, 5), 11),
            pad(&g(particle.x, 5), 11),
            pad(&g(particle.y, 5), 11),
            pad(&g(particle.z, 5), 11),
            pad(&g(particle.ux, 5), 11),
            pad(&g(particle.uy, 5), 11),
            pad(&g(particle.uz, 5), 11),
            pad(&g(particle.time, 5), 11),
        );
        if options.universal_weight.is_none() {
            let _ = write!(line, " {}", pad(&g(particle.weight, 5), 11));
        }
        if options.polarisation {
            let _ = write!(
                line,
                "{}{}{}",
                pad(&g(particle.polarisation[0], 5), 12),
                pad(&g(particle.polarisation[1], 5), 12),
                pad(&g(particle.polarisation[2], 5), 12),
            );
        }
        if options.userflags {
            let _ = write!(line, "  0x{:08x}", particle.userflags);
        }
        let _ = writeln!(out, "{line}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::writer::Writer;

    #[test]
    fn header_dump_contains_expected_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mcpl");
        let mut writer = Writer::create(&path).unwrap();
        writer.write_particle(&Particle::default()).unwrap();
        writer.close().unwrap();
        let reader = Reader::open(&path).unwrap();
        let dump = dump_header(reader.header());
        assert!(dump.contains("Format             : MCPL-3"));
        assert!(dump.contains("No. of particles   : 1"));
    }

    #[test]
    fn header_dump_reports_bare_universal_pdgcode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mcpl");
        let mut builder = crate::header::Builder::new();
        builder.options.universal_pdgcode = 2112;
        let mut writer = Writer::from_builder(builder, std::fs::File::create(&path).unwrap()).unwrap();
        writer.write_particle(&Particle::default()).unwrap();
        writer.close().unwrap();
        let reader = Reader::open(&path).unwrap();
        let dump = dump_header(reader.header());
        assert!(dump.contains("yes (pdgcode 2112)"));
    }

    #[test]
    fn particle_dump_respects_limit_and_skip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mcpl");
        let mut writer = Writer::create(&path).unwrap();
        for i in 0..5 {
            let mut p = Particle::default();
            p.ekin = i as f64;
            writer.write_particle(&p).unwrap();
        }
        writer.close().unwrap();
        let mut reader = Reader::open(&path).unwrap();
        let dump = dump_particles(&mut reader, 2, 1).unwrap();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 particle lines
    }
}
