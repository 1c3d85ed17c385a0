//! The plain-text interchange format emitted by `mcpltool --text`, ported
//! from `convert2ascii` in the original Python bindings.

use std::io::Write;

use crate::error::Result;
use crate::reader::Reader;

const COLUMN_HEADER: &str = "#index     pdgcode               ekin[MeV]                     x[cm]                     y[cm]                     z[cm]                        ux                        uy                        uz                  time[ms]                    weight                     pol-x                     pol-y                     pol-z  userflags";

/// Writes every remaining particle in `reader` to `out` in the ASCII
/// interchange format (one header block, one column-header line, then one
/// line per particle at full double precision).
pub fn convert_to_ascii(reader: &mut Reader, out: &mut dyn Write) -> Result<()> {
    reader.rewind()?;
    writeln!(out, "#MCPL-ASCII")?;
    writeln!(out, "#ASCII-FORMAT: v1")?;
    writeln!(out, "#NPARTICLES: {}", reader.header().nparticles)?;
    writeln!(out, "#END-HEADER")?;
    writeln!(out, "{COLUMN_HEADER}")?;

    while let Some(particle) = reader.read()? {
        writeln!(
            out,
            "{:5} {:11} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} {:23.18e} 0x{:08x}",
            reader.position() - 1,
            particle.pdgcode,
            particle.ekin,
            particle.x,
            particle.y,
            particle.z,
            particle.ux,
            particle.uy,
            particle.uz,
            particle.time,
            particle.weight,
            particle.polarisation[0],
            particle.polarisation[1],
            particle.polarisation[2],
            particle.userflags,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::writer::Writer;

    #[test]
    fn emits_header_block_and_one_line_per_particle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mcpl");
        let mut writer = Writer::create(&path).unwrap();
        writer.write_particle(&Particle::default()).unwrap();
        writer.write_particle(&Particle::default()).unwrap();
        writer.close().unwrap();

        let mut reader = Reader::open(&path).unwrap();
        let mut buf = Vec::new();
        convert_to_ascii(&mut reader, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("#MCPL-ASCII\n"));
        assert!(text.contains("#NPARTICLES: 2"));
        assert_eq!(text.lines().filter(|l| !l.starts_with('#')).count(), 3); // column header + 2 particles
    }
}
