//! Write-then-read round trips through the public API, covering every
//! combination of optional fields the header can declare.

use mcpl::header::{Builder, Options};
use mcpl::{Particle, Reader, Writer};

fn particle(i: u32) -> Particle {
    Particle {
        x: i as f64 * 0.5,
        y: -(i as f64),
        z: 2.0,
        ux: 0.0,
        uy: 0.0,
        uz: 1.0,
        ekin: 1.0 + i as f64,
        time: i as f64 * 0.1,
        weight: 1.0,
        pdgcode: 2112,
        userflags: i,
        polarisation: [0.1, 0.2, 0.3],
    }
}

#[test]
fn default_options_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.mcpl");
    let mut writer = Writer::create(&path).unwrap();
    for i in 0..20 {
        writer.write_particle(&particle(i)).unwrap();
    }
    writer.close().unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.header().nparticles, 20);
    let particles: Vec<_> = reader.particles().collect::<mcpl::Result<_>>().unwrap();
    for (i, p) in particles.iter().enumerate() {
        let expected = particle(i as u32);
        assert_eq!(p.pdgcode, expected.pdgcode);
        assert_eq!(p.userflags, 0); // default options carry no userflags
        assert!((p.ekin - expected.ekin).abs() < 1e-9);
        assert!((p.x - expected.x).abs() < 1e-9);
    }
}

#[test]
fn full_options_preserve_polarisation_and_userflags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("full.mcpl");
    let mut builder = Builder::new();
    builder.options = Options {
        userflags: true,
        polarisation: true,
        singleprec: false,
        universal_pdgcode: 0,
        universal_weight: None,
    };
    builder.sourcename = b"integration-test".to_vec();
    let mut writer = Writer::from_builder(builder, std::fs::File::create(&path).unwrap()).unwrap();
    for i in 0..8 {
        writer.write_particle(&particle(i)).unwrap();
    }
    writer.close().unwrap();

    let mut reader = Reader::open(&path).unwrap();
    assert_eq!(reader.header().sourcename_str(), "integration-test");
    for i in 0..8 {
        let p = reader.read().unwrap().unwrap();
        assert_eq!(p.userflags, i);
        for axis in 0..3 {
            assert!((p.polarisation[axis] - 0.1 * (axis as f64 + 1.0)).abs() < 1e-9);
        }
    }
    assert!(reader.read().unwrap().is_none());
}

#[test]
fn singleprec_and_universal_fields_shrink_particle_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.mcpl");
    let mut builder = Builder::new();
    builder.options = Options {
        singleprec: true,
        universal_pdgcode: 2112,
        universal_weight: Some(1.0),
        ..Options::default()
    };
    let mut writer = Writer::from_builder(builder, std::fs::File::create(&path).unwrap()).unwrap();
    writer.write_particle(&particle(0)).unwrap();
    writer.close().unwrap();

    let reader = Reader::open(&path).unwrap();
    // position(3)+packed(3)+time(1) = 7 f32 fields, no weight/pdgcode stored.
    assert_eq!(reader.header().particle_size(), 7 * 4);
}

#[test]
fn finish_leaves_file_recoverable_by_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unclosed.mcpl");
    let mut writer = Writer::create(&path).unwrap();
    for i in 0..3 {
        writer.write_particle(&particle(i)).unwrap();
    }
    writer.finish().unwrap();

    let reader = Reader::open(&path).unwrap();
    assert_eq!(reader.header().nparticles, 3);
}
