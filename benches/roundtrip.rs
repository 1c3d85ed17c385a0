use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mcpl::header::Builder;
use mcpl::{Particle, Reader, Writer};

/// Writes `nparticles` default particles to a fresh temp file, then reads
/// every one of them back.
fn roundtrip(nparticles: usize) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut writer = Writer::from_builder(Builder::new(), file.reopen().unwrap()).unwrap();
    for i in 0..nparticles {
        writer
            .write_particle(&Particle { ekin: i as f64, ..Particle::default() })
            .unwrap();
    }
    writer.close().unwrap();

    let mut reader = Reader::open(file.path()).unwrap();
    for particle in reader.particles() {
        let _ = black_box(particle.unwrap());
    }
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");
    for &nparticles in &[0usize, 1, 100, 10_000] {
        group.bench_function(format!("{nparticles}_particles"), |b| {
            b.iter(|| roundtrip(black_box(nparticles)));
        });
    }
    group.finish();
}

fn bench_packer(c: &mut Criterion) {
    c.bench_function("packer_roundtrip", |b| {
        b.iter(|| {
            let (a, bb, cc) = mcpl::packer::pack(black_box(0.6), black_box(0.8), black_box(0.0), black_box(14.1));
            black_box(mcpl::packer::unpack(a, bb, cc));
        });
    });
}

criterion_group!(benches, bench_roundtrip, bench_packer);
criterion_main!(benches);
