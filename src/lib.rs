//! Reads and writes Monte Carlo particle lists stored in the MCPL binary
//! format: a compact, self-describing, append-only container for
//! per-particle state (position, direction, energy, time, weight, PDG
//! code, and optional polarisation/userflags) produced by Monte Carlo
//! transport simulations, optionally gzip-compressed.
//!
//! The crate is organized the way a byte-format library usually is:
//! runtime endianness ([`endian`]), plain/gzip transports ([`transport`]),
//! a byte-exact header codec ([`header::raw`]) under a friendlier
//! [`header::Header`]/[`header::Builder`], a per-particle codec
//! ([`particle`]) built on a unit-direction-vector packer ([`packer`]), a
//! forward-only [`reader::Reader`], an append-only [`writer::Writer`], and
//! the `mcpltool` command-line operations in [`tool`].
//!
//! ```no_run
//! use mcpl::{header::Builder, particle::Particle, reader::Reader, writer::Writer};
//!
//! let mut writer = Writer::create("out.mcpl")?;
//! writer.write_particle(&Particle { ekin: 1.0, ..Particle::default() })?;
//! writer.close()?;
//!
//! let mut reader = Reader::open("out.mcpl")?;
//! for particle in reader.particles() {
//!     let particle = particle?;
//!     println!("{}", particle.ekin);
//! }
//! # Ok::<(), mcpl::Error>(())
//! ```

pub mod endian;
pub mod error;
pub mod header;
pub mod packer;
pub mod particle;
pub mod reader;
pub mod statsum;
pub mod tool;
pub mod transport;
pub mod writer;

pub use error::{Error, Result};
pub use header::{Builder, Header, Options};
pub use particle::Particle;
pub use reader::Reader;
pub use writer::Writer;
