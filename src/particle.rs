//! A single particle record and its byte-level codec.
//!
//! Field presence and the packing of direction/energy are driven entirely
//! by the file's [`Options`](crate::header::Options); [`Particle`] itself
//! always exposes the full set of attributes at `f64` precision,
//! regardless of whether the file stores `f32` or `f64` fields, matching
//! `MCPLParticle` in the original bindings.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::endian::Endianness;
use crate::error::Result;
use crate::header::Options;
use crate::packer;

/// A single Monte Carlo particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position x coordinate (cm, by MCPL convention).
    pub x: f64,
    /// Position y coordinate.
    pub y: f64,
    /// Position z coordinate.
    pub z: f64,
    /// Direction x component of the (unit) direction vector.
    pub ux: f64,
    /// Direction y component.
    pub uy: f64,
    /// Direction z component.
    pub uz: f64,
    /// Kinetic energy (MeV).
    pub ekin: f64,
    /// Time since event start (ms).
    pub time: f64,
    /// Statistical weight.
    pub weight: f64,
    /// Particle Data Group code.
    pub pdgcode: i32,
    /// Opaque per-particle flags, only present if the file enables them.
    pub userflags: u32,
    /// Polarisation vector, only present if the file enables it.
    pub polarisation: [f64; 3],
}

impl Particle {
    /// `[x, y, z]`.
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// `[ux, uy, uz]`.
    pub fn direction(&self) -> [f64; 3] {
        [self.ux, self.uy, self.uz]
    }
}

impl Default for Particle {
    fn default() -> Particle {
        Particle {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            ux: 0.0,
            uy: 0.0,
            uz: 1.0,
            ekin: 0.0,
            time: 0.0,
            weight: 1.0,
            pdgcode: 2112,
            userflags: 0,
            polarisation: [0.0, 0.0, 0.0],
        }
    }
}

fn read_float<R: Read>(r: &mut R, endianness: Endianness, singleprec: bool) -> Result<f64> {
    if singleprec {
        Ok(endianness.read_f32(r)? as f64)
    } else {
        Ok(endianness.read_f64(r)?)
    }
}

fn write_float<W: Write>(
    w: &mut W,
    endianness: Endianness,
    singleprec: bool,
    value: f64,
) -> Result<()> {
    if singleprec {
        endianness.write_f32(w, value as f32)?;
    } else {
        endianness.write_f64(w, value)?;
    }
    Ok(())
}

/// Reads one particle record, given the file's byte order and format
/// options, applying the version-appropriate unit-vector unpacking.
pub fn read_particle<R: Read>(
    r: &mut R,
    endianness: Endianness,
    options: &Options,
    version: u8,
) -> Result<Particle> {
    let singleprec = options.singleprec;
    let polarisation = if options.polarisation {
        [
            read_float(r, endianness, singleprec)?,
            read_float(r, endianness, singleprec)?,
            read_float(r, endianness, singleprec)?,
        ]
    } else {
        [0.0, 0.0, 0.0]
    };
    let x = read_float(r, endianness, singleprec)?;
    let y = read_float(r, endianness, singleprec)?;
    let z = read_float(r, endianness, singleprec)?;
    let a = read_float(r, endianness, singleprec)?;
    let b = read_float(r, endianness, singleprec)?;
    let c = read_float(r, endianness, singleprec)?;
    let (ux, uy, uz, ekin) = if version >= 3 {
        packer::unpack(a, b, c)
    } else {
        packer::unpack_legacy(a, b, c)
    };
    let time = read_float(r, endianness, singleprec)?;
    let weight = match options.universal_weight {
        Some(w) => w,
        None => read_float(r, endianness, singleprec)?,
    };
    let pdgcode = if options.universal_pdgcode != 0 {
        options.universal_pdgcode
    } else {
        endianness.read_i32(r)?
    };
    let userflags = if options.userflags {
        endianness.read_u32(r)?
    } else {
        0
    };

    Ok(Particle {
        x,
        y,
        z,
        ux,
        uy,
        uz,
        ekin,
        time,
        weight,
        pdgcode,
        userflags,
        polarisation,
    })
}

/// Writes one particle record using the adaptive-projection (version 3)
/// packing, per the given byte order and format options.
pub fn write_particle<W: Write>(
    w: &mut W,
    endianness: Endianness,
    options: &Options,
    particle: &Particle,
) -> Result<()> {
    let singleprec = options.singleprec;
    if options.polarisation {
        write_float(w, endianness, singleprec, particle.polarisation[0])?;
        write_float(w, endianness, singleprec, particle.polarisation[1])?;
        write_float(w, endianness, singleprec, particle.polarisation[2])?;
    }
    write_float(w, endianness, singleprec, particle.x)?;
    write_float(w, endianness, singleprec, particle.y)?;
    write_float(w, endianness, singleprec, particle.z)?;
    let (a, b, c) = packer::pack(particle.ux, particle.uy, particle.uz, particle.ekin);
    write_float(w, endianness, singleprec, a)?;
    write_float(w, endianness, singleprec, b)?;
    write_float(w, endianness, singleprec, c)?;
    write_float(w, endianness, singleprec, particle.time)?;
    if options.universal_weight.is_none() {
        write_float(w, endianness, singleprec, particle.weight)?;
    }
    if options.universal_pdgcode == 0 {
        endianness.write_i32(w, particle.pdgcode)?;
    }
    if options.userflags {
        endianness.write_u32(w, particle.userflags)?;
    }
    Ok(())
}
