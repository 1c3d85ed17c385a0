//! Packing a unit direction vector and a kinetic energy into three floats.
//!
//! Two schemes exist. Version 3 ("adaptive projection") is implemented
//! both ways: [`pack`] for writing and [`unpack`] for reading. Version 2
//! ("legacy octahedral", [`unpack_legacy`]) is decode-only, since the
//! writer never produces it -- old files are still expected to be
//! readable.
//!
//! [`unpack`] is a direct transliteration of
//! `MCPLParticleBlock._unpack` in the original Python bindings, which is
//! the only available reference implementation (the bindings are
//! read-only). [`pack`] is derived by algebraically inverting it -- see
//! DESIGN.md for the derivation, since the distilled spec's prose
//! description of which axis ends up stored as a reciprocal doesn't quite
//! match what the reference decoder actually does.

/// Packs a unit vector `(ux, uy, uz)` and kinetic energy `ekin` into three
/// floats using the adaptive-projection (version 3) scheme.
///
/// `ekin` must be non-negative; the direction must be (approximately)
/// normalized.
pub fn pack(ux: f64, uy: f64, uz: f64, ekin: f64) -> (f64, f64, f64) {
    let (ax, ay, az) = (ux.abs(), uy.abs(), uz.abs());
    let sign = |v: f64| if v.is_sign_negative() { -1.0 } else { 1.0 };

    if ax >= ay && ax >= az && uz != 0.0 {
        // ux dominant: drop ux, flag with 1/uz, store uy directly.
        (1.0 / uz, uy, sign(ux) * ekin)
    } else if ay >= az && uz != 0.0 {
        // uy dominant: drop uy, store ux directly, flag with 1/uz.
        (ux, 1.0 / uz, sign(uy) * ekin)
    } else {
        // uz dominant, or uz == 0 and neither reciprocal trick is safe.
        (ux, uy, sign(uz) * ekin)
    }
}

/// Inverse of [`pack`]. Returns `(ux, uy, uz, ekin)`.
pub fn unpack(a: f64, b: f64, c: f64) -> (f64, f64, f64, f64) {
    let ekin = c.abs();
    let sign = if c.is_sign_negative() { -1.0 } else { 1.0 };

    let a_inv = if a != 0.0 { 1.0 / a } else { 1.0 };
    let b_inv = if b != 0.0 { 1.0 / b } else { 1.0 };
    let conda = a.abs() > 1.0;
    let condb = !conda && b.abs() > 1.0;

    let ux = if conda {
        sign * (1.0 - (b * b + a_inv * a_inv)).clamp(0.0, 1.0).sqrt()
    } else {
        a
    };
    let uy = if condb {
        sign * (1.0 - (a * a + b_inv * b_inv)).clamp(0.0, 1.0).sqrt()
    } else {
        b
    };
    let uz = if conda {
        a_inv
    } else if condb {
        b_inv
    } else {
        sign * (1.0 - (a * a + b * b)).clamp(0.0, 1.0).sqrt()
    };

    (ux, uy, uz, ekin)
}

/// Decodes the version 2 ("legacy octahedral") packing. Never produced by
/// [`pack`]; only needed for reading old files.
pub fn unpack_legacy(a: f64, b: f64, c: f64) -> (f64, f64, f64, f64) {
    let ekin = c.abs();
    let uz = (1.0 - a.abs()) - b.abs();
    let zneg = uz < 0.0;
    let sign = |v: f64| if v >= 0.0 { 1.0 } else { -1.0 };

    let (ux, uy) = if zneg {
        (
            (1.0 - b.abs()) * sign(a),
            (1.0 - a.abs()) * sign(b),
        )
    } else {
        (a, b)
    };

    let norm = (ux * ux + uy * uy + uz * uz).sqrt();
    let (mut ux, mut uy, mut uz) = if norm > 0.0 {
        (ux / norm, uy / norm, uz / norm)
    } else {
        (ux, uy, uz)
    };

    // The reference decoder zeroes uz whenever the energy field's sign bit
    // is set, regardless of the computed value -- a quirk of the legacy
    // encoding kept here for byte-for-byte compatibility with old files.
    if c.is_sign_negative() {
        uz = 0.0;
    }
    let _ = &mut ux;
    let _ = &mut uy;

    (ux, uy, uz, ekin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: (f64, f64, f64, f64), want: (f64, f64, f64, f64), eps: f64) {
        assert!((got.0 - want.0).abs() < eps, "{:?} vs {:?}", got, want);
        assert!((got.1 - want.1).abs() < eps, "{:?} vs {:?}", got, want);
        assert!((got.2 - want.2).abs() < eps, "{:?} vs {:?}", got, want);
        assert!((got.3 - want.3).abs() < eps, "{:?} vs {:?}", got, want);
    }

    fn roundtrip(ux: f64, uy: f64, uz: f64, ekin: f64) {
        let (a, b, c) = pack(ux, uy, uz, ekin);
        let back = unpack(a, b, c);
        assert_close(back, (ux, uy, uz, ekin), 1e-9);
    }

    #[test]
    fn roundtrip_axis_aligned() {
        roundtrip(1.0, 0.0, 0.0, 1.0);
        roundtrip(-1.0, 0.0, 0.0, 1.0);
        roundtrip(0.0, 1.0, 0.0, 2.5);
        roundtrip(0.0, -1.0, 0.0, 2.5);
        roundtrip(0.0, 0.0, 1.0, 0.0);
        roundtrip(0.0, 0.0, -1.0, 0.0);
    }

    #[test]
    fn roundtrip_generic_directions() {
        roundtrip(0.6, 0.8, 0.0, 14.1);
        roundtrip(
            1.0 / 3.0_f64.sqrt(),
            1.0 / 3.0_f64.sqrt(),
            1.0 / 3.0_f64.sqrt(),
            0.025,
        );
        roundtrip(-0.1, -0.2, (1.0 - 0.01 - 0.04_f64).sqrt(), 9.99);
        roundtrip(0.9, -0.3, (1.0 - 0.81 - 0.09_f64).sqrt(), 100.0);
    }

    #[test]
    fn legacy_decode_is_finite() {
        let (ux, uy, uz, ekin) = unpack_legacy(0.3, -0.2, 5.0);
        assert!(ux.is_finite() && uy.is_finite() && uz.is_finite() && ekin.is_finite());
    }
}
