//! TF/IDF vector-space scoring (`spec.md` §4.9): `tf`, `idf`, field-norm
//! byte encoding, coordination factor, sloppy-phrase frequency. The norm
//! byte codec is Lucene's own "small float" packing (3 mantissa bits, a
//! zero-exponent of 15) so a norm byte written by this crate means the same
//! magnitude a real Lucene 2.x reader would decode it to.

use std::sync::LazyLock;

/// Every possible norm byte's decoded magnitude, precomputed once
/// (`spec.md` §4.9's "256-entry norm decode table").
static NORM_DECODE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0f32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = byte_to_float_315(i as u8);
    }
    table
});

/// Lucene's `SmallFloat.byte315ToFloat`: reinterprets the byte as a 3-bit
/// mantissa / 5-bit exponent float biased at 15, widened to an IEEE-754
/// `f32` by shifting the mantissa left and correcting the exponent bias.
fn byte_to_float_315(b: u8) -> f32 {
    if b == 0 {
        return 0.0;
    }
    let bits: u32 = ((b as u32) << (24 - 3)) + ((63 - 15) << 24);
    f32::from_bits(bits)
}

/// Lucene's `SmallFloat.floatToByte315`: the inverse packing, clamping to
/// `0x00`/`0xff` outside the representable range.
fn float_to_byte_315(f: f32) -> u8 {
    if f < 0.0 {
        return 0;
    }
    let bits = f.to_bits() as i32;
    let small = bits >> (24 - 3);
    if small <= ((63 - 15) << 3) {
        return if bits <= 0 { 0 } else { 1 };
    }
    if small >= ((63 - 15) << 3) + 0x100 {
        return 0xff;
    }
    (small - ((63 - 15) << 3)) as u8
}

/// Decodes a stored norm byte to its `f32` magnitude.
pub fn decode_norm(b: u8) -> f32 {
    NORM_DECODE[b as usize]
}

/// Encodes `1 / sqrt(field_length) * boost` as a norm byte, the value
/// written into `.nrm` for a tokenized field at index time.
pub fn encode_field_norm(field_length: usize, boost: f32) -> u8 {
    if field_length == 0 {
        return 0;
    }
    let value = boost / (field_length as f32).sqrt();
    float_to_byte_315(value)
}

/// Term frequency factor: `sqrt(freq)`.
pub fn tf(freq: f32) -> f32 {
    freq.sqrt()
}

/// Inverse document frequency: `1 + ln(num_docs / (doc_freq + 1))`.
pub fn idf(doc_freq: i32, num_docs: i32) -> f32 {
    1.0 + ((num_docs.max(1) as f32) / (doc_freq as f32 + 1.0)).ln()
}

/// Boolean scoring coordination multiplier: the fraction of a query's
/// clauses that actually matched a given document.
pub fn coord(overlap: usize, max_overlap: usize) -> f32 {
    if max_overlap == 0 {
        0.0
    } else {
        overlap as f32 / max_overlap as f32
    }
}

/// Query normalization factor so differently-shaped queries' scores stay
/// comparable: `1 / sqrt(sum of squared per-clause weights)`.
pub fn query_norm(sum_of_squared_weights: f32) -> f32 {
    if sum_of_squared_weights <= 0.0 {
        1.0
    } else {
        1.0 / sum_of_squared_weights.sqrt()
    }
}

/// Sloppy phrase-match frequency: positional edit distance `distance`
/// within the query's slop tolerance contributes `1 / (distance + 1)`.
pub fn sloppy_freq(distance: i32) -> f32 {
    1.0 / (distance as f32 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_byte_round_trips_approximately() {
        for len in [1usize, 2, 4, 10, 100, 1000] {
            let encoded = encode_field_norm(len, 1.0);
            let decoded = decode_norm(encoded);
            let expected = 1.0 / (len as f32).sqrt();
            // Small-float packing is lossy by design (8 bits total); allow
            // the magnitude of error Lucene's own norm encoding tolerates.
            assert!(
                (decoded - expected).abs() / expected <= 0.15,
                "len={len} expected={expected} decoded={decoded}"
            );
        }
    }

    #[test]
    fn zero_length_field_has_zero_norm() {
        assert_eq!(encode_field_norm(0, 1.0), 0);
        assert_eq!(decode_norm(0), 0.0);
    }

    #[test]
    fn idf_decreases_as_doc_freq_rises() {
        let rare = idf(1, 1000);
        let common = idf(500, 1000);
        assert!(rare > common);
    }

    #[test]
    fn coord_is_fraction_of_matched_clauses() {
        assert_eq!(coord(2, 4), 0.5);
        assert_eq!(coord(0, 0), 0.0);
    }
}
