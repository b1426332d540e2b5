use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::io::Write;

/// Shannon entropy in bits per character.
///
/// `H = -Σ p_c·log2(p_c)` over the distinct characters of `s`, where `p_c`
/// is the character's share of the string. An empty string has entropy 0.
/// Terms are summed in character order, so the result is bit-for-bit stable.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let len = total as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            p * p.log2()
        })
        .sum();

    // -0.0 for single-symbol strings
    (-entropy).max(0.0)
}

/// Compressed length of `s` as a stand-in for Kolmogorov complexity.
///
/// This is the byte length of the zlib stream at the default level. It
/// tracks information density loosely and carries the fixed zlib framing
/// overhead, so it is an approximation only and gives no bound on the
/// true complexity. Model artifacts are trained against this exact measure.
pub fn kolmogorov_approx(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    if let Err(e) = encoder.write_all(s.as_bytes()) {
        log::debug!("Compression failed, using raw length: {}", e);
        return s.len() as f64;
    }
    match encoder.finish() {
        Ok(compressed) => compressed.len() as f64,
        Err(e) => {
            log::debug!("Compression failed, using raw length: {}", e);
            s.len() as f64
        }
    }
}
