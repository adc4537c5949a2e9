//! Hashes used to identify templates and payloads across processes.

/// Deterministic 32-bit hash of a template name.
///
/// Two interleaved djb2-xor accumulators run over the string's UTF-16 code
/// units up to the first NUL, then combine as `a + b * 1566083941`. The value is identical on
/// every process and platform, which makes it usable as a replicated
/// template-index key. All arithmetic wraps.
pub fn stable_hash(name: &str) -> i32 {
    let mut a: i32 = 5381;
    let mut b: i32 = 5381;
    let mut units = name.encode_utf16().take_while(|&unit| unit != 0);
    loop {
        let Some(first) = units.next() else { break };
        a = ((a << 5).wrapping_add(a)) ^ i32::from(first);
        let Some(second) = units.next() else { break };
        b = ((b << 5).wrapping_add(b)) ^ i32::from(second);
    }
    a.wrapping_add(b.wrapping_mul(1_566_083_941))
}

/// BLAKE3 hex fingerprint of an encoded payload.
///
/// Two processes holding the same override set produce the same
/// fingerprint, since snapshot payloads are written in key order.
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
