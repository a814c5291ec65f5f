//! Accept-Encoding negotiation and gzip body compression.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Permissive gzip check against an `Accept-Encoding` header value.
///
/// A request allows gzip when any listed coding is `gzip`, `x-gzip` or `*`
/// and that coding is not explicitly disqualified with a zero-weight
/// qvalue. An absent header allows nothing.
pub(super) fn allows_gzip(header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    header.split(',').any(|entry| {
        let mut parts = entry.split(';');
        // split yields at least one element
        let coding = parts.next().unwrap_or("").trim();
        matches!(coding, "gzip" | "x-gzip" | "*") && !parts.any(is_zero_q)
    })
}

fn is_zero_q(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().is_ok_and(|q| q == 0.0)
}

/// Compress a response body with gzip.
pub(super) fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_allows_gzip_plain_tokens() {
        assert!(allows_gzip(Some("gzip")));
        assert!(allows_gzip(Some("x-gzip")));
        assert!(allows_gzip(Some("*")));
        assert!(allows_gzip(Some("deflate, gzip")));
        assert!(allows_gzip(Some("gzip, deflate, br")));
    }

    #[test]
    fn test_rejects_without_gzip() {
        assert!(!allows_gzip(None));
        assert!(!allows_gzip(Some("")));
        assert!(!allows_gzip(Some("identity")));
        assert!(!allows_gzip(Some("deflate, br")));
    }

    #[test]
    fn test_zero_qvalue_disqualifies() {
        assert!(!allows_gzip(Some("gzip;q=0")));
        assert!(!allows_gzip(Some("gzip; q=0.0")));
        assert!(!allows_gzip(Some("*;q=0")));
        // A different token can still allow it.
        assert!(allows_gzip(Some("gzip;q=0, *")));
        // Nonzero weights are fine.
        assert!(allows_gzip(Some("gzip;q=0.5")));
    }

    #[test]
    fn test_gzip_round_trips() {
        let original = b"function f() { return 42; }".repeat(16);
        let compressed = gzip(&original).unwrap();
        assert!(compressed.len() < original.len());

        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, original);
    }
}
