//! Static media-type table for served assets.
//!
//! Maps file extensions to `Content-Type` values and classifies which types
//! are worth gzipping. Unknown extensions fall back to a generic binary
//! type so every response carries an explicit content type.

use std::path::Path;

/// Common media-type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const CSV: &str = "text/csv; charset=utf-8";
    pub const TSV: &str = "text/tab-separated-values; charset=utf-8";
    pub const RTF: &str = "application/rtf";

    // Web feeds
    pub const ATOM: &str = "application/atom+xml";
    pub const RDF: &str = "application/rdf+xml";

    // Documents
    pub const PDF: &str = "application/pdf";
    pub const POSTSCRIPT: &str = "application/postscript";
    pub const XHTML: &str = "application/xhtml+xml";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const ZIP: &str = "application/zip";
    pub const GZIP: &str = "application/gzip";
    pub const BZIP2: &str = "application/x-bzip2";
    pub const TAR: &str = "application/x-tar";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";
    pub const BMP: &str = "image/bmp";
    pub const TIFF: &str = "image/tiff";
    pub const PSD: &str = "image/vnd.adobe.photoshop";

    // Audio / Video
    pub const OGG_AUDIO: &str = "audio/ogg";
    pub const MP4: &str = "video/mp4";
    pub const MPEG_VIDEO: &str = "video/mpeg";
    pub const WEBM: &str = "video/webm";
    pub const QUICKTIME: &str = "video/quicktime";
    pub const WMV: &str = "video/x-ms-wmv";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const SFNT: &str = "application/font-sfnt";
    pub const EOT: &str = "application/vnd.ms-fontobject";

    // Misc
    pub const MANIFEST_JSON: &str = "application/manifest+json";
    pub const VCARD: &str = "text/vcard; charset=utf-8";
}

/// Guess the media type from a file's extension.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess the media type from an extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        // Web / Text
        Some("html" | "htm") => types::HTML,
        Some("xhtml") => types::XHTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("webmanifest") => types::MANIFEST_JSON,
        Some("xml" | "xsd") => types::XML,
        Some("rdf") => types::RDF,
        Some("atom") => types::ATOM,
        Some("csv") => types::CSV,
        Some("tsv") => types::TSV,
        Some("txt") => types::PLAIN,
        Some("rtf") => types::RTF,
        Some("vcard") => types::VCARD,

        // Images
        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("ico") => types::ICO,
        Some("bmp") => types::BMP,
        Some("tif" | "tiff") => types::TIFF,
        Some("psd") => types::PSD,

        // Audio / Video
        Some("ogg") => types::OGG_AUDIO,
        Some("mp4") => types::MP4,
        Some("mpeg" | "mpg") => types::MPEG_VIDEO,
        Some("webm") => types::WEBM,
        Some("mov" | "qt") => types::QUICKTIME,
        Some("wmv") => types::WMV,

        // Fonts
        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf" | "otf") => types::SFNT,
        Some("eot") => types::EOT,

        // Documents / Binary
        Some("pdf") => types::PDF,
        Some("ps") => types::POSTSCRIPT,
        Some("zip") => types::ZIP,
        Some("gz" | "gzip") => types::GZIP,
        Some("bz2") => types::BZIP2,
        Some("tar") => types::TAR,

        _ => types::OCTET_STREAM,
    }
}

/// Whether a media type benefits from gzip on the wire.
///
/// Already-compressed formats (images, archives, most media) are excluded.
pub fn is_compressible(media_type: &str) -> bool {
    matches!(
        media_type,
        types::HTML
            | types::XHTML
            | types::PLAIN
            | types::CSS
            | types::JAVASCRIPT
            | types::JSON
            | types::MANIFEST_JSON
            | types::XML
            | types::RDF
            | types::ATOM
            | types::CSV
            | types::TSV
            | types::RTF
            | types::VCARD
            | types::SVG
            | types::POSTSCRIPT
            | types::TAR
            | types::SFNT
            | types::EOT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(&PathBuf::from("index.html")), types::HTML);
        assert_eq!(from_path(&PathBuf::from("app.js")), types::JAVASCRIPT);
        assert_eq!(from_path(&PathBuf::from("style.css")), types::CSS);
        assert_eq!(from_path(&PathBuf::from("logo.png")), types::PNG);
        assert_eq!(from_path(&PathBuf::from("unknown.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(&PathBuf::from("no_extension")), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_compressible() {
        assert!(is_compressible(types::HTML));
        assert!(is_compressible(types::JAVASCRIPT));
        assert!(is_compressible(types::SVG));
        assert!(!is_compressible(types::PNG));
        assert!(!is_compressible(types::ZIP));
        assert!(!is_compressible(types::OCTET_STREAM));
        assert!(!is_compressible(types::MP4));
    }
}
