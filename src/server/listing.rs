//! Generated 404 listing page.
//!
//! When a request misses the asset map, the response is an HTML index of
//! every declared webpath that starts with the requested path, so a
//! developer landing on a directory (or a typo) can see what the build
//! actually produced.

use std::fmt::Write;

use crate::snapshot::Snapshot;
use crate::utils::html::escape;
use crate::webpath::WebPath;

/// Render the listing page for `request_path`.
///
/// Paths come from the snapshot's declared set, which is already sorted;
/// only entries prefixed by the request are shown.
pub(super) fn render(label: &str, request_path: &WebPath, snapshot: &Snapshot) -> String {
    let mut page = String::with_capacity(1024);
    page.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = write!(page, "<title>{}</title>\n", escape(label));
    page.push_str(
        "<style>\
         body{font-family:monospace;margin:2em}\
         h1{font-size:1.2em}\
         li{line-height:1.6}\
         </style>\n</head>\n<body>\n",
    );
    let _ = write!(page, "<h1>{}</h1>\n", escape(label));
    page.push_str("<ul>\n");
    for path in snapshot
        .webpaths
        .iter()
        .filter(|path| path.starts_with(request_path))
    {
        let rendered = path.to_string();
        let _ = write!(
            page,
            "<li><a href=\"{}\">{}</a></li>\n",
            escape(&rendered),
            escape(&rendered)
        );
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    page
}
