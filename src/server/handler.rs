//! Per-request logic.
//!
//! Each request resolves its target into a [`WebPath`], captures the
//! current snapshot exactly once, and answers entirely from that capture:
//! a reload publishing mid-request never changes what the request sees.

use std::fs;
use std::io;
use std::sync::{Arc, LazyLock};

use percent_encoding::percent_decode_str;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::{encoding, listing};
use crate::runfiles::Runfiles;
use crate::snapshot::Container;
use crate::webpath::WebPath;
use crate::{log, mime};

/// Reserved prefix exposing the server's own runtime dependencies,
/// outside the manifest-declared asset set.
static RUNFILES_PREFIX: LazyLock<WebPath> =
    LazyLock::new(|| WebPath::parse("/_/runfiles").expect("static path"));

/// Immutable per-server state shared by all request workers.
pub(super) struct RequestContext {
    pub(super) container: Arc<Container>,
    pub(super) runfiles: Runfiles,
    pub(super) label: String,
}

/// Handle a single GET or HEAD request.
pub(super) fn handle(request: Request, ctx: &RequestContext) -> anyhow::Result<()> {
    let target = request.url().to_string();
    let Some(webpath) = resolve_target(&target) else {
        log!("serve"; "sending 400 for {target}: bad path");
        return respond(request, 400, mime::types::PLAIN, b"Bad path".to_vec());
    };

    // Exactly one capture per request; everything below reads this
    // snapshot even if a reload publishes concurrently.
    let snapshot = ctx.container.capture();

    if let Some(file) = snapshot.assets.get(&webpath) {
        match fs::read(file) {
            Ok(body) => return respond(request, 200, mime::from_path(file), body),
            Err(e) => {
                // Backing file vanished since the last load; fall through
                // to the listing rather than surfacing an internal fault.
                log!("serve"; "asset {} unreadable: {e}", file.display());
            }
        }
    } else if webpath.starts_with(&RUNFILES_PREFIX) {
        let rest = webpath.subpath(RUNFILES_PREFIX.segment_count(), webpath.segment_count());
        let file = ctx.runfiles.root().join(rest.to_relative_fs_path());
        if file.is_file() {
            match fs::read(&file) {
                Ok(body) => return respond(request, 200, mime::from_path(&file), body),
                Err(e) => log!("serve"; "runfile {} unreadable: {e}", file.display()),
            }
        }
    }

    let page = listing::render(&ctx.label, &webpath, &snapshot);
    respond(request, 404, mime::types::HTML, page.into_bytes())
}

/// Parse and normalize a request target. `None` means 400: unparsable or
/// not absolute. The query string is not part of the path, and is stripped
/// before percent-decoding so an encoded `?` stays in the path.
fn resolve_target(target: &str) -> Option<WebPath> {
    let path = target.split(['?', '#']).next().unwrap_or("");
    let path = percent_decode_str(path).decode_utf8().ok()?;
    let webpath = WebPath::parse(&path).ok()?.normalize();
    webpath.is_absolute().then_some(webpath)
}

/// Shape and send a response: gzip negotiation, cache-disabling headers,
/// explicit length. HEAD runs the identical logic but omits the body.
fn respond(
    request: Request,
    status: u16,
    content_type: &'static str,
    mut body: Vec<u8>,
) -> anyhow::Result<()> {
    let accept_encoding = header_value(&request, "Accept-Encoding");
    let mut headers = vec![
        make_header("Content-Type", content_type),
        make_header("Expires", "0"),
        make_header("Cache-Control", "no-cache, must-revalidate"),
    ];
    if mime::is_compressible(content_type) && encoding::allows_gzip(accept_encoding.as_deref()) {
        body = encoding::gzip(&body)?;
        headers.push(make_header("Content-Encoding", "gzip"));
    }

    let length = body.len();
    if request.method() == &Method::Head {
        let response = Response::new(StatusCode(status), headers, io::empty(), Some(length), None);
        request.respond(response)?;
    } else {
        let response = Response::new(
            StatusCode(status),
            headers,
            io::Cursor::new(body),
            Some(length),
            None,
        );
        request.respond(response)?;
    }
    Ok(())
}

fn header_value(request: &Request, field: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(field))
        .map(|h| h.value.to_string())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
