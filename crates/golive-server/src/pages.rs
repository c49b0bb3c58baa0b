//! Generated HTML pages: directory listing and error pages.

use std::fmt::Write;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in listing links.
const HREF_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An HTML file shown in the root listing.
pub(crate) struct ListingEntry {
    /// File name relative to the serving root.
    pub(crate) name: String,
    /// Last-modified time, already formatted for display.
    pub(crate) modified: String,
}

const STYLE: &str = "body{font:15px/1.5 system-ui,sans-serif;max-width:720px;margin:3rem auto;\
                     padding:0 1rem;color:#111827}\
                     h1{font-size:1.5rem;font-weight:600}\
                     ul{list-style:none;padding:0}\
                     li{display:flex;justify-content:space-between;padding:.4rem 0;\
                     border-bottom:1px solid #e5e7eb}\
                     a{color:#2563eb;text-decoration:none}\
                     time,.muted{color:#6b7280}";

/// Render the listing shown for `/` when the root has no `index.html`.
pub(crate) fn render_listing(entries: &[ListingEntry]) -> String {
    let mut html = String::with_capacity(1024 + entries.len() * 128);

    open_document(&mut html, "Live Server");
    html.push_str("<h1>HTML files</h1>\n");

    if entries.is_empty() {
        html.push_str(
            "<p class=\"muted\">No HTML files found in this folder. \
             Create one and this page will refresh.</p>\n",
        );
    } else {
        html.push_str("<ul>\n");
        for entry in entries {
            let href = escape(&utf8_percent_encode(&entry.name, HREF_SEGMENT).to_string());
            let _ = writeln!(
                html,
                "<li><a href=\"/{href}\">{}</a><time>{}</time></li>",
                escape(&entry.name),
                escape(&entry.modified)
            );
        }
        html.push_str("</ul>\n");
    }

    close_document(&mut html);
    html
}

/// Render a 404 or 500 page with a link back to `/`.
pub(crate) fn render_error(status: u16, title: &str, message: &str) -> String {
    let mut html = String::with_capacity(1024);

    open_document(&mut html, &format!("{status} {title}"));
    let _ = writeln!(html, "<h1>{status} {}</h1>", escape(title));
    let _ = writeln!(html, "<p>{}</p>", escape(message));
    html.push_str("<p><a href=\"/\">Back to file list</a></p>\n");

    close_document(&mut html);
    html
}

fn open_document(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n");
}

fn close_document(html: &mut String) {
    html.push_str("</body>\n</html>\n");
}

/// Escape HTML special characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
