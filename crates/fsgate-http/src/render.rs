use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::escape;
use crate::listing::{EntryKind, Listing};

/// Characters percent-encoded inside entry hrefs.
const HREF_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b':');

/// Backend-read fragments included around the listing. Both come from
/// the tree being served, so they are inserted as-is.
#[derive(Debug, Default)]
pub struct PageIncludes {
    pub header: Option<String>,
    pub readme: Option<String>,
}

/// Render the filtered, sorted listing as a plain autoindex-style page.
/// This is the stand-in for the external presentation layer; the
/// engine's outputs (entries, layout widths, marker flags) all surface
/// here.
pub fn render_listing(
    target: &str,
    parent: Option<&str>,
    listing: &Listing,
    next_order: &str,
    includes: &PageIncludes,
) -> String {
    let name_width = listing.layout.name_max;
    let size_width = listing.layout.size_max;
    let title = escape(target);

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head><title>Index of ");
    page.push_str(&title);
    page.push_str("</title></head>\n<body>\n");

    match &includes.header {
        Some(header) => page.push_str(header),
        None => {
            page.push_str("<h1>Index of ");
            page.push_str(&title);
            page.push_str("</h1>\n");
        }
    }

    page.push_str("<pre>");
    page.push_str(&format!(
        "<a href=\"?C=N&O={next_order}\">Name</a>{}  <a href=\"?C=M&O={next_order}\">Last modified</a>  <a href=\"?C=S&O={next_order}\">Size</a>\n",
        " ".repeat(name_width.saturating_sub(4)),
    ));
    page.push_str("<hr>");

    if let Some(parent) = parent {
        page.push_str(&format!(
            "<a href=\"{}\">Parent Directory</a>\n",
            utf8_percent_encode(parent, HREF_ENCODE),
        ));
    }

    for entry in listing.dirs.iter().chain(listing.files.iter()) {
        let encoded = utf8_percent_encode(&entry.name, HREF_ENCODE).to_string();
        let href = match entry.kind {
            EntryKind::Dir => format!("{encoded}/"),
            EntryKind::File => encoded,
        };
        let display = match entry.kind {
            EntryKind::Dir => format!("{}/", entry.name),
            EntryKind::File => entry.name.clone(),
        };
        page.push_str(&format!(
            "<a href=\"{href}\">{}</a>{} {}  {:>size_width$}\n",
            escape(&display),
            name_padding(&display, name_width),
            entry.modified_display,
            entry.size_display,
        ));
    }

    page.push_str("<hr></pre>\n");
    if let Some(readme) = &includes.readme {
        page.push_str(readme);
        page.push('\n');
    }
    page.push_str("</body>\n</html>\n");
    page
}

/// Trailing blanks that bring a display name up to the column width,
/// compensating for multi-byte names the way widths were measured.
fn name_padding(name: &str, width: usize) -> String {
    let chars = name.chars().count();
    let bytes = name.len();
    let mut pad = width.saturating_sub(chars);
    if bytes > chars {
        pad = pad.saturating_sub((bytes - chars) / 2);
    }
    " ".repeat(pad)
}
