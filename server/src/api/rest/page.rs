//! HTML rendering of the file listing

use std::fmt::Write;

use crate::storage::FileRecord;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>File Manager</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; line-height: 1.5; color: #333; }
        h1, h2 { border-bottom: 1px solid #eee; padding-bottom: 0.5rem; }
        ul { list-style: none; padding: 0; }
        li { padding: 0.5rem 0; border-bottom: 1px solid #f0f0f0; display: flex; justify-content: space-between; align-items: center; }
        a { text-decoration: none; color: #007bff; }
        a:hover { text-decoration: underline; }
        .meta { color: #666; font-size: 0.9em; margin-right: 1rem; }
        button { background: #dc3545; color: white; border: none; padding: 0.3rem 0.6rem; border-radius: 4px; cursor: pointer; }
        button:hover { background: #c82333; }
        .upload-form { background: #f8f9fa; padding: 1rem; border-radius: 4px; margin-bottom: 2rem; }
        .upload-form button { background: #007bff; margin-top: 10px; display: block; }
    </style>
</head>
<body>
    <h1>File Manager</h1>

    <div class="upload-form">
        <h2>Upload File</h2>
        <form action="/upload" method="post" enctype="multipart/form-data">
            <input type="file" name="file" required>
            <button type="submit">Upload</button>
        </form>
    </div>
"#;

const TAIL: &str = "    </ul>\n</body>\n</html>\n";

pub fn render_listing(files: &[FileRecord]) -> String {
    let mut html = String::with_capacity(HEAD.len() + TAIL.len() + files.len() * 512);
    html.push_str(HEAD);
    let _ = writeln!(html, "\n    <h2>Files ({})</h2>\n    <ul>", files.len());

    if files.is_empty() {
        html.push_str("        <li>No files found.</li>\n");
    }

    for file in files {
        let name = escape_html(&file.name);
        let href = percent_encode_segment(&file.name);
        let confirm = escape_html(&format!(
            "return confirm('Are you sure you want to delete {}?')",
            escape_js(&file.name)
        ));
        let _ = write!(
            html,
            r#"        <li>
            <span><a href="/download/{href}">{name}</a></span>
            <div>
                <span class="meta">{size}</span>
                <form action="/delete/{href}" method="post" onsubmit="{confirm}" style="display:inline;">
                    <input type="hidden" name="_method" value="DELETE">
                    <button type="submit">Delete</button>
                </form>
            </div>
        </li>
"#,
            size = escape_html(&file.size_display),
        );
    }

    html.push_str(TAIL);
    html
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape for use inside a single-quoted JavaScript string literal.
fn escape_js(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_') {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{:04x}", unit);
            }
        }
    }
    out
}

/// Percent-encode a single URL path segment. Unreserved characters pass
/// through; everything else, `/` included, is encoded byte by byte.
pub fn percent_encode_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing() {
        let html = render_listing(&[]);
        assert!(html.contains("Files (0)"));
        assert!(html.contains("No files found."));
    }

    #[test]
    fn test_listing_rows() {
        let files = vec![
            FileRecord { name: "report.txt".into(), size_display: "10 B".into() },
            FileRecord { name: "a b.bin".into(), size_display: "1.5 KB".into() },
        ];
        let html = render_listing(&files);
        assert!(html.contains("Files (2)"));
        assert!(html.contains(r#"<a href="/download/report.txt">report.txt</a>"#));
        assert!(html.contains(r#"action="/delete/a%20b.bin""#));
        assert!(html.contains("1.5 KB"));
        assert!(!html.contains("No files found."));
    }

    #[test]
    fn test_names_are_escaped() {
        let files = vec![FileRecord {
            name: "<script>alert('x')</script>".into(),
            size_display: "1 B".into(),
        }];
        let html = render_listing(&files);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_percent_encode_segment() {
        assert_eq!(percent_encode_segment("plain-name_1.txt~"), "plain-name_1.txt~");
        assert_eq!(percent_encode_segment("a b#?%"), "a%20b%23%3F%25");
        assert_eq!(percent_encode_segment("é"), "%C3%A9");
    }

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("it's.txt"), "it\\u0027s.txt");
        assert_eq!(escape_js("a</b"), "a\\u003c\\u002fb");
    }
}
