//! Turns data already obtained from the backend into display text and
//! markup. Nothing here talks to the network.
//!
//! File paths come from arbitrary filesystem content, so every interpolated
//! value goes through [`escape_html`].

use crate::core::model::{FileEntry, FileRef, JobResult, PreviewPayload};
use crate::i18n::Messages;

const NO_EXT_LABEL: &str = "NO EXT";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// `12 KB`, `2.00 MB`, `1.50 GB`. Empty for unknown or zero sizes.
pub fn human_size(size_kb: Option<f64>) -> String {
    const MB: f64 = 1024.0;
    const GB: f64 = 1024.0 * 1024.0;
    match size_kb {
        Some(kb) if kb.is_finite() && kb > 0.0 => {
            if kb >= GB {
                format!("{:.2} GB", kb / GB)
            } else if kb >= MB {
                format!("{:.2} MB", kb / MB)
            } else if kb.fract() == 0.0 {
                format!("{} KB", kb as u64)
            } else {
                format!("{:.1} KB", kb)
            }
        }
        _ => String::new(),
    }
}

/// Extension counts in first-seen order. `None` is the "no extension" bucket.
pub fn summarize(files: &[FileEntry]) -> Vec<(Option<String>, usize)> {
    let mut counts: Vec<(Option<String>, usize)> = Vec::new();
    for f in files {
        let ext = f.extension();
        match counts.iter_mut().find(|(e, _)| *e == ext) {
            Some((_, n)) => *n += 1,
            None => counts.push((ext, 1)),
        }
    }
    counts
}

pub fn summary_label(ext: &Option<String>) -> String {
    match ext {
        Some(e) => e.to_uppercase(),
        None => NO_EXT_LABEL.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Original full path; the row's identity for selection.
    pub path: String,
    pub name: String,
    pub size: String,
    pub modified: Option<String>,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResults {
    pub summary: Vec<(String, usize)>,
    /// `None` hides the summary region.
    pub summary_html: Option<String>,
    pub rows: Vec<ResultRow>,
    pub list_html: String,
}

pub fn render_results(files: &[FileEntry], msg: &Messages) -> RenderedResults {
    if files.is_empty() {
        return RenderedResults {
            summary: vec![],
            summary_html: None,
            rows: vec![],
            list_html: format!("<p>{}</p>", escape_html(msg.no_files_found)),
        };
    }

    let summary: Vec<(String, usize)> = summarize(files)
        .iter()
        .map(|(ext, n)| (summary_label(ext), *n))
        .collect();

    let mut summary_html = format!("<h3>{}</h3><ul>", escape_html(msg.summary_header));
    for (label, n) in &summary {
        summary_html.push_str(&format!("<li><strong>{}</strong>: {}</li>", escape_html(label), n));
    }
    summary_html.push_str("</ul>");

    let rows: Vec<ResultRow> = files.iter().map(|f| render_row(f, msg)).collect();
    let list_html = rows.iter().map(|r| r.html.as_str()).collect::<Vec<_>>().join("\n");

    RenderedResults { summary, summary_html: Some(summary_html), rows, list_html }
}

fn render_row(f: &FileEntry, msg: &Messages) -> ResultRow {
    let name = f.display_name().to_string();
    let size = human_size(f.size_kb);
    let path = escape_html(&f.path);

    let mut html = String::from("<div class=\"result-row\"><label>");
    html.push_str(&format!("<input type=\"checkbox\" data-path=\"{path}\">"));
    html.push_str(&format!("<span class=\"file-name\">{}</span>", escape_html(&name)));
    html.push_str(&format!("<small class=\"file-path\">{path}</small>"));
    html.push_str(&format!("<small class=\"file-size\">{}</small>", escape_html(&size)));
    if let Some(m) = &f.modified_time {
        html.push_str(&format!("<small class=\"file-modified\">{}</small>", escape_html(m)));
    }
    html.push_str(&format!(
        "<button class=\"btn-preview\" data-path=\"{path}\">{}</button>",
        escape_html(msg.preview_action)
    ));
    html.push_str("</label></div>");

    ResultRow { path: f.path.clone(), name, size, modified: f.modified_time.clone(), html }
}

/// `"3"`, or `"unknown"` when the payload has no countable list.
pub fn recovered_count(recovered: Option<&[FileRef]>) -> String {
    recovered.map(|r| r.len().to_string()).unwrap_or_else(|| "unknown".to_string())
}

pub fn recovery_outcome(job: &JobResult, msg: &Messages) -> String {
    format!("{}: {}", msg.recovery_finished, recovered_count(job.recovered.as_deref()))
}

pub fn render_preview(payload: &PreviewPayload, msg: &Messages) -> String {
    match payload {
        PreviewPayload::Image { src } => format!("<img src=\"{}\" alt=\"Image preview\">", escape_html(src)),
        PreviewPayload::Text { content } => format!("<pre>{}</pre>", escape_html(content)),
        PreviewPayload::Error { message } => format!("<p class=\"error\">{}</p>", escape_html(message)),
        PreviewPayload::Unavailable => format!("<p>{}</p>", escape_html(msg.preview_unavailable)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::EN;

    fn usb_files() -> Vec<FileEntry> {
        vec![
            FileEntry::new("/mnt/usb/a.jpg", Some(12.0)),
            FileEntry::new("/mnt/usb/b.txt", Some(3.0)),
        ]
    }

    #[test]
    fn usb_scan_summary_and_rows() {
        let r = render_results(&usb_files(), &EN);
        assert_eq!(r.summary, vec![("JPG".to_string(), 1), ("TXT".to_string(), 1)]);
        assert_eq!(r.rows.len(), 2);
        assert_eq!(r.rows[0].name, "a.jpg");
        assert_eq!(r.rows[0].size, "12 KB");
        assert!(r.rows[1].html.contains("data-path=\"/mnt/usb/b.txt\""));
        assert!(r.summary_html.unwrap().contains("<strong>JPG</strong>: 1"));
    }

    #[test]
    fn script_paths_are_escaped() {
        let files = vec![FileEntry::new("/tmp/<script>alert('x')</script>.txt", None)];
        let r = render_results(&files, &EN);
        let row = &r.rows[0].html;
        assert!(!row.contains("<script>"));
        assert!(row.contains("&lt;script&gt;"));
        let path_cell = row
            .split("<small class=\"file-path\">")
            .nth(1)
            .and_then(|s| s.split("</small>").next())
            .unwrap();
        assert!(!path_cell.contains('<') && !path_cell.contains('>'));
        assert!(!path_cell.contains('\''));

        let name_cell = row
            .split("<span class=\"file-name\">")
            .nth(1)
            .and_then(|s| s.split("</span>").next())
            .unwrap();
        assert!(!name_cell.contains('<') && !name_cell.contains('>'));
    }

    #[test]
    fn rendering_is_idempotent() {
        let a = render_results(&usb_files(), &EN);
        let b = render_results(&usb_files(), &EN);
        assert_eq!(a, b);
    }

    #[test]
    fn grouping_keeps_first_seen_order_and_no_ext_bucket() {
        let files = vec![
            FileEntry::new("/d/z.PNG", None),
            FileEntry::new("/d/README", None),
            FileEntry::new("/d/a.png", None),
            FileEntry::new("C:\\d\\b.Doc", None),
            FileEntry::new("/d.dir/Makefile", None),
        ];
        let s = render_results(&files, &EN).summary;
        assert_eq!(
            s,
            vec![("PNG".to_string(), 2), ("NO EXT".to_string(), 2), ("DOC".to_string(), 1)]
        );
    }

    #[test]
    fn empty_list_hides_summary() {
        let r = render_results(&[], &EN);
        assert!(r.summary_html.is_none());
        assert_eq!(r.list_html, "<p>No files found.</p>");
    }

    #[test]
    fn sizes() {
        assert_eq!(human_size(None), "");
        assert_eq!(human_size(Some(0.0)), "");
        assert_eq!(human_size(Some(3.0)), "3 KB");
        assert_eq!(human_size(Some(2.5)), "2.5 KB");
        assert_eq!(human_size(Some(2048.0)), "2.00 MB");
        assert_eq!(human_size(Some(1536.0 * 1024.0)), "1.50 GB");
    }

    #[test]
    fn recovery_count_falls_back_to_unknown() {
        let job = JobResult::default();
        assert_eq!(recovery_outcome(&job, &EN), "Recovery finished. Files recovered: unknown");
        let job = JobResult { recovered: Some(vec![FileRef::new("/a"), FileRef::new("/b")]), ..Default::default() };
        assert_eq!(recovery_outcome(&job, &EN), "Recovery finished. Files recovered: 2");
    }

    #[test]
    fn preview_variants() {
        assert_eq!(
            render_preview(&PreviewPayload::Text { content: "<b>x</b>".into() }, &EN),
            "<pre>&lt;b&gt;x&lt;/b&gt;</pre>"
        );
        let img = render_preview(&PreviewPayload::Image { src: "x\" onerror=\"y".into() }, &EN);
        assert!(img.contains("x&quot; onerror=&quot;y"));
        assert_eq!(render_preview(&PreviewPayload::Unavailable, &EN), "<p>Preview not available.</p>");
    }
}
