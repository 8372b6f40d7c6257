use crate::core::model::FileRef;
use crate::core::presenter::{RenderedResults, ResultRow};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct ResultsState {
    rendered: Option<RenderedResults>,
    checked: Vec<bool>,
}

/// The result list region: what is rendered and which rows are checked.
///
/// Rows are identified by the full path they were rendered from, never by
/// their display text.
#[derive(Clone, Default)]
pub struct ResultsView {
    inner: Arc<Mutex<ResultsState>>,
}

impl ResultsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list. All rows start unchecked.
    pub async fn show(&self, rendered: RenderedResults) {
        let mut s = self.inner.lock().await;
        s.checked = vec![false; rendered.rows.len()];
        s.rendered = Some(rendered);
    }

    pub async fn rendered(&self) -> Option<RenderedResults> {
        self.inner.lock().await.rendered.clone()
    }

    pub async fn rows(&self) -> Vec<ResultRow> {
        self.inner
            .lock()
            .await
            .rendered
            .as_ref()
            .map(|r| r.rows.clone())
            .unwrap_or_default()
    }

    /// Returns false when `index` is not a rendered row.
    pub async fn set_checked(&self, index: usize, checked: bool) -> bool {
        let mut s = self.inner.lock().await;
        match s.checked.get_mut(index) {
            Some(c) => {
                *c = checked;
                true
            }
            None => false,
        }
    }

    pub async fn check_all(&self) {
        let mut s = self.inner.lock().await;
        s.checked.iter_mut().for_each(|c| *c = true);
    }

    /// Checks every row whose path is in `paths`; returns how many matched.
    pub async fn check_paths(&self, paths: &[String]) -> usize {
        let mut s = self.inner.lock().await;
        let ResultsState { rendered, checked } = &mut *s;
        let Some(rendered) = rendered else { return 0 };
        let mut hits = 0;
        for (row, c) in rendered.rows.iter().zip(checked.iter_mut()) {
            if paths.iter().any(|p| *p == row.path) {
                *c = true;
                hits += 1;
            }
        }
        hits
    }

    pub async fn selected(&self) -> Vec<FileRef> {
        let s = self.inner.lock().await;
        let Some(rendered) = &s.rendered else { return vec![] };
        rendered
            .rows
            .iter()
            .zip(&s.checked)
            .filter(|(_, c)| **c)
            .map(|(row, _)| FileRef::new(row.path.clone()))
            .collect()
    }
}

/// Parses `all` or 1-based row numbers and ranges like `1,3,5-7`.
pub fn parse_selection(spec: &str, rows: usize) -> Result<Vec<usize>, String> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return Ok((0..rows).collect());
    }
    let mut out = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (parse_row(a, rows)?, parse_row(b, rows)?),
            None => {
                let n = parse_row(part, rows)?;
                (n, n)
            }
        };
        if lo > hi {
            return Err(format!("empty range {part}"));
        }
        for i in lo..=hi {
            if !out.contains(&i) {
                out.push(i);
            }
        }
    }
    Ok(out)
}

fn parse_row(s: &str, rows: usize) -> Result<usize, String> {
    let n: usize = s.trim().parse().map_err(|_| format!("not a row number: {s}"))?;
    if n == 0 || n > rows {
        return Err(format!("row {n} out of range 1..={rows}"));
    }
    Ok(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FileEntry;
    use crate::core::presenter::render_results;
    use crate::i18n::EN;

    async fn view() -> ResultsView {
        let files = vec![
            FileEntry::new("/mnt/usb/a.jpg", Some(12.0)),
            FileEntry::new("/mnt/usb/<b>.txt", Some(3.0)),
            FileEntry::new("C:\\c.doc", None),
        ];
        let v = ResultsView::new();
        v.show(render_results(&files, &EN)).await;
        v
    }

    #[tokio::test]
    async fn selection_carries_original_paths() {
        let v = view().await;
        assert!(v.selected().await.is_empty());
        assert!(v.set_checked(1, true).await);
        assert!(!v.set_checked(9, true).await);
        assert_eq!(v.selected().await, vec![FileRef::new("/mnt/usb/<b>.txt")]);
    }

    #[tokio::test]
    async fn re_render_resets_checks() {
        let v = view().await;
        v.check_all().await;
        assert_eq!(v.selected().await.len(), 3);
        v.show(render_results(&[FileEntry::new("/x", None)], &EN)).await;
        assert!(v.selected().await.is_empty());
        assert_eq!(v.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn check_by_path() {
        let v = view().await;
        assert_eq!(v.check_paths(&["C:\\c.doc".to_string(), "/nope".to_string()]).await, 1);
        assert_eq!(v.selected().await, vec![FileRef::new("C:\\c.doc")]);
    }

    #[test]
    fn selection_specs() {
        assert_eq!(parse_selection("all", 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_selection("1, 3", 3).unwrap(), vec![0, 2]);
        assert_eq!(parse_selection("2-3,2", 3).unwrap(), vec![1, 2]);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection("x", 3).is_err());
        assert!(parse_selection("", 3).unwrap().is_empty());
    }
}
