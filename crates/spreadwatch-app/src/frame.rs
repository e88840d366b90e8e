//! Plain-text rendering of a view.

use std::fmt;

use spreadwatch_view::{RenderedRow, RowStatus};

/// Everything the console prints for one view.
#[derive(Debug, Clone, Default)]
pub struct TableFrame {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<RenderedRow>,
    /// Shown only while the initial request is outstanding.
    pub loading: bool,
    pub last_error: Option<String>,
    /// Rows with an action in flight.
    pub busy: Vec<String>,
    pub footer: Option<String>,
}

impl TableFrame {
    pub fn fallback_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_fallback()).count()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

fn write_cells(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    cells: &[String],
    widths: &[usize],
) -> fmt::Result {
    let line: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
        .collect();
    writeln!(f, "{prefix}{}", line.join(" | ").trim_end())
}

impl fmt::Display for TableFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        if self.loading {
            writeln!(f, "  loading...")?;
        }
        if let Some(error) = &self.last_error {
            writeln!(f, "  ! refresh failed, showing last data: {error}")?;
        }

        let widths = self.widths();
        if !self.headers.is_empty() {
            write_cells(f, "  ", &self.headers, &widths)?;
            let rule: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 3;
            writeln!(f, "  {}", "-".repeat(rule))?;
        }

        for row in &self.rows {
            match &row.status {
                RowStatus::Ok => {
                    // busy rows are starred
                    let prefix = if self.busy.contains(&row.key) { "* " } else { "  " };
                    write_cells(f, prefix, &row.cells, &widths)?;
                }
                RowStatus::Fallback { marker } => writeln!(f, "  [{}] {}", row.key, marker)?,
            }
        }

        if self.rows.is_empty() && !self.loading {
            writeln!(f, "  (no data)")?;
        }
        if let Some(footer) = &self.footer {
            writeln!(f, "  {footer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, cells: &[&str]) -> RenderedRow {
        RenderedRow {
            key: key.into(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
            status: RowStatus::Ok,
        }
    }

    #[test]
    fn test_render_aligns_columns_and_marks_fallbacks() {
        let frame = TableFrame {
            title: "users".into(),
            headers: vec!["id".into(), "email".into()],
            rows: vec![
                row("1", &["1", "a@example.com"]),
                RenderedRow {
                    key: "2".into(),
                    cells: vec![],
                    status: RowStatus::Fallback {
                        marker: "could not render".into(),
                    },
                },
            ],
            ..TableFrame::default()
        };

        let text = frame.to_string();
        assert!(text.starts_with("== users ==\n"));
        assert!(text.contains("  id | email"));
        assert!(text.contains("  1  | a@example.com"));
        assert!(text.contains("[2] could not render"));
        assert_eq!(frame.fallback_count(), 1);
    }

    #[test]
    fn test_empty_frame_says_no_data_unless_loading() {
        let mut frame = TableFrame {
            title: "symbols".into(),
            ..TableFrame::default()
        };
        assert!(frame.to_string().contains("(no data)"));

        frame.loading = true;
        let text = frame.to_string();
        assert!(text.contains("loading..."));
        assert!(!text.contains("(no data)"));
    }
}
