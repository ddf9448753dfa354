use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_project_date;
use crate::params::{Direction, SortKey};
use crate::view::{StatusSummary, TaskRow, TaskView};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true) && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_view(&self, view: &TaskView<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_view(&mut out, view)
    }

    /// One column per sortable key after the id column. The primary sort
    /// column carries an arrow; the footer lists the click target of every
    /// header.
    pub fn write_view<W: Write>(&self, mut out: W, view: &TaskView<'_>) -> anyhow::Result<()> {
        let mut headers = vec!["ID".to_string()];
        for column in &view.header.columns {
            let arrow = match column.active {
                Some(Direction::Asc) => " ^",
                Some(Direction::Desc) => " v",
                None => "",
            };
            headers.push(format!("{}{arrow}", column.label));
        }

        let rows = view
            .rows
            .iter()
            .map(|row| {
                let id = match row.subtask {
                    Some(sub) => format!("{}.{}", row.task.id, sub.id),
                    None => row.task.id.to_string(),
                };
                let mut cells = vec![self.paint(&id, "33")];
                cells.extend(
                    view.header
                        .columns
                        .iter()
                        .map(|column| self.cell(row, column.key)),
                );
                cells
            })
            .collect();

        write_table(&mut out, headers, rows)?;

        writeln!(out)?;
        for column in &view.header.columns {
            writeln!(out, "{:<10} order={}", column.key.as_str(), column.next_query)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, view))]
    pub fn print_view_json(&self, view: &TaskView<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, view)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn write_summary<W: Write>(
        &self,
        mut out: W,
        summary: &StatusSummary,
    ) -> anyhow::Result<()> {
        writeln!(out, "total        {}", summary.total)?;
        writeln!(out, "pending      {}", summary.pending)?;
        writeln!(out, "in progress  {}", summary.in_progress)?;
        writeln!(out, "completed    {}", summary.completed)?;
        Ok(())
    }

    pub fn print_summary(&self, summary: &StatusSummary) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_summary(out, summary)
    }

    fn cell(&self, row: &TaskRow<'_>, key: SortKey) -> String {
        let task = row.task;
        match key {
            SortKey::Title => row.title().to_string(),
            SortKey::Category => task.category.name.clone(),
            SortKey::Progress => format!("{}%", row.progress),
            SortKey::Deadline => {
                let text = task.deadline.map(format_project_date).unwrap_or_default();
                if row.overdue {
                    self.paint(&text, "31")
                } else {
                    text
                }
            }
            SortKey::Priority => task.priority.name.clone(),
            SortKey::Status => row.status().label().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use tempfile::tempdir;

    use super::{Renderer, strip_ansi};
    use crate::config::Config;
    use crate::order::{Comparators, Listing};
    use crate::params::RequestParams;
    use crate::task::{Category, Priority, Status, Task};
    use crate::view::{Snapshot, StatusSummary, ViewOptions, build_view};

    #[test]
    fn color_setting_comes_from_config() {
        let dir = tempdir().expect("tempdir");
        let rc = dir.path().join("hangarrc");

        fs::write(&rc, "color = off\n").expect("write rc");
        let cfg = Config::load(Some(&rc)).expect("load config");
        assert!(!Renderer::new(&cfg).expect("renderer").color);

        fs::write(&rc, "color = sometimes\n").expect("write rc");
        let cfg = Config::load(Some(&rc)).expect("load config");
        let err = Renderer::new(&cfg).expect_err("invalid color must fail");
        assert!(err.to_string().contains("invalid color setting"));
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[31m2026-03-01\x1b[0m"), "2026-03-01");
    }

    #[test]
    fn table_marks_primary_column_and_lists_click_targets() {
        let now = Utc::now();
        let work = Category {
            id: 1,
            name: "Work".to_string(),
        };
        let low = Priority {
            id: 4,
            name: "Low".to_string(),
        };
        let snapshot = Snapshot {
            tasks: vec![Task::new_pending(
                7,
                "Quarterly report".to_string(),
                work.clone(),
                low.clone(),
                now,
            )],
            categories: vec![work],
            priorities: vec![low],
        };
        let params = RequestParams::from_query([("order", "-title")]);
        let view = build_view(
            &snapshot,
            &params,
            &ViewOptions::new(Listing::Tasks, now),
            &Comparators::standard(),
        );

        let mut out = Vec::new();
        Renderer::plain().write_view(&mut out, &view).expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("Title v"));
        assert!(text.contains("Quarterly report"));
        assert!(text.contains("0%"));
        assert!(text.contains("deadline   order=deadline,-title"));
        assert!(text.contains("title      order=title"));
    }

    #[test]
    fn subtask_rows_show_parent_and_subtask_ids() {
        let now = Utc::now();
        let work = Category {
            id: 1,
            name: "Work".to_string(),
        };
        let low = Priority {
            id: 4,
            name: "Low".to_string(),
        };
        let mut task =
            Task::new_pending(7, "Quarterly report".to_string(), work.clone(), low.clone(), now);
        task.add_subtask(3, "Draft charts", Status::InProgress);
        let snapshot = Snapshot {
            tasks: vec![task],
            categories: vec![work],
            priorities: vec![low],
        };
        let view = build_view(
            &snapshot,
            &RequestParams::default(),
            &ViewOptions::new(Listing::SubTasks, now),
            &Comparators::standard(),
        );

        let mut out = Vec::new();
        Renderer::plain().write_view(&mut out, &view).expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("7.3"));
        assert!(text.contains("Draft charts"));
        assert!(text.contains("In Progress"));
        assert!(text.contains("50%"));
        assert!(!text.contains("Quarterly report"));
    }

    #[test]
    fn summary_lists_each_status() {
        let mut out = Vec::new();
        let summary = StatusSummary {
            total: 4,
            pending: 2,
            in_progress: 1,
            completed: 1,
        };
        Renderer::plain().write_summary(&mut out, &summary).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("in progress  1"));
        assert!(text.starts_with("total        4"));
    }
}
