//! Result rendering and the presentation boundary

use crate::dataset::{CompanyRow, RowStream};
use crate::error::Result;
use crate::reference::title_case;
use tracing::{debug, info};

pub const NO_RESULTS: &str = "No results found!";

/// Output surface the controller and renderer write to.
pub trait Presenter {
    fn title(&mut self, text: &str);
    fn markdown(&mut self, line: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Writes result lines to stdout and notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn title(&mut self, text: &str) {
        println!("# {}", text);
    }

    fn markdown(&mut self, line: &str) {
        println!("{}", line);
    }

    fn warning(&mut self, message: &str) {
        eprintln!("[WARN] {}", message);
    }

    fn error(&mut self, message: &str) {
        eprintln!("[ERROR] {}", message);
    }
}

/// Keeps everything it is given, in order.
#[derive(Debug, Default, Clone)]
pub struct CollectingPresenter {
    pub titles: Vec<String>,
    pub lines: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Presenter for CollectingPresenter {
    fn title(&mut self, text: &str) {
        self.titles.push(text.to_string());
    }

    fn markdown(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Drain the stream once, one line per row in stream order.
///
/// Returns the number of rows rendered. An empty stream produces a single
/// "no results" warning. A failure mid-stream leaves the lines already
/// written in place and returns the error.
pub async fn render(mut rows: RowStream, out: &mut dyn Presenter) -> Result<usize> {
    let mut count = 0;
    while let Some(row) = rows.next().await {
        let row = row?;
        out.markdown(&format_row(&row));
        count += 1;
    }

    if count == 0 {
        debug!("Query produced no rows");
        out.warning(NO_RESULTS);
    } else {
        info!("Rendered {} companies", count);
    }
    Ok(count)
}

/// `Name since YYYY - [link](href)`
pub fn format_row(row: &CompanyRow) -> String {
    let name = title_case(&row.name);
    let since = non_empty(&row.founded)
        .map(|year| format!(" since {}", year.strip_suffix(".0").unwrap_or(year)))
        .unwrap_or_default();

    match non_empty(&row.website).or_else(|| non_empty(&row.linkedin_url)) {
        Some(link) => format!("{}{} - [{}]({})", name, since, link, href(link)),
        None => format!("{}{}", name, since),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn href(link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("https://www.{}", link)
    }
}
