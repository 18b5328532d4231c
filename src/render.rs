//! Plain-text rendering of books, scan progress and chapter pages.

use glean_core::api::types::{Book, ScanStatus};
use glean_core::view::ReaderAppearance;

pub fn book_line(book: &Book) -> String {
    let star = if book.is_starred { '*' } else { ' ' };
    let progress = match (book.is_finished, book.chapter_index) {
        (true, _) => "finished".to_string(),
        (false, Some(index)) => format!("chapter {}", index + 1),
        (false, None) => "unread".to_string(),
    };
    format!("{:>5} {star} {}  [{progress}]", book.id, book.title)
}

pub fn book_table(books: &[Book]) -> String {
    if books.is_empty() {
        return "No books.".to_string();
    }
    books.iter().map(book_line).collect::<Vec<_>>().join("\n")
}

pub fn scan_line(status: &ScanStatus) -> String {
    let state = if status.is_running { "running" } else { "idle" };
    let mut line = format!(
        "scan {state}: {}/{} files, {} added, {} updated",
        status.files_scanned, status.total_files, status.files_added, status.files_updated
    );
    if status.is_running && !status.current_file.is_empty() {
        line.push_str(&format!(" ({})", status.current_file));
    }
    if let Some(err) = &status.error {
        line.push_str(&format!("\n  error: {err}"));
    }
    line
}

/// Lines of `content` wrapped to the width implied by the appearance.
///
/// Larger fonts and wider padding leave fewer columns in an 80-column
/// terminal; paragraphs are separated by blank lines per paragraph spacing.
pub fn layout_lines(content: &str, appearance: &ReaderAppearance) -> Vec<String> {
    let width = text_width(appearance);
    let gap = appearance.paragraph_spacing.round() as usize;
    let mut lines = Vec::new();
    for paragraph in content.lines().map(str::trim).filter(|p| !p.is_empty()) {
        if !lines.is_empty() {
            lines.extend(std::iter::repeat_n(String::new(), gap));
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn text_width(appearance: &ReaderAppearance) -> usize {
    let columns = 80.0 * 18.0 / appearance.font_size.max(1) as f32;
    let padding = (appearance.padding_horizontal / 8) as f32 * 2.0;
    (columns - padding).clamp(20.0, 160.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_to_the_appearance_width() {
        let appearance = ReaderAppearance {
            font_size: 36,
            padding_horizontal: 0,
            paragraph_spacing: 1.0,
            ..ReaderAppearance::default()
        };
        let text = "one two three four five six seven eight nine ten eleven\n\nsecond";
        let lines = layout_lines(text, &appearance);
        assert!(lines.iter().all(|line| line.chars().count() <= 40));
        assert_eq!(lines.last().map(String::as_str), Some("second"));
        assert!(lines.contains(&String::new()));
    }

    #[test]
    fn scan_line_mentions_errors() {
        let status = ScanStatus {
            is_running: false,
            files_scanned: 4,
            total_files: 4,
            error: Some("Books directory does not exist".to_string()),
            ..ScanStatus::default()
        };
        let line = scan_line(&status);
        assert!(line.starts_with("scan idle: 4/4 files"));
        assert!(line.contains("Books directory does not exist"));
    }
}
