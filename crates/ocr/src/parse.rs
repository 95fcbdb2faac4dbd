//! Score-row extraction from raw OCR text boxes.
//!
//! Result screenshots list one player per visual line with the score at
//! the line's right edge. Boxes arrive unordered; rows are rebuilt by
//! clustering on vertical position, then each row is read as
//! `<name tokens...> <score>`.

use super::TextBox;
use mkw_core::MAX_SCORE;
use mkw_core::Score;

/// One extracted `(raw name, score)` row, pre-resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLine {
    pub raw_name: String,
    pub score: Score,
}

/// Minimum vertical tolerance when clustering boxes into rows.
const ROW_TOLERANCE_FLOOR: i32 = 8;

/// Extract score rows from OCR boxes. Lines without a trailing integer in
/// `0..=999`, or with nothing left for a name, are skipped silently; the
/// caller decides whether a short row count is a failure.
pub fn score_lines(boxes: &[TextBox]) -> Vec<ScoreLine> {
    rows(boxes)
        .into_iter()
        .filter_map(|row| read_row(&row))
        .collect()
}

/// Cluster boxes into visual rows by y-center proximity, each row sorted
/// left to right.
fn rows(boxes: &[TextBox]) -> Vec<Vec<&TextBox>> {
    let mut sorted = boxes.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|b| (center_y(b), b.bounds.0));
    let tolerance = tolerance(boxes);
    let mut rows: Vec<Vec<&TextBox>> = Vec::new();
    for b in sorted {
        match rows.last_mut() {
            Some(row) if (center_y(b) - row_y(row)).abs() <= tolerance => row.push(b),
            _ => rows.push(vec![b]),
        }
    }
    for row in rows.iter_mut() {
        row.sort_by_key(|b| b.bounds.0);
    }
    rows
}

fn center_y(b: &TextBox) -> i32 {
    b.bounds.1 + b.bounds.3 / 2
}

fn row_y(row: &[&TextBox]) -> i32 {
    center_y(row.last().expect("rows are never empty"))
}

/// Half the median box height, floored so tiny boxes still cluster.
fn tolerance(boxes: &[TextBox]) -> i32 {
    let mut heights = boxes.iter().map(|b| b.bounds.3).collect::<Vec<_>>();
    heights.sort_unstable();
    match heights.get(heights.len() / 2) {
        Some(median) => (median / 2).max(ROW_TOLERANCE_FLOOR),
        None => ROW_TOLERANCE_FLOOR,
    }
}

fn read_row(row: &[&TextBox]) -> Option<ScoreLine> {
    let joined = row
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let mut tokens = joined.split_whitespace().collect::<Vec<_>>();
    let score = tokens.pop().and_then(parse_score)?;
    let raw_name = tokens.join(" ");
    match raw_name.is_empty() {
        true => None,
        false => Some(ScoreLine { raw_name, score }),
    }
}

/// A score token may pick up stray punctuation from OCR; strip it before
/// parsing, then bound the value.
fn parse_score(token: &str) -> Option<Score> {
    let trimmed = token.trim_matches(|c: char| matches!(c, '.' | ',' | ':' | ';'));
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let score = trimmed.parse::<Score>().ok()?;
    (0..=MAX_SCORE).contains(&score).then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x: i32, y: i32) -> TextBox {
        TextBox::new(text.to_string(), (x, y, 60, 16), 90.0)
    }

    #[test]
    fn one_box_per_line() {
        let boxes = vec![word("Alpha 95", 0, 0), word("Beta 80", 0, 24)];
        let lines = score_lines(&boxes);
        assert_eq!(
            lines,
            vec![
                ScoreLine {
                    raw_name: "Alpha".to_string(),
                    score: 95
                },
                ScoreLine {
                    raw_name: "Beta".to_string(),
                    score: 80
                },
            ]
        );
    }

    #[test]
    fn split_boxes_regroup_by_row() {
        let boxes = vec![
            word("95", 200, 2),
            word("Alpha", 0, 0),
            word("Beta", 0, 24),
            word("80", 200, 26),
        ];
        let lines = score_lines(&boxes);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].raw_name, "Alpha");
        assert_eq!(lines[0].score, 95);
        assert_eq!(lines[1].raw_name, "Beta");
    }

    #[test]
    fn multi_word_names_join() {
        let boxes = vec![word("Big", 0, 0), word("Cat", 70, 0), word("123", 200, 0)];
        let lines = score_lines(&boxes);
        assert_eq!(lines[0].raw_name, "Big Cat");
        assert_eq!(lines[0].score, 123);
    }

    #[test]
    fn lines_without_scores_are_skipped() {
        let boxes = vec![word("WAR RESULTS", 0, 0), word("Alpha 95", 0, 24)];
        let lines = score_lines(&boxes);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].raw_name, "Alpha");
    }

    #[test]
    fn score_without_name_is_skipped() {
        let boxes = vec![word("95", 0, 0)];
        assert!(score_lines(&boxes).is_empty());
    }

    #[test]
    fn out_of_range_scores_rejected() {
        let boxes = vec![word("Alpha 1000", 0, 0)];
        assert!(score_lines(&boxes).is_empty());
    }

    #[test]
    fn trailing_punctuation_tolerated() {
        let boxes = vec![word("Alpha 95.", 0, 0)];
        assert_eq!(score_lines(&boxes)[0].score, 95);
    }

    #[test]
    fn names_with_digits_do_not_lose_them() {
        let boxes = vec![word("Wi11ow 85", 0, 0)];
        let lines = score_lines(&boxes);
        assert_eq!(lines[0].raw_name, "Wi11ow");
        assert_eq!(lines[0].score, 85);
    }

    #[test]
    fn empty_input() {
        assert!(score_lines(&[]).is_empty());
    }
}
