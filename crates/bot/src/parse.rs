//! The `Name:Score[,Name:Score]*` command grammar.
//!
//! Whitespace around commas and colons is ignored; colons are required;
//! scores are integers in 0..=999.

use mkw_core::MAX_SCORE;
use mkw_core::Score;

/// Grammar violations, rendered directly to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    MissingColon(String),
    EmptyName(String),
    BadScore(String),
    DuplicateName(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "expected Name:Score[,Name:Score]"),
            Self::MissingColon(part) => write!(f, "missing ':' in \"{}\"", part),
            Self::EmptyName(part) => write!(f, "missing player name in \"{}\"", part),
            Self::BadScore(part) => write!(f, "score must be 0-999 in \"{}\"", part),
            Self::DuplicateName(name) => write!(f, "{} listed twice", name),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a `player_scores` argument into `(name, score)` pairs.
pub fn parse_scores(input: &str) -> Result<Vec<(String, Score)>, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut entries: Vec<(String, Score)> = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(ParseError::Empty);
        }
        let (name, score) = part
            .split_once(':')
            .ok_or_else(|| ParseError::MissingColon(part.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::EmptyName(part.to_string()));
        }
        let score = score
            .trim()
            .parse::<Score>()
            .ok()
            .filter(|s| (0..=MAX_SCORE).contains(s))
            .ok_or_else(|| ParseError::BadScore(part.to_string()))?;
        if entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Err(ParseError::DuplicateName(name.to_string()));
        }
        entries.push((name.to_string(), score));
    }
    Ok(entries)
}

/// Render pairs back into canonical grammar form.
pub fn render_scores(entries: &[(String, Score)]) -> String {
    entries
        .iter()
        .map(|(name, score)| format!("{}:{}", name, score))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_list() {
        let parsed = parse_scores("Alpha:95,Beta:80").unwrap();
        assert_eq!(
            parsed,
            vec![("Alpha".to_string(), 95), ("Beta".to_string(), 80)]
        );
    }

    #[test]
    fn whitespace_insensitive() {
        let parsed = parse_scores("  Alpha : 95 ,  Beta:80 ").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("Alpha".to_string(), 95));
    }

    #[test]
    fn parse_render_identity_modulo_whitespace() {
        let input = "Alpha : 95, Beta:80 ,Big Cat:123";
        let parsed = parse_scores(input).unwrap();
        let rendered = render_scores(&parsed);
        assert_eq!(rendered, "Alpha:95,Beta:80,Big Cat:123");
        assert_eq!(parse_scores(&rendered).unwrap(), parsed);
    }

    #[test]
    fn colon_required() {
        assert!(matches!(
            parse_scores("Alpha 95"),
            Err(ParseError::MissingColon(_))
        ));
    }

    #[test]
    fn score_bounds() {
        assert!(parse_scores("A:0").is_ok());
        assert!(parse_scores("A:999").is_ok());
        assert!(matches!(parse_scores("A:1000"), Err(ParseError::BadScore(_))));
        assert!(matches!(parse_scores("A:-1"), Err(ParseError::BadScore(_))));
        assert!(matches!(parse_scores("A:ninety"), Err(ParseError::BadScore(_))));
    }

    #[test]
    fn empty_and_degenerate_input() {
        assert!(matches!(parse_scores(""), Err(ParseError::Empty)));
        assert!(matches!(parse_scores("  "), Err(ParseError::Empty)));
        assert!(matches!(parse_scores("A:1,,B:2"), Err(ParseError::Empty)));
        assert!(matches!(parse_scores(":95"), Err(ParseError::EmptyName(_))));
    }

    #[test]
    fn duplicates_rejected() {
        assert!(matches!(
            parse_scores("Alpha:95,alpha:80"),
            Err(ParseError::DuplicateName(_))
        ));
    }
}
