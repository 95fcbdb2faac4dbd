//! Name resolution for OCR-extracted player tokens.
//!
//! Maps a raw OCR string to a canonical roster identity in three stages,
//! returning at the first hit:
//!
//! 1. Case-insensitive exact match on the canonical name.
//! 2. Case-insensitive nickname match, with a longest-name tie-break when
//!    more than one player claims the alias.
//! 3. Fuzzy match: digit confusables folded, then Levenshtein distance
//!    bounded by ⌊len/4⌋ and an absolute cap of 2; only an unambiguous
//!    winner is accepted.
//!
//! The resolver works on an immutable [`Roster`] snapshot and is safe to
//! call concurrently.
mod roster;

pub use roster::*;

/// Outcome of resolving one raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical roster name, or the raw token when unresolved.
    pub name: String,
    pub is_roster_member: bool,
}

impl Resolution {
    fn hit(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_roster_member: true,
        }
    }
    fn miss(raw: &str) -> Self {
        Self {
            name: raw.to_string(),
            is_roster_member: false,
        }
    }
}

/// Resolve `raw` against the roster snapshot.
pub fn resolve(roster: &Roster, raw: &str) -> Resolution {
    let raw = raw.trim();
    if raw.is_empty() {
        return Resolution::miss(raw);
    }
    if let Some(name) = exact(roster, raw) {
        return Resolution::hit(name);
    }
    if let Some(name) = nickname(roster, raw) {
        return Resolution::hit(name);
    }
    if let Some(name) = fuzzy(roster, raw) {
        return Resolution::hit(name);
    }
    Resolution::miss(raw)
}

fn exact<'a>(roster: &'a Roster, raw: &str) -> Option<&'a str> {
    roster
        .entries()
        .iter()
        .find(|e| e.name().eq_ignore_ascii_case(raw))
        .map(|e| e.name())
}

fn nickname<'a>(roster: &'a Roster, raw: &str) -> Option<&'a str> {
    let claimants = roster
        .entries()
        .iter()
        .filter(|e| e.nicknames().iter().any(|n| n.eq_ignore_ascii_case(raw)))
        .collect::<Vec<_>>();
    match claimants.as_slice() {
        [] => None,
        [only] => Some(only.name()),
        many => disambiguate(many),
    }
}

/// Among several claimants, prefer the player whose canonical name or any
/// nickname is longest; break remaining ties by canonical-name order. A
/// tie that survives both rules stays unresolved.
fn disambiguate<'a>(claimants: &[&'a RosterEntry]) -> Option<&'a str> {
    let longest = |e: &RosterEntry| {
        e.nicknames()
            .iter()
            .map(|n| n.chars().count())
            .chain(std::iter::once(e.name().chars().count()))
            .max()
            .unwrap_or(0)
    };
    let best = claimants.iter().map(|e| longest(e)).max()?;
    let mut winners = claimants
        .iter()
        .filter(|e| longest(e) == best)
        .collect::<Vec<_>>();
    winners.sort_by(|a, b| a.name().cmp(b.name()));
    match winners.as_slice() {
        [winner, ..] if winners.len() == 1 => Some(winner.name()),
        [first, second, ..] if first.name() != second.name() => Some(first.name()),
        _ => None,
    }
}

fn fuzzy<'a>(roster: &'a Roster, raw: &str) -> Option<&'a str> {
    let folded = fold(raw);
    let budget = (raw.chars().count() / 4).min(2);
    let mut qualified: Vec<&str> = Vec::new();
    for entry in roster.entries() {
        let candidates = entry
            .nicknames()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(entry.name()));
        let close = candidates
            .map(|c| strsim::levenshtein(&folded, &fold(c)))
            .any(|d| d <= budget);
        if close && !qualified.contains(&entry.name()) {
            qualified.push(entry.name());
        }
    }
    match qualified.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Lowercase and fold digit-for-letter OCR confusables.
fn fold(s: &str) -> String {
    s.chars()
        .map(|c| match c.to_ascii_lowercase() {
            '0' => 'o',
            '1' => 'l',
            '5' => 's',
            '3' => 'e',
            lower => lower,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkw_records::MemberStatus;
    use mkw_records::Player;

    fn roster(entries: &[(&str, &[&str])]) -> Roster {
        let players = entries
            .iter()
            .map(|(name, nicks)| {
                let mut p = Player::new(1, name.to_string(), MemberStatus::Member);
                for n in nicks.iter() {
                    p.add_nickname(n.to_string()).unwrap();
                }
                p
            })
            .collect::<Vec<_>>();
        Roster::snapshot(&players)
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let r = roster(&[("Alpha", &[]), ("Beta", &[])]);
        assert_eq!(resolve(&r, "alpha"), Resolution::hit("Alpha"));
        assert_eq!(resolve(&r, "ALPHA"), Resolution::hit("Alpha"));
    }

    #[test]
    fn nickname_match() {
        let r = roster(&[("Alpha", &["Alph"]), ("Beta", &[])]);
        assert_eq!(resolve(&r, "alph"), Resolution::hit("Alpha"));
    }

    #[test]
    fn exact_beats_nickname() {
        // "Beta" is also someone's nickname; the canonical owner wins.
        let r = roster(&[("Alpha", &["Beta"]), ("Beta", &[])]);
        assert_eq!(resolve(&r, "Beta"), Resolution::hit("Beta"));
    }

    #[test]
    fn ambiguous_nickname_prefers_longest_name() {
        let r = roster(&[("Al", &["Ace"]), ("Bartholomew", &["Ace"])]);
        assert_eq!(resolve(&r, "Ace"), Resolution::hit("Bartholomew"));
    }

    #[test]
    fn ambiguous_nickname_ties_break_lexicographically() {
        let r = roster(&[("Brave", &["Ace"]), ("Amber", &["Ace"])]);
        assert_eq!(resolve(&r, "Ace"), Resolution::hit("Amber"));
    }

    #[test]
    fn confusables_fold_to_fuzzy_hit() {
        let r = roster(&[("Willow", &[]), ("Beta", &[])]);
        let res = resolve(&r, "Wi11ow");
        assert_eq!(res, Resolution::hit("Willow"));
    }

    #[test]
    fn fuzzy_respects_length_budget() {
        // len 4 → budget floor(4/4) = 1; two edits is too far.
        let r = roster(&[("Finn", &[])]);
        assert_eq!(resolve(&r, "Fynn"), Resolution::hit("Finn"));
        assert!(!resolve(&r, "Fymm").is_roster_member);
    }

    #[test]
    fn fuzzy_absolute_cap_is_two() {
        // Long token, budget would be 3 by length; cap holds it at 2.
        let r = roster(&[("Maximilian", &[])]);
        assert_eq!(resolve(&r, "Maxmilian"), Resolution::hit("Maximilian"));
        assert!(!resolve(&r, "Mxmilin").is_roster_member);
    }

    #[test]
    fn ambiguous_fuzzy_falls_through() {
        let r = roster(&[("Dana", &[]), ("Dane", &[])]);
        let res = resolve(&r, "Dan4");
        assert!(!res.is_roster_member);
        assert_eq!(res.name, "Dan4");
    }

    #[test]
    fn miss_returns_raw_token() {
        let r = roster(&[("Alpha", &[])]);
        let res = resolve(&r, "Zebra");
        assert_eq!(res, Resolution::miss("Zebra"));
    }

    #[test]
    fn empty_input_is_a_miss() {
        let r = roster(&[("Alpha", &[])]);
        assert!(!resolve(&r, "   ").is_roster_member);
    }

    #[test]
    fn nickname_on_fuzzy_path() {
        let r = roster(&[("Willow", &["Wisp"])]);
        assert_eq!(resolve(&r, "W1sp"), Resolution::hit("Willow"));
    }
}
