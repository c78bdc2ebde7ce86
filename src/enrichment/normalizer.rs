//! Artist/title text normalization.
//!
//! Artist strings are rewritten by an ordered rule table. Each rule sees the
//! output of the rules before it, so the table order is part of the observable
//! behavior: reordering, adding or removing rules changes normalized artists.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Identifies a rule in [`ARTIST_RULES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    CollapseWhitespace,
    Featuring,
    Versus,
    ListSeparator,
    Trim,
}

/// Condition under which a rule swaps its default replacement for an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// The matched catalog track credits exactly this many artists.
    CollaboratorCount(usize),
}

impl RuleCondition {
    fn holds(self, matched_track_artists: &[String]) -> bool {
        match self {
            Self::CollaboratorCount(count) => matched_track_artists.len() == count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOverride {
    pub condition: RuleCondition,
    pub replacement: &'static str,
}

/// One named rewrite: every pattern is replaced, in order, by the rule's
/// replacement.
#[derive(Debug)]
pub struct NormalizationRule {
    pub kind: RuleKind,
    pub patterns: Vec<Regex>,
    pub replacement: &'static str,
    pub override_when: Option<RuleOverride>,
}

impl NormalizationRule {
    fn new(kind: RuleKind, patterns: &[&str], replacement: &'static str) -> Self {
        Self {
            kind,
            patterns: patterns
                .iter()
                .map(|pattern| Regex::new(pattern).unwrap())
                .collect(),
            replacement,
            override_when: None,
        }
    }

    fn with_override(mut self, condition: RuleCondition, replacement: &'static str) -> Self {
        self.override_when = Some(RuleOverride {
            condition,
            replacement,
        });
        self
    }

    fn replacement_for(&self, matched_track_artists: &[String]) -> &'static str {
        match self.override_when {
            Some(rule_override) if rule_override.condition.holds(matched_track_artists) => {
                rule_override.replacement
            }
            _ => self.replacement,
        }
    }
}

/// Artist rewrite rules, applied top to bottom.
pub static ARTIST_RULES: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    vec![
        NormalizationRule::new(RuleKind::CollapseWhitespace, &[r"\s+"], " "),
        // "A feat. B", "A ft B", "A featuring B"
        NormalizationRule::new(
            RuleKind::Featuring,
            &[r"(?i)\s+(?:featuring|feat\.?|ft\.?)\s+"],
            ", ",
        ),
        NormalizationRule::new(RuleKind::Versus, &[r"(?i)\s+vs\.?\s+"], ", "),
        // "A, B", "A; B", "A & B", "A / B"
        NormalizationRule::new(RuleKind::ListSeparator, &[r"\s*[,;]\s*", r"\s+[&/]\s+"], ", ")
            .with_override(RuleCondition::CollaboratorCount(2), " & "),
        NormalizationRule::new(RuleKind::Trim, &[r"^\s+|\s+$"], ""),
    ]
});

/// Runs `raw` through `rules` in order.
pub fn apply_rules(
    rules: &[NormalizationRule],
    raw: &str,
    matched_track_artists: &[String],
) -> String {
    let mut value = raw.to_string();
    for rule in rules {
        let replacement = rule.replacement_for(matched_track_artists);
        for pattern in &rule.patterns {
            value = pattern
                .replace_all(&value, NoExpand(replacement))
                .into_owned();
        }
    }
    value
}

/// Normalizes a file's artist tag against the artists credited on the matched
/// catalog track.
pub fn normalize_artist(raw_artist: &str, matched_track_artists: &[String]) -> String {
    apply_rules(&ARTIST_RULES, raw_artist, matched_track_artists)
}

/// Strips a trailing "feat./with <artist>" style suffix from a catalog title.
///
/// For each credited artist found in the title past position 0, the title is
/// cut at the last space before the word preceding the artist. Artists are
/// processed in order, each working on the already-shortened title. The match
/// is a plain substring search, so an artist name embedded in an unrelated
/// word also triggers a cut.
pub fn derive_display_title(catalog_title: &str, track_artists: &[String]) -> String {
    let mut title = catalog_title.to_string();
    for artist in track_artists {
        let Some(position) = title.find(artist.as_str()) else {
            continue;
        };
        if position == 0 {
            continue;
        }

        let mut head = title[..position].chars();
        head.next_back();
        if let Some(space) = head.as_str().rfind(' ') {
            title.truncate(space);
        }
    }
    title
}

#[cfg(test)]
mod tests {
    use super::{
        apply_rules, derive_display_title, normalize_artist, NormalizationRule, RuleKind,
        ARTIST_RULES,
    };

    fn artists(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_artist_rules_are_declared_in_fixed_order() {
        let kinds: Vec<RuleKind> = ARTIST_RULES.iter().map(|rule| rule.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::CollapseWhitespace,
                RuleKind::Featuring,
                RuleKind::Versus,
                RuleKind::ListSeparator,
                RuleKind::Trim,
            ]
        );
    }

    #[test]
    fn test_normalize_artist_two_collaborators_uses_ampersand() {
        assert_eq!(
            normalize_artist("Alpha, Beta", &artists(&["Alpha", "Beta"])),
            "Alpha & Beta"
        );
        assert_eq!(
            normalize_artist("Alpha feat. Beta", &artists(&["Alpha", "Beta"])),
            "Alpha & Beta"
        );
    }

    #[test]
    fn test_normalize_artist_one_collaborator_uses_default_separator() {
        assert_eq!(
            normalize_artist("Alpha & Beta", &artists(&["Alpha"])),
            "Alpha, Beta"
        );
    }

    #[test]
    fn test_normalize_artist_three_collaborators_uses_default_separator() {
        assert_eq!(
            normalize_artist(
                "Alpha & Beta;Gamma",
                &artists(&["Alpha", "Beta", "Gamma"])
            ),
            "Alpha, Beta, Gamma"
        );
    }

    #[test]
    fn test_normalize_artist_collapses_and_trims_whitespace() {
        assert_eq!(
            normalize_artist("  Alpha   VS  Beta ", &artists(&["Alpha"])),
            "Alpha, Beta"
        );
    }

    #[test]
    fn test_normalize_artist_leaves_slash_inside_names_alone() {
        assert_eq!(normalize_artist("AC/DC", &artists(&["AC/DC"])), "AC/DC");
    }

    #[test]
    fn test_rule_order_changes_output() {
        let separator_then_featuring = vec![
            NormalizationRule::new(RuleKind::ListSeparator, &[r"\s*,\s*"], " & "),
            NormalizationRule::new(RuleKind::Featuring, &[r"\s+feat\.\s+"], ", "),
        ];
        let featuring_then_separator = vec![
            NormalizationRule::new(RuleKind::Featuring, &[r"\s+feat\.\s+"], ", "),
            NormalizationRule::new(RuleKind::ListSeparator, &[r"\s*,\s*"], " & "),
        ];

        assert_eq!(
            apply_rules(&separator_then_featuring, "Alpha feat. Beta", &[]),
            "Alpha, Beta"
        );
        assert_eq!(
            apply_rules(&featuring_then_separator, "Alpha feat. Beta", &[]),
            "Alpha & Beta"
        );
    }

    #[test]
    fn test_derive_display_title_strips_featured_suffix() {
        assert_eq!(
            derive_display_title("Night Drive (feat. Alice)", &artists(&["Alice"])),
            "Night Drive"
        );
    }

    #[test]
    fn test_derive_display_title_keeps_title_when_artist_leads() {
        assert_eq!(
            derive_display_title("Alice in Wonderland", &artists(&["Alice"])),
            "Alice in Wonderland"
        );
    }

    #[test]
    fn test_derive_display_title_ignores_absent_artists() {
        assert_eq!(
            derive_display_title("Night Drive", &artists(&["Bob"])),
            "Night Drive"
        );
    }

    #[test]
    fn test_derive_display_title_applies_artists_in_order() {
        assert_eq!(
            derive_display_title(
                "Sunrise Over Town with Bob feat. Carol",
                &artists(&["Carol", "Bob"])
            ),
            "Sunrise Over Town"
        );
    }

    #[test]
    fn test_derive_display_title_cuts_on_embedded_substring_match() {
        assert_eq!(
            derive_display_title("Ride The Bobsleigh", &artists(&["Bob"])),
            "Ride"
        );
    }

    #[test]
    fn test_derive_display_title_without_preceding_space_is_unchanged() {
        assert_eq!(
            derive_display_title("The Bobsleigh", &artists(&["Bob"])),
            "The Bobsleigh"
        );
    }
}
