//! Informational comment detection
//!
//! Slicers sprinkle G-code files with machine-oriented metadata comments
//! (thumbnail payloads, layer markers, feature types). A comment counts as
//! informational when it carries real text and mentions none of the terms on a
//! [`CommentBlacklist`].

use serde::{Deserialize, Serialize};

/// Comment sigil used by the G-code dialects we translate
pub const COMMENT_SIGIL: char = ';';

/// Metadata terms that disqualify a comment from being informational
///
/// If an important comment goes missing from the translation, this list is
/// the first place to look.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "thumbnail",
    "base64",
    "preview",
    "width:",
    "height:",
    "layer",
    "type:",
    "time_elapsed:",
    "mesh:",
    "gimage",
    "simage",
    "extrude_ratio:",
    "structure:",
    "support-",
];

/// Case-insensitive list of substrings that mark metadata comments
///
/// Terms are lowercased and empty terms dropped on construction, including
/// when deserialized from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CommentBlacklist {
    terms: Vec<String>,
}

impl CommentBlacklist {
    /// Create a blacklist from arbitrary terms; matching ignores case
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| t.into().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// A blacklist that rejects nothing
    pub fn empty() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add a term
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        let term = term.into().to_lowercase();
        if !term.is_empty() && !self.terms.contains(&term) {
            self.terms.push(term);
        }
        self
    }

    /// The (lowercased) terms
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Whether the text contains any blacklisted term
    pub fn matches(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        self.terms.iter().any(|term| lowered.contains(term.as_str()))
    }
}

impl From<Vec<String>> for CommentBlacklist {
    fn from(terms: Vec<String>) -> Self {
        Self::new(terms)
    }
}

impl From<CommentBlacklist> for Vec<String> {
    fn from(blacklist: CommentBlacklist) -> Self {
        blacklist.terms
    }
}

impl Default for CommentBlacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied())
    }
}

/// Whether a line is a comment with human-relevant content
///
/// The line must start with the sigil (after trimming) and either be
/// `; <word> <word>...` or `;<text>` with no space after the sigil. Any
/// blacklisted term rejects it.
pub fn is_informational_comment(line: &str, blacklist: &CommentBlacklist) -> bool {
    let line = line.trim();
    let Some(body) = line.strip_prefix(COMMENT_SIGIL) else {
        return false;
    };

    let has_content = match body.strip_prefix(' ') {
        Some(rest) => rest.contains(' '),
        None => !body.is_empty(),
    };

    has_content && !blacklist.matches(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_word_comment_is_informational() {
        let blacklist = CommentBlacklist::default();
        assert!(is_informational_comment("; foo bar", &blacklist));
        assert!(is_informational_comment("; generated by PrusaSlicer 2.6.0\n", &blacklist));
    }

    #[test]
    fn test_single_word_after_space_is_not_informational() {
        let blacklist = CommentBlacklist::default();
        assert!(!is_informational_comment("; foo", &blacklist));
        assert!(!is_informational_comment(";", &blacklist));
        assert!(!is_informational_comment("; ", &blacklist));
    }

    #[test]
    fn test_sigil_directly_followed_by_text() {
        let blacklist = CommentBlacklist::default();
        assert!(is_informational_comment(";FLAVOR:Marlin", &blacklist));
        assert!(!is_informational_comment(";LAYER:3", &blacklist));
    }

    #[test]
    fn test_blacklist_is_case_insensitive() {
        let blacklist = CommentBlacklist::default();
        assert!(!is_informational_comment("; layer 3", &blacklist));
        assert!(!is_informational_comment("; THUMBNAIL block here", &blacklist));
        assert!(!is_informational_comment(";TYPE:WALL-OUTER", &blacklist));
    }

    #[test]
    fn test_non_comment_lines() {
        let blacklist = CommentBlacklist::default();
        assert!(!is_informational_comment("G1 X10 Y10", &blacklist));
        assert!(!is_informational_comment("", &blacklist));
    }

    #[test]
    fn test_custom_blacklist() {
        let blacklist = CommentBlacklist::empty().with_term("Estimated");
        assert!(!is_informational_comment("; estimated printing time", &blacklist));
        assert!(is_informational_comment("; layer 3 of 10", &blacklist));
        assert_eq!(blacklist.terms(), &["estimated".to_string()]);
    }

    #[test]
    fn test_deserialized_blacklist_ignores_case() {
        let blacklist: CommentBlacklist =
            serde_json::from_str(r#"["Estimated", "", "LAYER"]"#).unwrap();
        assert_eq!(
            blacklist.terms(),
            &["estimated".to_string(), "layer".to_string()]
        );
        assert!(!is_informational_comment("; Estimated printing time", &blacklist));
        assert!(!is_informational_comment("; Layer change here", &blacklist));
        assert!(is_informational_comment("; generated by hand", &blacklist));

        let json = serde_json::to_string(&blacklist).unwrap();
        assert_eq!(json, r#"["estimated","layer"]"#);
    }
}
