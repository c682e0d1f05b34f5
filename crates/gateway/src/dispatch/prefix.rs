//! Instance-addressing parser.
//!
//! Recognizes how users name an instance at the start of a message:
//! `alpha: …`, `@alpha …`, and the niceties `hey alpha, …` / `hi alpha …`.
//! The boolean distinguishes "user typed a name" from "default applied"
//! — explicit addressing also transfers thread ownership, defaults
//! don't.

/// Parse a leading instance address. Returns `(instance, remaining,
/// was_explicit)`; `instance` is `None` when no known name was typed
/// (the caller applies its default).
pub fn parse_instance_prefix<'a>(
    text: &'a str,
    known_names: &[String],
) -> (Option<String>, &'a str, bool) {
    let trimmed = text.trim_start();

    // "hey alpha, …" / "hi alpha …" (case-insensitive, comma optional).
    let lower = trimmed.to_lowercase();
    for greeting in ["hey ", "hi "] {
        if let Some(after) = lower.strip_prefix(greeting) {
            for name in known_names {
                let name_lower = name.to_lowercase();
                if let Some(rest_lower) = after.strip_prefix(&name_lower) {
                    if rest_lower.is_empty()
                        || rest_lower.starts_with(',')
                        || rest_lower.starts_with(' ')
                    {
                        let consumed = trimmed.len() - rest_lower.len();
                        let rest = trimmed[consumed..]
                            .trim_start_matches([',', ' '])
                            .trim_start();
                        return (Some(name.clone()), rest, true);
                    }
                }
            }
        }
    }

    // "alpha: …"
    if let Some((head, rest)) = trimmed.split_once(':') {
        let head = head.trim();
        for name in known_names {
            if head.eq_ignore_ascii_case(name) {
                return (Some(name.clone()), rest.trim_start(), true);
            }
        }
    }

    // "@alpha …"
    if let Some(after_at) = trimmed.strip_prefix('@') {
        for name in known_names {
            let name_lower = name.to_lowercase();
            let after_lower = after_at.to_lowercase();
            if let Some(rest_lower) = after_lower.strip_prefix(&name_lower) {
                if rest_lower.is_empty()
                    || rest_lower.starts_with(' ')
                    || rest_lower.starts_with(',')
                {
                    let consumed = after_at.len() - rest_lower.len();
                    let rest = after_at[consumed..].trim_start_matches([',', ' ']).trim_start();
                    return (Some(name.clone()), rest, true);
                }
            }
        }
    }

    (None, trimmed, false)
}

/// Scan anywhere in the text for `@<name>` matching a known instance
/// (routing-table "contains @<name>" case). The text is returned
/// untouched: a mid-sentence mention is part of the message.
pub fn find_instance_mention(text: &str, known_names: &[String]) -> Option<String> {
    let lower = text.to_lowercase();
    for name in known_names {
        let needle = format!("@{}", name.to_lowercase());
        if let Some(pos) = lower.find(&needle) {
            let end = pos + needle.len();
            let boundary_ok = lower[end..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true);
            if boundary_ok {
                return Some(name.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["alpha".into(), "beta".into()]
    }

    #[test]
    fn colon_prefix() {
        let (inst, rest, explicit) = parse_instance_prefix("alpha: hi", &names());
        assert_eq!(inst.as_deref(), Some("alpha"));
        assert_eq!(rest, "hi");
        assert!(explicit);
    }

    #[test]
    fn colon_prefix_is_case_insensitive() {
        let (inst, rest, explicit) = parse_instance_prefix("Alpha: check this", &names());
        assert_eq!(inst.as_deref(), Some("alpha"));
        assert_eq!(rest, "check this");
        assert!(explicit);
    }

    #[test]
    fn at_prefix() {
        let (inst, rest, explicit) = parse_instance_prefix("@beta please review", &names());
        assert_eq!(inst.as_deref(), Some("beta"));
        assert_eq!(rest, "please review");
        assert!(explicit);
    }

    #[test]
    fn greeting_forms() {
        let (inst, rest, explicit) = parse_instance_prefix("hey alpha, what's up", &names());
        assert_eq!(inst.as_deref(), Some("alpha"));
        assert_eq!(rest, "what's up");
        assert!(explicit);

        let (inst, _, explicit) = parse_instance_prefix("Hi beta how goes", &names());
        assert_eq!(inst.as_deref(), Some("beta"));
        assert!(explicit);
    }

    #[test]
    fn no_prefix_returns_default_marker() {
        let (inst, rest, explicit) = parse_instance_prefix("hi", &names());
        assert_eq!(inst, None);
        assert_eq!(rest, "hi");
        assert!(!explicit);
    }

    #[test]
    fn unknown_name_is_not_a_prefix() {
        let (inst, rest, explicit) = parse_instance_prefix("gamma: hi", &names());
        assert_eq!(inst, None);
        assert_eq!(rest, "gamma: hi");
        assert!(!explicit);
    }

    #[test]
    fn colon_in_sentence_is_not_a_prefix() {
        let (inst, _, explicit) = parse_instance_prefix("note: alpha is great", &names());
        assert_eq!(inst, None);
        assert!(!explicit);
    }

    #[test]
    fn mention_anywhere_in_text() {
        assert_eq!(
            find_instance_mention("could @beta take a look?", &names()).as_deref(),
            Some("beta")
        );
        assert_eq!(find_instance_mention("no one here", &names()), None);
        // "@betamax" must not match "beta".
        assert_eq!(find_instance_mention("ask @betamax", &names()), None);
    }
}
