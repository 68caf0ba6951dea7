//! Account memo tags pointing at an account's message box: `[MSGBOX:<log id>]`.

use std::sync::OnceLock;

use regex::Regex;

use crate::constants::MEMO_TAG;

fn memo_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"\[{}:([^\]\s]+)\]", regex::escape(MEMO_TAG));
        Regex::new(&pattern).expect("memo pattern is a valid regex")
    })
}

/// The box log id referenced by a memo, if any. The first tag wins.
pub fn extract_box_id(memo: &str) -> Option<String> {
    memo_pattern()
        .captures(memo)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn format_tag(log_id: &str) -> String {
    format!("[{MEMO_TAG}:{log_id}]")
}

/// Point `memo` at `log_id`, replacing an existing tag or appending a new one
/// after any free text.
pub fn with_box_id(memo: &str, log_id: &str) -> String {
    let tag = format_tag(log_id);
    let pattern = memo_pattern();
    if pattern.is_match(memo) {
        return pattern.replace(memo, regex::NoExpand(&tag)).into_owned();
    }
    let memo = memo.trim_end();
    if memo.is_empty() {
        tag
    } else {
        format!("{memo} {tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_box_id() {
        assert_eq!(extract_box_id("[MSGBOX:0.0.1234]"), Some("0.0.1234".into()));
        assert_eq!(extract_box_id("hello [MSGBOX:0.0.9] world"), Some("0.0.9".into()));
        assert_eq!(extract_box_id("no tag here"), None);
        assert_eq!(extract_box_id("[MSGBOX:]"), None);
        assert_eq!(extract_box_id("[OTHER:0.0.1]"), None);
    }

    #[test]
    fn test_with_box_id_appends() {
        assert_eq!(with_box_id("", "0.0.5"), "[MSGBOX:0.0.5]");
        assert_eq!(with_box_id("my account ", "0.0.5"), "my account [MSGBOX:0.0.5]");
    }

    #[test]
    fn test_with_box_id_replaces() {
        let memo = with_box_id("note [MSGBOX:0.0.1] tail", "0.0.2");
        assert_eq!(memo, "note [MSGBOX:0.0.2] tail");
        assert_eq!(extract_box_id(&memo), Some("0.0.2".into()));
    }
}
