use once_cell::sync::Lazy;
use regex::Regex;

// mentions | anything not ascii alnum/space/tab | scheme://rest
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(@[A-Za-z0-9]+)|([^0-9A-Za-z \t])|(\w+://\S+)").expect("static regex")
});

/// Strip @mentions, URLs and punctuation, then collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let replaced = NOISE_RE.replace_all(raw, " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Length in characters of the raw text, not bytes.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_mentions_urls_and_punctuation() {
        let raw = "@jack Loving the new   release!! see https://t.co/abc123 #launch";
        assert_eq!(clean_text(raw), "Loving the new release see launch");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   \t "), "");
        assert_eq!(clean_text("!!!"), "");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "@a @b hello, world",
            "tabs\tand\nnewlines  ok",
            "café déjà vu ftp://x.y/z?q=1",
            "email me: someone@example.com :)",
            "",
        ];
        for s in samples {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn counts_use_raw_text() {
        let t = "  héllo   wörld @you ";
        assert_eq!(word_count(t), 3);
        assert_eq!(char_count(t), 21);
        assert_eq!(word_count(""), 0);
        assert_eq!(char_count(""), 0);
    }
}
