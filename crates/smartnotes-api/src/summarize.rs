/// Stand-in summarizer: the first `max_words` words followed by `...`.
///
/// Text that already fits is returned unchanged.
pub fn summarize(text: &str, max_words: usize) -> String {
    let words = text.split_whitespace().collect::<Vec<_>>();
    if words.len() <= max_words {
        return text.trim().to_string();
    }
    format!("{}...", words[..max_words].join(" "))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn short_text_is_returned_as_is() {
        assert_eq!(summarize("  buy milk  ", 15), "buy milk");
    }

    #[test]
    fn long_text_is_cut_after_word_limit() {
        let text = "one two three four five six";
        assert_eq!(summarize(text, 3), "one two three...");
    }

    #[test]
    fn whitespace_runs_collapse_in_truncated_output() {
        assert_eq!(summarize("a\n\nb   c d", 2), "a b...");
    }
}
