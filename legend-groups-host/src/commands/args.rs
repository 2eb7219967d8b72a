//! Double-quote aware argument merging.
//!
//! Servers split command lines on spaces, so `"VIP Members"` arrives as two
//! tokens. [`merge_quoted`] glues them back together.

const QUOTE: char = '"';

fn unquote(text: &str) -> String {
    text.replace(QUOTE, "")
}

/// Merge runs of tokens from one starting with `"` to one ending with `"`
/// into a single argument, joined by single spaces with all quotes
/// removed. A token both starting and ending with a quote stands alone. An
/// unterminated run extends to the last token.
///
/// ```
/// # use legend_groups_host::commands::args::merge_quoted;
/// let args = merge_quoted(&["create", "\"VIP", "Members\"", "&6VIP", "10"]);
/// assert_eq!(args, vec!["create", "VIP Members", "&6VIP", "10"]);
/// ```
#[must_use]
pub fn merge_quoted<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut open: Option<String> = None;

    for token in tokens {
        let token = token.as_ref();
        if let Some(mut run) = open.take() {
            run.push(' ');
            run.push_str(token);
            if token.ends_with(QUOTE) {
                merged.push(unquote(&run));
            } else {
                open = Some(run);
            }
        } else if token.starts_with(QUOTE) {
            if token.len() > 1 && token.ends_with(QUOTE) {
                merged.push(unquote(token));
            } else {
                open = Some(token.to_string());
            }
        } else {
            merged.push(token.to_string());
        }
    }

    if let Some(run) = open {
        merged.push(unquote(&run));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_pass_through() {
        assert_eq!(merge_quoted(&["add", "Steve", "vip"]), vec!["add", "Steve", "vip"]);
        assert!(merge_quoted::<&str>(&[]).is_empty());
    }

    #[test]
    fn quoted_runs_merge() {
        assert_eq!(
            merge_quoted(&["edit", "vip", "description", "\"Paying", "supporters", "only\""]),
            vec!["edit", "vip", "description", "Paying supporters only"]
        );
    }

    #[test]
    fn single_quoted_token_stands_alone() {
        assert_eq!(merge_quoted(&["\"vip\"", "x"]), vec!["vip", "x"]);
        assert_eq!(merge_quoted(&["\"", "a", "b\""]), vec![" a b"]);
    }

    #[test]
    fn unterminated_run_takes_the_rest() {
        assert_eq!(merge_quoted(&["a", "\"b", "c"]), vec!["a", "b c"]);
    }
}
