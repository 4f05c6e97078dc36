// src/pipeline/script.rs

//! Word splitting for pipeline steps.
//!
//! Only quoting is understood: a word is a run of bare characters and
//! single- or double-quoted segments, e.g. `--path='src/**/*.rs'`. Anything
//! else (pipes, redirections, variables) is left to the shell a non-builtin
//! step is handed to.

use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"[^"]*"|'[^']*'|[^\s"'])+"#).expect("word regex is valid")
});

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|([^"']+)"#).expect("segment regex is valid")
});

/// Split `line` into words, removing quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut consumed = 0;

    for m in WORD.find_iter(line) {
        ensure_blank(&line[consumed..m.start()])?;
        consumed = m.end();
        words.push(unquote(m.as_str()));
    }
    ensure_blank(&line[consumed..])?;

    Ok(words)
}

fn ensure_blank(gap: &str) -> Result<(), String> {
    if gap.trim().is_empty() {
        Ok(())
    } else {
        Err(format!("unterminated quote near `{}`", gap.trim()))
    }
}

fn unquote(word: &str) -> String {
    SEGMENT
        .captures_iter(word)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        split_words(line).unwrap()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(words("  run_pipelines  build deploy "), ["run_pipelines", "build", "deploy"]);
        assert!(words("   ").is_empty());
    }

    #[test]
    fn quotes_group_words_and_are_removed() {
        assert_eq!(
            words(r#"run_watch -p 'src/**/*.go' -- go run "./cmd/my app""#),
            ["run_watch", "-p", "src/**/*.go", "--", "go", "run", "./cmd/my app"]
        );
        assert_eq!(words("--path='a b'/c"), ["--path=a b/c"]);
        assert_eq!(words(r#"echo "it's""#), ["echo", "it's"]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = split_words("echo 'oops").unwrap_err();
        assert!(err.contains("unterminated quote"), "{err}");
    }
}
