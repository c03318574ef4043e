//! Chat line tokenization.
//!
//! The policy is deliberately plain: a line is split on whitespace and nothing
//! else. Punctuation stays glued to the word it was typed against, so `"cat,"`
//! and `"cat"` are different words, and case is preserved. Learning and seed
//! extraction both go through [`tokenize`], so a seed taken from a line always
//! matches the keys that line produced.
//!
//! Outgoing sentences are rebuilt with [`detokenize`], which joins words with a
//! single space.

/// Split a chat line into words.
///
/// Any Unicode whitespace separates words, including stray `\r` and `\n`, so no
/// token can carry a line break into the model. Empty and whitespace-only lines
/// give an empty vector.
///
/// # Examples
///
/// ```
/// use chat_tokenizer::tokenize;
///
/// let words = tokenize("  well, Hello   there!\r\n");
/// assert_eq!(words, vec!["well,", "Hello", "there!"]);
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Drop a leading address to `nick` (`"bot:"`, `"bot,"`, `"bot"`).
///
/// Only the first word is checked, and it matches when it starts with the nick.
/// The address itself is not something the bot should learn to say.
pub fn strip_address<'a>(words: &'a [String], nick: &str) -> &'a [String] {
    match words.first() {
        Some(first) if !nick.is_empty() && first.starts_with(nick) => &words[1..],
        _ => words,
    }
}

/// Rebuild a sentence from words.
pub fn detokenize<S: AsRef<str>>(words: &[S]) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(word.as_ref());
    }
    out
}
