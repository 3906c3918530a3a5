//! Detokenizer for polyglot submissions
//!
//! Converts a stream of tokens back into the source text. Because tokens carry their own text
//! this is a plain concatenation, and it is the basis of the round-trip guarantee: for any
//! submission `s`, `detokenize(&lex(s)) == s`.

use super::core::Token;

pub fn detokenize(tokens: &[Token]) -> String {
    let capacity = tokens.iter().map(Token::len).sum();
    tokens
        .iter()
        .fold(String::with_capacity(capacity), |mut output, token| {
            output.push_str(&token.text);
            output
        })
}
