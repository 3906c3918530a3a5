//! Lexer
//!
//!     This module orchestrates tokenization of a polyglot submission. It runs in two steps:
//!         1. Core tokenization using logos. See [base_tokenization]. This splits the input into
//!            line breaks, horizontal whitespace, directive-looking words and plain text.
//!         2. Directive detection. See [directive_detection]. Raw tokens are walked with the
//!            knowledge of where lines start, deciding which `#` words really are directives,
//!            collecting directive arguments and classifying everything else as Language or
//!            Trivia.
//!
//! Directive Rules
//!
//!     A directive begins with `#` at the very start of the text or right after a line break.
//!         - `#!name` is a directive. A lone `#!` followed by whitespace is not, but a lone `#!`
//!           at the very end of the input is.
//!         - `#r` and `#i` are directives only when followed by whitespace or the end of input,
//!           so `#region` and `#if` stay language code.
//!         - After the name, a run of spaces or tabs is Trivia and the rest of the line is a
//!           single DirectiveArgs token. The line break and any whitespace starting the next
//!           line are Trivia.
//!
//! Text Regions
//!
//!     Text between directives is emitted as leading Trivia, one Language token spanning the
//!     first to the last non-whitespace character, and trailing Trivia. A region holding only
//!     whitespace is a single Trivia token.
//!
//!     The lexer never fails: every byte of the input ends up in exactly one token.

pub mod base_tokenization;
pub mod directive_detection;

pub use base_tokenization::{tokenize, RawToken};
pub use directive_detection::detect_directives;

use crate::polyglot::token::Token;

/// Lex a submission into its submission level tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let raw = tokenize(source);
    detect_directives(source, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyglot::token::{detokenize, TokenKind};

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        lex(source)
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn test_plain_code_is_language() {
        assert_eq!(
            kinds("var x = 1;"),
            vec![(TokenKind::Language, "var x = 1;".to_string())]
        );
    }

    #[test]
    fn test_selector_then_code() {
        assert_eq!(
            kinds("#!csharp\nvar x = 1;"),
            vec![
                (TokenKind::Directive, "#!csharp".to_string()),
                (TokenKind::Trivia, "\n".to_string()),
                (TokenKind::Language, "var x = 1;".to_string()),
            ]
        );
    }

    #[test]
    fn test_directive_args_run_to_end_of_line() {
        assert_eq!(
            kinds("#!set --name x --value 1\nx"),
            vec![
                (TokenKind::Directive, "#!set".to_string()),
                (TokenKind::Trivia, " ".to_string()),
                (TokenKind::DirectiveArgs, "--name x --value 1".to_string()),
                (TokenKind::Trivia, "\n".to_string()),
                (TokenKind::Language, "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_hash_mid_line_is_language() {
        assert_eq!(
            kinds("x = 1 #!csharp"),
            vec![(TokenKind::Language, "x = 1 #!csharp".to_string())]
        );
    }

    #[test]
    fn test_bare_bang_followed_by_space_is_language() {
        assert_eq!(
            kinds("#! not a directive"),
            vec![(TokenKind::Language, "#! not a directive".to_string())]
        );
    }

    #[test]
    fn test_bare_bang_at_end_is_directive() {
        assert_eq!(
            kinds("x\n#!"),
            vec![
                (TokenKind::Language, "x".to_string()),
                (TokenKind::Trivia, "\n".to_string()),
                (TokenKind::Directive, "#!".to_string()),
            ]
        );
    }

    #[test]
    fn test_region_is_not_a_reference() {
        assert_eq!(
            kinds("#region foo"),
            vec![(TokenKind::Language, "#region foo".to_string())]
        );
    }

    #[test]
    fn test_reference_directive() {
        assert_eq!(
            kinds("#r \"nuget:Foo\""),
            vec![
                (TokenKind::Directive, "#r".to_string()),
                (TokenKind::Trivia, " ".to_string()),
                (TokenKind::DirectiveArgs, "\"nuget:Foo\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_reference_at_end_of_input() {
        assert_eq!(kinds("#i"), vec![(TokenKind::Directive, "#i".to_string())]);
    }

    #[test]
    fn test_surrounding_whitespace_is_trivia() {
        assert_eq!(
            kinds("  x  \n"),
            vec![
                (TokenKind::Trivia, "  ".to_string()),
                (TokenKind::Language, "x".to_string()),
                (TokenKind::Trivia, "  \n".to_string()),
            ]
        );
    }

    #[test]
    fn test_crlf_line_breaks() {
        let source = "#!fsharp\r\nlet x = 1\r\n#!csharp\r\nvar y = 2;";
        let tokens = lex(source);
        let directives: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Directive)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(directives, vec!["#!fsharp", "#!csharp"]);
        assert_eq!(detokenize(&tokens), source);
    }

    #[test]
    fn test_indented_directive_is_language() {
        assert_eq!(
            kinds("x\n  #!csharp"),
            vec![(TokenKind::Language, "x\n  #!csharp".to_string())]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(lex("").is_empty());
    }

    #[test]
    fn test_spans_are_contiguous() {
        let source = "#!time\n#!csharp  \n  Console.WriteLine(1);\n\n#r \"x.dll\"\n";
        let tokens = lex(source);
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.span.start, expected_start, "gap before {token:?}");
            assert_eq!(&source[token.span.clone()], token.text);
            expected_start = token.span.end;
        }
        assert_eq!(expected_start, source.len());
    }
}
