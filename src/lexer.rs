//! The lexical scanner. Turns a stream of code points into [`Token`]s, enforcing all
//! lexical-level grammar: whitespace, punctuation, string escape rules, number grammar
//! and keyword recognition. Structural validity is the parser's concern.

use std::collections::VecDeque;
use std::io;

use tracing::*;

use crate::source::CodePoints;
use crate::span::Span;
use crate::token::{lookup_keyword, Token, TokenKind};

/// Lookahead slots available beyond the cursor. Four is the deepest the grammar ever
/// needs to look (the hex digits of a `\u` escape).
const PEEK_CAPACITY: usize = 4;

pub struct Lexer<S> {
    src: S,
    /// Code points read from `src` but not yet consumed. Peeking fills this buffer;
    /// only [`Lexer::read_char`] drains it.
    pending: VecDeque<char>,
    /// The code point under the cursor; `None` once the stream is exhausted or reading
    /// has failed.
    c: Option<char>,
    /// A read failure other than end of input. Sticky.
    failure: Option<io::Error>,
    row: u32,
    col: u32,
    /// Byte offset of the cursor.
    offset: usize,
}

impl<S: CodePoints> Lexer<S> {
    pub fn new(src: S) -> Self {
        let mut lx = Lexer {
            src,
            pending: VecDeque::with_capacity(PEEK_CAPACITY),
            c: None,
            failure: None,
            row: 1,
            col: 0,
            offset: 0,
        };
        lx.read_char();
        lx
    }

    /// Produce the next token, advancing the cursor past its lexeme. End of input yields
    /// `Eof` on every subsequent call; read failures and lexical errors yield `Illegal`
    /// and callers are expected to stop.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let (row, col, lo) = (self.row, self.col, self.offset);

        let c0 = match self.c {
            Some(c) => c,
            None => {
                return match &self.failure {
                    Some(failure) => Token::new(
                        TokenKind::Illegal,
                        format!("failed to read input: {failure}"),
                        row,
                        col,
                        Span::new(lo, lo),
                    ),
                    None => Token::new(TokenKind::Eof, "", row, col, Span::new(lo, lo)),
                };
            }
        };

        let (kind, literal) = match c0 {
            '{' => (TokenKind::LBrace, c0.to_string()),
            '}' => (TokenKind::RBrace, c0.to_string()),
            '[' => (TokenKind::LBracket, c0.to_string()),
            ']' => (TokenKind::RBracket, c0.to_string()),
            ':' => (TokenKind::Colon, c0.to_string()),
            ',' => (TokenKind::Comma, c0.to_string()),
            '"' => match self.read_string() {
                Ok(s) => (TokenKind::Str, s),
                Err(detail) => return self.illegal(format!("bad string: {detail}"), lo),
            },
            '-' | '0'..='9' => match self.read_number(c0) {
                Ok(n) => (TokenKind::Number, n),
                Err(detail) => return self.illegal(format!("bad number: {detail}"), lo),
            },
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier(c);
                (lookup_keyword(&ident), ident)
            }
            c => return self.illegal(format!("unrecognised token: {c}"), lo),
        };

        self.read_char();
        let tok = Token::new(kind, literal, row, col, Span::new(lo, self.offset));
        trace!(%tok, "produced token");
        tok
    }

    /// An `Illegal` token at the position the error was detected; the span still covers
    /// the lexeme from its beginning.
    fn illegal(&mut self, message: String, lo: usize) -> Token {
        let (row, col) = (self.row, self.col);
        self.read_char();
        Token::new(TokenKind::Illegal, message, row, col, Span::new(lo, self.offset))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.c, Some(' ' | '\t' | '\n' | '\r')) {
            self.read_char();
        }
    }

    /// Advance the cursor one code point, drawing from the peek buffer first.
    fn read_char(&mut self) {
        if let Some(c) = self.c {
            self.offset += c.len_utf8();
        }
        self.c = match self.pending.pop_front() {
            Some(c) => Some(c),
            None => self.fetch(),
        };
        match self.c {
            // The newline itself sits on column 0 so that the first code point of the
            // next line lands on column 1.
            Some('\n') => {
                self.row += 1;
                self.col = 0;
            }
            Some(_) => self.col += 1,
            None => {}
        }
    }

    /// Pull one code point straight from the source, recording a failure as terminal.
    fn fetch(&mut self) -> Option<char> {
        if self.failure.is_some() {
            return None;
        }
        match self.src.next_code_point() {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "read failure");
                self.failure = Some(e);
                None
            }
        }
    }

    /// Look at the code point `idx` steps past the cursor without consuming anything.
    fn peek_at(&mut self, idx: usize) -> Option<char> {
        debug_assert!(idx < PEEK_CAPACITY);
        while self.pending.len() <= idx {
            match self.fetch() {
                Some(c) => self.pending.push_back(c),
                None => return None,
            }
        }
        self.pending.get(idx).copied()
    }

    fn read_failure(&self) -> Option<String> {
        self.failure.as_ref().map(|e| format!("failed to read input: {e}"))
    }

    /// Consume a string lexeme. Entered on the opening quote; leaves the cursor on the
    /// closing quote. The returned literal retains its escape sequences undecoded.
    fn read_string(&mut self) -> Result<String, String> {
        self.read_char();
        let mut buf = String::new();
        let mut esc = false;

        loop {
            let c = match self.c {
                Some(c) => c,
                None => {
                    return Err(self
                        .read_failure()
                        .unwrap_or_else(|| String::from("unterminated string")));
                }
            };
            if !esc && c == '"' {
                return Ok(buf);
            }
            if !esc && (c as u32) < 0x20 {
                return Err(format!("control character {:#x} in stream", c as u32));
            }
            if esc {
                match c {
                    '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => {}
                    'u' => {
                        // The four hex digits are only checked here; they are consumed
                        // by the following loop iterations as ordinary characters.
                        for i in 0..4 {
                            match self.peek_at(i) {
                                Some(h) if h.is_ascii_hexdigit() => {}
                                _ => return Err(String::from("invalid unicode sequence")),
                            }
                        }
                    }
                    other => return Err(format!("invalid escape sequence: \\{other}")),
                }
            }
            buf.push(c);
            esc = !esc && c == '\\';
            self.read_char();
        }
    }

    /// Consume a number lexeme: optional `-`, integer part, optional fraction, optional
    /// exponent. Entered on the first character; leaves the cursor on the last character
    /// of the number. Every decision peeks before it consumes, so lookahead never eats
    /// code points that belong to the next token.
    fn read_number(&mut self, first: char) -> Result<String, String> {
        let mut buf = String::new();
        self.read_integral_part(first, &mut buf)?;
        self.read_fractional_part(&mut buf)?;
        self.read_exponent(&mut buf)?;
        Ok(buf)
    }

    fn read_integral_part(&mut self, first: char, buf: &mut String) -> Result<(), String> {
        match first {
            '-' => match self.peek_at(0) {
                None => {
                    return Err(self
                        .read_failure()
                        .unwrap_or_else(|| String::from("truncated integral part")));
                }
                Some(d) if !d.is_ascii_digit() => {
                    return Err(String::from("'-' must be followed by a digit"));
                }
                Some(_) => {}
            },
            '0' => {
                if self.peek_at(0).is_some_and(|d| d.is_ascii_digit()) {
                    return Err(String::from("numbers cannot lead with zero"));
                }
            }
            _ => {}
        }
        buf.push(first);
        self.read_digits(buf);
        Ok(())
    }

    fn read_fractional_part(&mut self, buf: &mut String) -> Result<(), String> {
        if self.peek_at(0) != Some('.') {
            return Ok(());
        }
        match self.peek_at(1) {
            None => Err(self
                .read_failure()
                .unwrap_or_else(|| String::from("truncated fractional part"))),
            Some(d) if !d.is_ascii_digit() => {
                Err(String::from("'.' must be followed by a digit"))
            }
            Some(_) => {
                self.read_char();
                self.push_current(buf);
                self.read_digits(buf);
                Ok(())
            }
        }
    }

    fn read_exponent(&mut self, buf: &mut String) -> Result<(), String> {
        match self.peek_at(0) {
            Some('e' | 'E') => {}
            _ => return Ok(()),
        }
        match self.peek_at(1) {
            None => Err(self
                .read_failure()
                .unwrap_or_else(|| String::from("truncated exponent"))),
            Some(d) if d.is_ascii_digit() => {
                self.read_char();
                self.push_current(buf);
                self.read_digits(buf);
                Ok(())
            }
            Some(s) if s != '+' && s != '-' => {
                Err(String::from("exponent must be followed by a sign or digit"))
            }
            Some(_) => match self.peek_at(2) {
                Some(d) if d.is_ascii_digit() => {
                    self.read_char();
                    self.push_current(buf);
                    self.read_char();
                    self.push_current(buf);
                    self.read_digits(buf);
                    Ok(())
                }
                _ => Err(String::from("signed exponent must be followed by a digit")),
            },
        }
    }

    fn read_digits(&mut self, buf: &mut String) {
        while self.peek_at(0).is_some_and(|d| d.is_ascii_digit()) {
            self.read_char();
            self.push_current(buf);
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut buf = String::from(first);
        while self.peek_at(0).is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.read_char();
            self.push_current(&mut buf);
        }
        buf
    }

    fn push_current(&mut self, buf: &mut String) {
        if let Some(c) = self.c {
            buf.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use rstest::rstest;

    use super::*;
    use crate::source::{ReaderSource, StrSource};

    fn lexer(input: &str) -> Lexer<StrSource<'_>> {
        Lexer::new(StrSource::new(input))
    }

    fn first_token(input: &str) -> Token {
        lexer(input).next_token()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lx = lexer(input);
        let mut out = Vec::new();
        loop {
            let tok = lx.next_token();
            out.push(tok.kind);
            if matches!(tok.kind, TokenKind::Eof | TokenKind::Illegal) {
                return out;
            }
        }
    }

    #[rstest]
    #[case::empty("", vec![TokenKind::Eof])]
    #[case::whitespace_only(" \n\r\t", vec![TokenKind::Eof])]
    #[case::identifier("bob", vec![TokenKind::Ident, TokenKind::Eof])]
    #[case::open_brace("{", vec![TokenKind::LBrace, TokenKind::Eof])]
    #[case::close_brace("}", vec![TokenKind::RBrace, TokenKind::Eof])]
    #[case::open_bracket("[", vec![TokenKind::LBracket, TokenKind::Eof])]
    #[case::close_bracket("]", vec![TokenKind::RBracket, TokenKind::Eof])]
    #[case::colon(":", vec![TokenKind::Colon, TokenKind::Eof])]
    #[case::comma(",", vec![TokenKind::Comma, TokenKind::Eof])]
    #[case::null("null", vec![TokenKind::Null, TokenKind::Eof])]
    #[case::true_keyword("true", vec![TokenKind::True, TokenKind::Eof])]
    #[case::false_keyword("false", vec![TokenKind::False, TokenKind::Eof])]
    fn simple_tokens(#[case] input: &str, #[case] want: Vec<TokenKind>) {
        assert_eq!(kinds(input), want);
    }

    #[rstest]
    #[case::empty(r#""""#, "")]
    #[case::plain(r#""bacon egg""#, "bacon egg")]
    #[case::punctuation_inside(r#""{}[]():null true false""#, "{}[]():null true false")]
    #[case::escapes(r#""\"\b\f\r\n\t\/\\\u0123\uaAfF""#, r#"\"\b\f\r\n\t\/\\\u0123\uaAfF"#)]
    fn string_tokens_keep_raw_escapes(#[case] input: &str, #[case] literal: &str) {
        let tok = first_token(input);
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, literal);
    }

    #[rstest]
    #[case::zero("0")]
    #[case::positive_int("123")]
    #[case::negative_int("-123")]
    #[case::negative_zero("-0")]
    #[case::small_float("0.456")]
    #[case::negative_small_float("-0.78901")]
    #[case::big_float("123.456")]
    #[case::negative_big_float("-999.78901")]
    #[case::big_e("2E23")]
    #[case::small_e("3e4")]
    #[case::big_positive_e("2E+2")]
    #[case::small_positive_e("2e+2")]
    #[case::big_negative_e("2E-2")]
    #[case::small_negative_e("2e-2")]
    fn number_tokens(#[case] input: &str) {
        let tok = first_token(input);
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.literal, input);
    }

    #[rstest]
    #[case::leading_zero("0123", "numbers cannot lead with zero")]
    #[case::truncated_dash("-", "truncated integral part")]
    #[case::dash_non_number("-a", "'-' must be followed by a digit")]
    #[case::truncated_dot("1.", "truncated fractional part")]
    #[case::dot_non_number("0.a", "'.' must be followed by a digit")]
    #[case::bare_dot(".1", "unrecognised token: .")]
    #[case::truncated_e("1e", "truncated exponent")]
    #[case::truncated_big_e("1E", "truncated exponent")]
    #[case::e_non_sign("1e*2", "exponent must be followed by a sign or digit")]
    #[case::e_minus_non_number("1e-x", "signed exponent must be followed by a digit")]
    #[case::e_plus_non_number("1e+a", "signed exponent must be followed by a digit")]
    #[case::big_e_minus_non_number("1E-b", "signed exponent must be followed by a digit")]
    #[case::big_e_plus_non_number("1E+z", "signed exponent must be followed by a digit")]
    #[case::truncated_signed_e("1e+", "signed exponent must be followed by a digit")]
    #[case::unterminated_string("\"blah", "unterminated string")]
    #[case::bad_escape(r#""what's the \q word?""#, r#"invalid escape sequence: \q"#)]
    #[case::line_break_in_string("\"blah\nblah\"", "control character 0xa in stream")]
    #[case::tab_in_string("\"a\tb\"", "control character 0x9 in stream")]
    #[case::unicode_too_short(r#""\u111""#, "invalid unicode sequence")]
    #[case::unicode_truncated(r#""\u12"#, "invalid unicode sequence")]
    #[case::unicode_invalid(r#""\u1X23""#, "invalid unicode sequence")]
    #[case::unicode_invalid_late(r#""\u12G4""#, "invalid unicode sequence")]
    #[case::stray_char("@", "unrecognised token: @")]
    fn bad_tokens(#[case] input: &str, #[case] detail: &str) {
        let tok = first_token(input);
        assert_eq!(tok.kind, TokenKind::Illegal, "token: {tok}");
        assert!(
            tok.literal.ends_with(detail),
            "got {:?}, want suffix {:?}",
            tok.literal,
            detail
        );
    }

    #[test]
    fn valid_unicode_escape_lexes() {
        let tok = first_token(r#""\u1234""#);
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, r#"\u1234"#);
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut lx = lexer("1,2");
        let one = lx.next_token();
        assert_eq!((one.kind, one.literal.as_str()), (TokenKind::Number, "1"));
        assert_eq!(lx.next_token().kind, TokenKind::Comma);
        let two = lx.next_token();
        assert_eq!((two.kind, two.literal.as_str()), (TokenKind::Number, "2"));
        assert_eq!(lx.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn number_stops_at_closing_bracket() {
        let mut lx = lexer("[12.5e2]");
        assert_eq!(lx.next_token().kind, TokenKind::LBracket);
        let num = lx.next_token();
        assert_eq!((num.kind, num.literal.as_str()), (TokenKind::Number, "12.5e2"));
        assert_eq!(lx.next_token().kind, TokenKind::RBracket);
        assert_eq!(lx.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn rows_columns_and_spans_are_tracked() {
        let mut lx = lexer("{\n  \"a\": }");

        let brace = lx.next_token();
        assert_eq!((brace.row, brace.col), (1, 1));
        assert_eq!(brace.span, Span::new(0, 1));

        let key = lx.next_token();
        assert_eq!(key.kind, TokenKind::Str);
        assert_eq!((key.row, key.col), (2, 3));
        assert_eq!(key.span, Span::new(4, 7));

        let colon = lx.next_token();
        assert_eq!((colon.row, colon.col), (2, 6));

        let close = lx.next_token();
        assert_eq!(close.kind, TokenKind::RBrace);
        assert_eq!((close.row, close.col), (2, 8));
        assert_eq!(close.span, Span::new(9, 10));
    }

    #[test]
    fn eof_is_sticky() {
        let mut lx = lexer("null");
        assert_eq!(lx.next_token().kind, TokenKind::Null);
        assert_eq!(lx.next_token().kind, TokenKind::Eof);
        assert_eq!(lx.next_token().kind, TokenKind::Eof);
    }

    struct FailingSource;

    impl CodePoints for FailingSource {
        fn next_code_point(&mut self) -> io::Result<Option<char>> {
            Err(io::Error::new(io::ErrorKind::Other, "device unplugged"))
        }
    }

    #[test]
    fn read_failure_surfaces_as_illegal() {
        let mut lx = Lexer::new(FailingSource);
        let tok = lx.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert_eq!(tok.literal, "failed to read input: device unplugged");
    }

    #[test]
    fn reader_source_lexes_multibyte_strings() {
        let input = "\"h\u{e9}llo\"";
        let mut lx = Lexer::new(ReaderSource::new(io::Cursor::new(input.as_bytes())));
        let tok = lx.next_token();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(tok.literal, "h\u{e9}llo");
    }

    #[test]
    fn malformed_utf8_surfaces_as_illegal() {
        let mut lx = Lexer::new(ReaderSource::new(io::Cursor::new(b"\"\xff\"".to_vec())));
        let tok = lx.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert!(tok.literal.contains("malformed UTF-8"), "got {:?}", tok.literal);
    }
}
