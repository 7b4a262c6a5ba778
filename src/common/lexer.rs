//! Lexical primitives shared by the expression and the ledger grammar.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, digit1, line_ending, one_of, space0};
use nom::combinator::{eof, map, map_res, opt, recognize};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

use crate::common::{Amount, Commodity, ParserSettings};

/// Parser error remembering where parsing stopped.
///
/// Of two failed alternatives the one that got further into the input wins,
/// so a statement failing deep inside a block points at the offending line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError<'a> {
    pub input: &'a str,
    pub kind: ErrorKind,
}

impl<'a> SyntaxError<'a> {
    pub fn new(input: &'a str, kind: ErrorKind) -> Self {
        SyntaxError { input, kind }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        SyntaxError::new(input, kind)
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

impl<'a, E> FromExternalError<&'a str, E> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        SyntaxError::new(input, kind)
    }
}

pub(crate) type Res<'a, T> = IResult<&'a str, T, SyntaxError<'a>>;

pub(crate) fn is_white_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub(crate) fn is_not_eol_char(c: char) -> bool {
    c != '\r' && c != '\n'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Runs `parser` and skips the spaces and tabs following it.
pub(crate) fn lexeme<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    terminated(parser, space0)
}

/// Field separator: a tab or two blanks.
pub(crate) fn spacer(input: &str) -> Res<&str> {
    alt((tag("\t"), recognize(pair(char(' '), one_of(" \t")))))(input)
}

pub(crate) fn line_end(input: &str) -> Res<&str> {
    alt((line_ending, eof))(input)
}

pub(crate) fn rest_of_line(input: &str) -> Res<&str> {
    take_while(is_not_eol_char)(input)
}

pub(crate) fn natural(input: &str) -> Res<u32> {
    map_res(digit1, str::parse::<u32>)(input)
}

pub(crate) fn ident(input: &str) -> Res<&str> {
    take_while1(is_ident_char)(input)
}

/// Decimal literal with optional sign, `,` thousands separators and fraction.
pub(crate) fn number(input: &str) -> Res<f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            take_while(|c: char| c.is_ascii_digit() || c == ','),
            opt(preceded(char('.'), digit1)),
        ))),
        |s: &str| s.replace(',', "").parse::<f64>(),
    )(input)
}

/// Text between two `delimiter` characters.
pub(crate) fn delimited_by<'a>(delimiter: char) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    delimited(
        char(delimiter),
        take_while(move |c: char| c != delimiter),
        char(delimiter),
    )
}

/// Text of a `;` note up to the end of the line, leading blanks skipped.
pub(crate) fn note_body(input: &str) -> Res<String> {
    map(preceded(lexeme(char(';')), rest_of_line), |s: &str| {
        s.to_string()
    })(input)
}

/// One of the commodity symbols known to `settings`.
pub(crate) fn commodity<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, &'a str> {
    for symbol in settings.commodities() {
        if input.starts_with(symbol.as_str()) {
            let (found, rest) = input.split_at(symbol.len());
            return Ok((rest, found));
        }
    }
    Err(nom::Err::Error(SyntaxError::new(input, ErrorKind::Tag)))
}

/// `[-] SYMBOL NUMBER` or `NUMBER [SYMBOL]`.
pub(crate) fn amount<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Amount> {
    alt((
        map(
            tuple((
                opt(lexeme(char('-'))),
                lexeme(|i: &'a str| commodity(i, settings)),
                number,
            )),
            |(negative, symbol, number)| {
                let amount = Amount::with_commodity(number, symbol);
                if negative.is_some() {
                    amount.negate()
                } else {
                    amount
                }
            },
        ),
        map(
            pair(lexeme(number), opt(|i: &'a str| commodity(i, settings))),
            |(number, symbol)| Amount::new(number, Commodity(symbol.map(str::to_string))),
        ),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_test() {
        assert_eq!(number("1000"), Ok(("", 1000.0)));
        assert_eq!(number("2.02"), Ok(("", 2.02)));
        assert_eq!(number("-12.13"), Ok(("", -12.13)));
        assert_eq!(number("1,000"), Ok(("", 1000.0)));
        assert_eq!(number("12,456,132.14 EUR"), Ok((" EUR", 12456132.14)));
        assert_eq!(number("1. "), Ok((". ", 1.0)));
        assert!(number("-x").is_err());
        assert!(number(",5").is_err());
    }

    #[test]
    fn spacer_test() {
        assert_eq!(spacer("\tx"), Ok(("x", "\t")));
        assert_eq!(spacer("  x"), Ok(("x", "  ")));
        assert_eq!(spacer(" \tx"), Ok(("x", " \t")));
        assert!(spacer(" x").is_err());
    }

    #[test]
    fn note_body_test() {
        assert_eq!(note_body(";  a note\nrest"), Ok(("\nrest", "a note".to_string())));
        assert_eq!(note_body(";"), Ok(("", "".to_string())));
    }

    #[test]
    fn amount_test() {
        let settings = ParserSettings::default();
        let examples = [
            ("$ 100.00", Amount::with_commodity(100.0, "$")),
            ("100.00$", Amount::with_commodity(100.0, "$")),
            ("100 USD", Amount::with_commodity(100.0, "USD")),
            ("1,000.00 EUR", Amount::with_commodity(1000.0, "EUR")),
            ("-$1.20", Amount::with_commodity(-1.2, "$")),
            ("- $ 1.20", Amount::with_commodity(-1.2, "$")),
            ("$-1.20", Amount::with_commodity(-1.2, "$")),
            ("-100 EUR", Amount::with_commodity(-100.0, "EUR")),
            ("0.7", Amount::bare(0.7)),
        ];
        for (text, expected) in examples.iter() {
            assert_eq!(amount(text, &settings), Ok(("", expected.clone())), "{}", text);
        }
    }

    #[test]
    fn furthest_alternative_wins() {
        let result: Res<(&str, &str)> =
            alt((pair(tag("ab"), tag("x")), pair(tag("a"), tag("y"))))("abc");
        match result {
            Err(nom::Err::Error(error)) => assert_eq!(error.input, "c"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn amount_with_custom_commodity() {
        assert_eq!(
            amount("5 GBP", &ParserSettings::default()),
            Ok(("GBP", Amount::bare(5.0)))
        );
        let settings = ParserSettings::default().with_commodity("GBP");
        assert_eq!(
            amount("5 GBP", &settings),
            Ok(("", Amount::with_commodity(5.0, "GBP")))
        );
    }
}
