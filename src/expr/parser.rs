use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, satisfy};
use nom::combinator::{map, not, value};
use nom::error::ErrorKind;
use nom::sequence::{delimited, terminated};

use crate::common::lexer::{amount, delimited_by, ident, is_ident_char, lexeme, Res, SyntaxError};
use crate::common::ParserSettings;
use crate::expr::{Expression, Operator};

type Level = for<'a> fn(&'a str, &ParserSettings) -> Res<'a, Expression>;

// Operators per precedence level, longer symbols before their prefixes.
const OR: &[Operator] = &[Operator::Or];
const AND: &[Operator] = &[Operator::And];
const COMPARISON: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::LessOrEqual,
    Operator::GreaterOrEqual,
    Operator::Match,
    Operator::NotMatch,
    Operator::Less,
    Operator::Greater,
];
const ADDITIVE: &[Operator] = &[Operator::Add, Operator::Subtract];
const MULTIPLICATIVE: &[Operator] = &[Operator::Multiply, Operator::Divide];

/// Parses an expression, `||` binding loosest and `*`, `/` tightest.
pub(crate) fn expression<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    or_level(input, settings)
}

/// Parenthesized expression.
pub(crate) fn parenthesized<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    delimited(
        lexeme(char('(')),
        |i: &'a str| expression(i, settings),
        lexeme(char(')')),
    )(input)
}

fn or_level<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    binary(input, settings, OR, and_level)
}

fn and_level<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    binary(input, settings, AND, comparison_level)
}

fn comparison_level<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    binary(input, settings, COMPARISON, additive_level)
}

fn additive_level<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    binary(input, settings, ADDITIVE, multiplicative_level)
}

fn multiplicative_level<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    binary(input, settings, MULTIPLICATIVE, factor)
}

/// Left-associative chain of `operand (operator operand)*`.
fn binary<'a>(
    input: &'a str,
    settings: &ParserSettings,
    operators: &[Operator],
    operand: Level,
) -> Res<'a, Expression> {
    let (mut input, mut lhs) = operand(input, settings)?;
    loop {
        match lexeme(|i: &'a str| operator(i, operators))(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = operand(rest, settings)?;
                lhs = Expression::infix(op, lhs, rhs);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, lhs)),
            Err(e) => return Err(e),
        }
    }
}

fn operator<'a>(input: &'a str, operators: &[Operator]) -> Res<'a, Operator> {
    for op in operators {
        if let Some(rest) = input.strip_prefix(op.symbol()) {
            return Ok((rest, *op));
        }
    }
    Err(nom::Err::Error(SyntaxError::new(input, ErrorKind::Tag)))
}

fn factor<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    alt((
        |i: &'a str| parenthesized(i, settings),
        lexeme(|i: &'a str| primitive(i, settings)),
    ))(input)
}

fn primitive<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    alt((
        map(|i: &'a str| amount(i, settings), Expression::Amount),
        map(delimited_by('/'), |s: &str| Expression::Regex(s.to_string())),
        map(alt((delimited_by('"'), delimited_by('\''))), |s: &str| {
            Expression::String(s.to_string())
        }),
        boolean,
        map(ident, |s: &str| Expression::Ident(s.to_string())),
    ))(input)
}

fn boolean(input: &str) -> Res<Expression> {
    terminated(
        alt((
            value(Expression::Bool(true), tag("true")),
            value(Expression::Bool(false), tag("false")),
        )),
        not(satisfy(is_ident_char)),
    )(input)
}
