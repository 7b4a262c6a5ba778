use log::trace;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, line_ending, multispace0, one_of, space0, space1};
use nom::combinator::{map, opt, recognize};
use nom::error::ErrorKind;
use nom::multi::many1;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};

use crate::ast::*;
use crate::common::lexer::*;
use crate::common::*;
use crate::error::ParseError;
use crate::expr::parser::{expression, parenthesized};
use crate::expr::{Expression, Operator};

enum PostingOrNote {
    Posting(Posting),
    Note(Note),
}

fn month_day<'a>(separator: char) -> impl FnMut(&'a str) -> Res<'a, (u32, Option<u32>)> {
    pair(
        preceded(char(separator), natural),
        opt(preceded(char(separator), natural)),
    )
}

/// `N/N[/N]` or `N-N[-N]`. With two numbers the year is left open.
pub(crate) fn date(input: &str) -> Res<Date> {
    let (rest, (first, (second, third))) = pair(natural, alt((month_day('/'), month_day('-'))))(input)?;
    match third {
        Some(day) => {
            let year = i32::try_from(first)
                .map_err(|_| nom::Err::Error(SyntaxError::new(input, ErrorKind::Digit)))?;
            Ok((rest, Date::new(year, second, day)))
        }
        None => Ok((rest, Date::without_year(first, second))),
    }
}

fn transaction_state(input: &str) -> Res<TransactionState> {
    alt((
        map(char('*'), |_| TransactionState::Cleared),
        map(char('!'), |_| TransactionState::Pending),
    ))(input)
}

fn trailing_note_start(input: &str) -> Res<&str> {
    recognize(pair(spacer, char(';')))(input)
}

/// Title runs to the end of the line or to a trailing note.
fn title(input: &str) -> Res<&str> {
    let end = input
        .char_indices()
        .find(|&(pos, c)| {
            !is_not_eol_char(c) || (is_white_char(c) && trailing_note_start(&input[pos..]).is_ok())
        })
        .map(|(pos, _)| pos)
        .unwrap_or_else(|| input.len());
    Ok((&input[end..], &input[..end]))
}

/// Account name: blanks are allowed one at a time, two blanks or a tab end it.
pub(crate) fn account(input: &str) -> Res<&str> {
    let mut end = 0;
    let mut chars = input.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        if c == ' ' && pos > 0 {
            match chars.peek() {
                Some(&(_, next)) if !next.is_whitespace() => continue,
                _ => break,
            }
        } else if c.is_whitespace() {
            break;
        }
        end = pos + c.len_utf8();
    }

    if end == 0 {
        Err(nom::Err::Error(SyntaxError::new(input, ErrorKind::TakeWhile1)))
    } else {
        Ok((&input[end..], &input[..end]))
    }
}

fn account_virtuality(name: &str) -> (String, bool) {
    if let Some(n1) = name.strip_prefix('[') {
        if let Some(n2) = n1.strip_suffix(']') {
            return (n2.to_string(), true);
        }
    }
    (name.to_string(), false)
}

fn posting_value<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    alt((
        map(|i: &'a str| amount(i, settings), Expression::Amount),
        |i: &'a str| parenthesized(i, settings),
    ))(input)
}

fn cost<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Cost> {
    map(
        pair(
            lexeme(alt((
                map(tag("@@"), |_| CostKind::Total),
                map(tag("@"), |_| CostKind::PerUnit),
            ))),
            |i: &'a str| amount(i, settings),
        ),
        |(kind, amount)| Cost { kind, amount },
    )(input)
}

fn balance_assertion<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Amount> {
    preceded(lexeme(char('=')), |i: &'a str| amount(i, settings))(input)
}

pub(crate) fn posting<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Posting> {
    map(
        tuple((
            lexeme(account),
            opt(lexeme(|i: &'a str| posting_value(i, settings))),
            opt(lexeme(|i: &'a str| cost(i, settings))),
            opt(lexeme(|i: &'a str| balance_assertion(i, settings))),
            opt(note_body),
        )),
        |(account, value, cost, balance_assertion, note)| {
            let (account, is_virtual) = account_virtuality(account);
            Posting {
                account,
                value,
                cost,
                balance_assertion,
                is_virtual,
                notes: note.map(Note).into_iter().collect(),
            }
        },
    )(input)
}

/// Indented line following the current one.
fn indented<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    preceded(pair(line_ending, space1), parser)
}

fn posting_or_note<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, PostingOrNote> {
    alt((
        map(lexeme(note_body), |note| PostingOrNote::Note(Note(note))),
        map(lexeme(|i: &'a str| posting(i, settings)), PostingOrNote::Posting),
    ))(input)
}

fn transaction_header(input: &str) -> Res<(Date, Option<TransactionState>, &str, Option<String>)> {
    tuple((
        lexeme(date),
        lexeme(opt(transaction_state)),
        title,
        opt(preceded(spacer, note_body)),
    ))(input)
}

pub(crate) fn transaction<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Transaction> {
    let (rest, (date, state, title, note)) = transaction_header(input)?;
    let (rest, items) = many1(indented(|i: &'a str| posting_or_note(i, settings)))(rest)?;

    let mut notes: Vec<Note> = note.map(Note).into_iter().collect();
    let mut postings: Vec<Posting> = Vec::new();
    for item in items {
        match item {
            PostingOrNote::Posting(posting) => postings.push(posting),
            PostingOrNote::Note(note) => match postings.last_mut() {
                Some(posting) => posting.notes.push(note),
                None => notes.push(note),
            },
        }
    }

    Ok((
        rest,
        Transaction {
            date,
            state,
            title: title.to_string(),
            notes,
            postings,
        },
    ))
}

fn automated_posting<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, AutomatedPosting> {
    map(
        pair(lexeme(account), |i: &'a str| posting_value(i, settings)),
        |(account, value)| {
            let (account, is_virtual) = account_virtuality(account);
            AutomatedPosting {
                account,
                value,
                is_virtual,
            }
        },
    )(input)
}

/// `= expr 'EXPRESSION'` or `= /REGEX/`, the latter matching on `account`.
fn automated_header<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Expression> {
    preceded(
        lexeme(char('=')),
        alt((
            preceded(
                lexeme(tag("expr")),
                delimited(
                    lexeme(char('\'')),
                    lexeme(|i: &'a str| expression(i, settings)),
                    char('\''),
                ),
            ),
            map(delimited_by('/'), |pattern: &str| {
                Expression::infix(
                    Operator::Match,
                    Expression::ident("account"),
                    Expression::regex(pattern),
                )
            }),
        )),
    )(input)
}

pub(crate) fn automated_transaction<'a>(
    input: &'a str,
    settings: &ParserSettings,
) -> Res<'a, AutomatedTransaction> {
    map(
        pair(
            lexeme(|i: &'a str| automated_header(i, settings)),
            many1(indented(lexeme(|i: &'a str| automated_posting(i, settings)))),
        ),
        |(match_expression, postings)| AutomatedTransaction {
            match_expression,
            postings,
        },
    )(input)
}

fn keyword<'a>(name: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag(name), space1)
}

fn comment(input: &str) -> Res<&str> {
    preceded(pair(one_of(";#%|*"), space0), rest_of_line)(input)
}

fn definition<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Statement> {
    map(
        tuple((
            keyword("define"),
            lexeme(ident),
            lexeme(char('=')),
            |i: &'a str| expression(i, settings),
        )),
        |(_, name, _, expression)| Statement::Definition {
            name: name.to_string(),
            expression,
        },
    )(input)
}

fn year(input: &str) -> Res<i32> {
    let (rest, number) = preceded(keyword("year"), natural)(input)?;
    let year = i32::try_from(number).map_err(|_| nom::Err::Error(SyntaxError::new(input, ErrorKind::Digit)))?;
    Ok((rest, year))
}

pub(crate) fn statement<'a>(input: &'a str, settings: &ParserSettings) -> Res<'a, Statement> {
    alt((
        map(|i: &'a str| transaction(i, settings), Statement::Transaction),
        map(year, Statement::Year),
        map(
            preceded(keyword("commodity"), take_while1(|c: char| !c.is_whitespace())),
            |name: &str| Statement::Commodity(name.to_string()),
        ),
        map(comment, |text: &str| Statement::Comment(text.to_string())),
        map(preceded(keyword("account"), account), |name: &str| {
            Statement::Account(name.to_string())
        }),
        |i: &'a str| definition(i, settings),
        map(preceded(keyword("tag"), ident), |name: &str| {
            Statement::Tag(name.to_string())
        }),
        map(
            |i: &'a str| automated_transaction(i, settings),
            Statement::Automated,
        ),
    ))(input)
}

fn position(source: &str, at: &str) -> (usize, usize) {
    let consumed = &source[..source.len() - at.len()];
    let line = consumed.matches('\n').count() + 1;
    let line_start = consumed.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    let column = consumed[line_start..].chars().count() + 1;
    (line, column)
}

/// Whether `input` starts a block whose indented lines never arrive.
fn is_truncated_block<'a>(input: &'a str, settings: &ParserSettings) -> bool {
    let header = alt((
        map(transaction_header, |_| ()),
        map(|i: &'a str| automated_header(i, settings), |_| ()),
    ));
    match terminated(header, pair(space0, line_end))(input) {
        Ok((rest, _)) => rest.trim().is_empty(),
        Err(_) => false,
    }
}

/// Error for the statement starting at `at`, which failed at `failed`.
fn parse_error(source: &str, at: &str, failed: &str, settings: &ParserSettings) -> ParseError {
    if is_truncated_block(at, settings) {
        let (line, column) = position(source, &source[source.len()..]);
        return ParseError::UnexpectedEof { line, column };
    }
    let (line, column) = position(source, failed);
    let found = failed.lines().next().unwrap_or_default().to_string();
    ParseError::UnexpectedInput {
        line,
        column,
        found,
    }
}

pub(crate) fn parse_statements<'a>(
    input: &'a str,
    settings: &ParserSettings,
) -> Result<Vec<Statement>, ParseError> {
    let mut statements = Vec::new();
    let mut rest = skip_blank(input);

    while !rest.is_empty() {
        match terminated(|i: &'a str| statement(i, settings), pair(space0, line_end))(rest) {
            Ok((next, statement)) => {
                trace!("parsed statement {}: {:?}", statements.len(), statement);
                statements.push(statement);
                rest = skip_blank(next);
            }
            Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => {
                return Err(parse_error(input, rest, error.input, settings))
            }
            Err(nom::Err::Incomplete(_)) => return Err(parse_error(input, rest, rest, settings)),
        }
    }

    Ok(statements)
}

fn skip_blank(input: &str) -> &str {
    match multispace0::<&str, SyntaxError>(input) {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}
