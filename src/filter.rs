//! Free-text transaction filters.
//!
//! A query such as `june 2016 food` is split into tokens; years and months
//! select a period, everything else is searched for in titles, accounts and
//! amounts.

use chrono::{Datelike, Local};
use nom::bytes::complete::take_while_m_n;
use nom::combinator::{all_consuming, map_res};

use crate::common::lexer::Res;
use crate::engine::{EvaluatedPosting, EvaluatedTransaction};
use crate::expr::EvaluatedDate;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Years outside of this range are plain text.
const YEARS: std::ops::Range<i32> = 1900..2100;

/// Last day of every filtered month.
const LAST_DAY: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    Year(i32),
    /// 1-based month.
    Month(u32),
    Other(String),
}

fn four_digits(input: &str) -> Res<i32> {
    map_res(take_while_m_n(4, 4, |c: char| c.is_ascii_digit()), str::parse::<i32>)(input)
}

fn year(token: &str) -> Option<i32> {
    all_consuming(four_digits)(token)
        .ok()
        .map(|(_, year)| year)
        .filter(|year| YEARS.contains(year))
}

fn month(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    MONTHS
        .iter()
        .position(|name| *name == token || name[..3] == token)
        .map(|index| index as u32 + 1)
}

/// Splits `query` on whitespace and classifies every token.
pub fn tokenize(query: &str) -> Vec<FilterToken> {
    query
        .split_whitespace()
        .map(|token| {
            if let Some(year) = year(token) {
                FilterToken::Year(year)
            } else if let Some(month) = month(token) {
                FilterToken::Month(month)
            } else {
                FilterToken::Other(token.to_string())
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Posting account starting with the prefix.
    Account(String),
    /// Case-insensitive text in the title, a posting account or amount.
    Text(String),
    /// Transaction date within the range, both ends included.
    Period {
        from: EvaluatedDate,
        to: EvaluatedDate,
    },
}

impl Filter {
    /// Filters of `query`, a month without a year refers to the current year.
    pub fn parse(query: &str) -> Vec<Filter> {
        Filter::parse_for_year(query, Local::now().year())
    }

    pub fn parse_for_year(query: &str, current_year: i32) -> Vec<Filter> {
        let mut year = None;
        let mut month = None;
        let mut filters = Vec::new();
        for token in tokenize(query) {
            match token {
                FilterToken::Year(value) => year = Some(value),
                FilterToken::Month(value) => month = Some(value),
                FilterToken::Other(text) => filters.push(Filter::Text(text)),
            }
        }

        let period = match (year, month) {
            (Some(year), Some(month)) => Some((
                EvaluatedDate::new(year, month, 1),
                EvaluatedDate::new(year, month, LAST_DAY),
            )),
            (Some(year), None) => Some((
                EvaluatedDate::new(year, 1, 1),
                EvaluatedDate::new(year, 12, 31),
            )),
            (None, Some(month)) => Some((
                EvaluatedDate::new(current_year, month, 1),
                EvaluatedDate::new(current_year, month, LAST_DAY),
            )),
            (None, None) => None,
        };
        if let Some((from, to)) = period {
            filters.push(Filter::Period { from, to });
        }
        filters
    }
}

impl EvaluatedPosting {
    pub fn matches(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Account(prefix) => self.account.starts_with(prefix.as_str()),
            Filter::Text(text) => {
                let text = text.to_lowercase();
                self.account.to_lowercase().contains(&text)
                    || self.amount.to_string().to_lowercase().contains(&text)
            }
            Filter::Period { .. } => false,
        }
    }
}

impl EvaluatedTransaction {
    /// Whether every filter matches.
    pub fn matches(&self, filters: &[Filter]) -> bool {
        filters.iter().all(|filter| self.matches_filter(filter))
    }

    fn matches_filter(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Account(_) => self.postings.iter().any(|p| p.matches(filter)),
            Filter::Text(text) => {
                self.title.to_lowercase().contains(&text.to_lowercase())
                    || self.postings.iter().any(|p| p.matches(filter))
            }
            Filter::Period { from, to } => *from <= self.date && self.date <= *to,
        }
    }
}
