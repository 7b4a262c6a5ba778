use crate::ast::*;
use crate::expr::{Expression, Operator};
use std::io;

#[non_exhaustive]
pub struct SerializerSettings {
    indent: String,
}

impl SerializerSettings {
    pub fn with_indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

/// Writes statements back as ledger source.
pub trait Serializer {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write;

    fn to_string_pretty(&self, settings: &SerializerSettings) -> String {
        let mut res = Vec::new();
        if self.write(&mut res, settings).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&res).into_owned()
    }
}

impl Serializer for [Statement] {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        for statement in self {
            statement.write(writer, settings)?;
        }
        Ok(())
    }
}

impl Serializer for Statement {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        match self {
            Statement::Year(year) => writeln!(writer, "year {}", year)?,
            Statement::Definition { name, expression } => {
                writeln!(writer, "define {} = {}", name, expression)?
            }
            Statement::Account(name) => writeln!(writer, "account {}", name)?,
            Statement::Commodity(name) => writeln!(writer, "commodity {}", name)?,
            Statement::Tag(name) => writeln!(writer, "tag {}", name)?,
            Statement::Comment(comment) => writeln!(writer, "; {}", comment)?,
            Statement::Transaction(transaction) => {
                transaction.write(writer, settings)?;
                write!(writer, "\n\n")?;
            }
            Statement::Automated(automated) => {
                automated.write(writer, settings)?;
                write!(writer, "\n\n")?;
            }
        }
        Ok(())
    }
}

impl Serializer for Transaction {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        write!(writer, "{}", self.date)?;

        if let Some(state) = self.state {
            write!(writer, " {}", state)?;
        }

        if !self.title.is_empty() {
            write!(writer, " {}", self.title)?;
        }

        for note in &self.notes {
            write!(writer, "\n{}; {}", settings.indent, note.0)?;
        }

        for posting in &self.postings {
            write!(writer, "\n{}", settings.indent)?;
            posting.write(writer, settings)?;
        }

        Ok(())
    }
}

fn write_account<W>(writer: &mut W, account: &str, is_virtual: bool) -> Result<(), io::Error>
where
    W: io::Write,
{
    if is_virtual {
        write!(writer, "[{}]", account)
    } else {
        write!(writer, "{}", account)
    }
}

/// Posting values are amounts or parenthesized expressions.
fn write_value<W>(writer: &mut W, value: &Expression) -> Result<(), io::Error>
where
    W: io::Write,
{
    match value {
        Expression::Amount(amount) => write!(writer, "{}", amount),
        Expression::Infix(..) => write!(writer, "{}", value),
        _ => write!(writer, "({})", value),
    }
}

impl Serializer for Posting {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        write_account(writer, &self.account, self.is_virtual)?;

        if let Some(ref value) = self.value {
            write!(writer, "  ")?;
            write_value(writer, value)?;
        }

        if let Some(ref cost) = self.cost {
            write!(writer, " {}", cost)?;
        }

        if let Some(ref balance) = self.balance_assertion {
            write!(writer, " = {}", balance)?;
        }

        for note in &self.notes {
            write!(writer, "\n{}; {}", settings.indent, note.0)?;
        }

        Ok(())
    }
}

impl Serializer for AutomatedTransaction {
    fn write<W>(&self, writer: &mut W, settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        match &self.match_expression {
            Expression::Infix(Operator::Match, lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expression::Ident(name), Expression::Regex(pattern)) if name == "account" => {
                    write!(writer, "= /{}/", pattern)?
                }
                _ => write!(writer, "= expr '{}'", self.match_expression)?,
            },
            expression => write!(writer, "= expr '{}'", expression)?,
        }

        for posting in &self.postings {
            write!(writer, "\n{}", settings.indent)?;
            posting.write(writer, settings)?;
        }

        Ok(())
    }
}

impl Serializer for AutomatedPosting {
    fn write<W>(&self, writer: &mut W, _settings: &SerializerSettings) -> Result<(), io::Error>
    where
        W: io::Write,
    {
        write_account(writer, &self.account, self.is_virtual)?;
        write!(writer, "  ")?;
        write_value(writer, &self.value)
    }
}
