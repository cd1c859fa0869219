//! Query parser for the classic `field:term` syntax.
//!
//! Supported syntax:
//!
//! - `term`, `field:term`, `"a phrase"`, `field:"a phrase"`
//! - `+required`, `-prohibited`, `NOT prohibited`
//! - `a AND b`, `a OR b`, `a && b`, `a || b`
//! - grouping with parentheses, `field:(a b)`
//! - `*:*` for every document
//! - `\` escapes the next character
//!
//! Terms and phrases go through the analyzer of their field, so the query
//! `Hello` finds documents indexed with `hello`. A term the analyzer drops
//! entirely (a stop word) contributes no clause.
//!
//! With no default field, or an empty one, unqualified terms match any field.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use crate::analysis::analyzer::{Analyzer, analyze_field};
use crate::error::{LucernaError, Result};
use crate::query::boolean::{BooleanQuery, Occur};
use crate::query::match_all::MatchAllQuery;
use crate::query::phrase::PhraseQuery;
use crate::query::query::Query;
use crate::query::term::TermQuery;

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Word(String),
    FieldTerm(String, String),
    Field(String),
    Phrase(String),
    Plus,
    Minus,
    Not,
    And,
    Or,
    LParen,
    RParen,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Lexeme>> {
        let mut lexemes = Vec::new();

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '(' => {
                    self.chars.next();
                    lexemes.push(Lexeme::LParen);
                }
                ')' => {
                    self.chars.next();
                    lexemes.push(Lexeme::RParen);
                }
                '"' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Phrase(self.read_phrase()?));
                }
                '+' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Plus);
                }
                '-' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Minus);
                }
                _ => lexemes.push(self.read_word()?),
            }
        }

        Ok(lexemes)
    }

    fn read_phrase(&mut self) -> Result<String> {
        let mut phrase = String::new();
        while let Some(ch) = self.chars.next() {
            match ch {
                '"' => return Ok(phrase),
                '\\' => match self.chars.next() {
                    Some(escaped) => phrase.push(escaped),
                    None => break,
                },
                other => phrase.push(other),
            }
        }
        Err(LucernaError::query_parse(format!(
            "unterminated phrase \"{phrase}"
        )))
    }

    fn read_word(&mut self) -> Result<Lexeme> {
        let mut word = String::new();
        let mut colon = None;

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"') {
                break;
            }
            self.chars.next();
            match ch {
                '\\' => match self.chars.next() {
                    Some(escaped) => word.push(escaped),
                    None => {
                        return Err(LucernaError::query_parse("dangling escape at end of query"));
                    }
                },
                ':' if colon.is_none() => {
                    colon = Some(word.len());
                    word.push(ch);
                }
                _ => word.push(ch),
            }
        }

        let lexeme = match (colon, word.as_str()) {
            (None, "AND" | "&&") => Lexeme::And,
            (None, "OR" | "||") => Lexeme::Or,
            (None, "NOT") => Lexeme::Not,
            (None, _) => Lexeme::Word(word),
            (Some(0), _) => {
                return Err(LucernaError::query_parse(format!(
                    "missing field name in '{word}'"
                )));
            }
            (Some(at), _) => {
                let field = word[..at].to_string();
                let value = word[at + 1..].to_string();
                if value.is_empty() {
                    Lexeme::Field(field)
                } else {
                    Lexeme::FieldTerm(field, value)
                }
            }
        };
        Ok(lexeme)
    }
}

/// Parses query strings into [`Query`] trees.
#[derive(Clone)]
pub struct QueryParser {
    default_field: Option<String>,
    analyzer: Arc<dyn Analyzer>,
    default_occur: Occur,
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("default_field", &self.default_field)
            .field("analyzer", &self.analyzer.name())
            .field("default_occur", &self.default_occur)
            .finish()
    }
}

impl QueryParser {
    /// A parser whose unqualified terms match any field and combine with OR.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            default_field: None,
            analyzer,
            default_occur: Occur::Should,
        }
    }

    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        let field = field.into();
        self.default_field = (!field.is_empty()).then_some(field);
        self
    }

    /// Combine adjacent clauses with AND instead of OR.
    pub fn with_default_and(mut self) -> Self {
        self.default_occur = Occur::Must;
        self
    }

    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    pub fn parse(&self, query_str: &str) -> Result<Box<dyn Query>> {
        let lexemes = Lexer::new(query_str.trim()).tokenize()?;
        if lexemes.is_empty() {
            return Ok(Box::new(BooleanQuery::new()));
        }

        let mut state = ParseState {
            parser: self,
            lexemes,
            pos: 0,
        };
        let default_field = self.default_field.clone();
        let query = state.parse_clauses(default_field.as_deref(), false)?;
        Ok(query.unwrap_or_else(|| Box::new(BooleanQuery::new())))
    }

    fn term_query(&self, field: Option<&str>, text: &str) -> Result<Option<Box<dyn Query>>> {
        let field_name = field.unwrap_or("");
        let terms: Vec<String> = analyze_field(self.analyzer.as_ref(), field_name, text)?
            .filter(|token| !token.is_stopped())
            .map(|token| token.text)
            .collect();

        let query: Option<Box<dyn Query>> = match terms.len() {
            0 => None,
            1 => Some(Box::new(TermQuery::new(field_name, terms[0].clone()))),
            _ => {
                let mut boolean = BooleanQuery::new();
                for term in terms {
                    boolean.add_clause(Box::new(TermQuery::new(field_name, term)), Occur::Should);
                }
                Some(Box::new(boolean))
            }
        };
        Ok(query)
    }

    fn phrase_query(&self, field: Option<&str>, text: &str) -> Result<Option<Box<dyn Query>>> {
        let field_name = field.unwrap_or("");
        let terms: Vec<(u32, String)> = analyze_field(self.analyzer.as_ref(), field_name, text)?
            .filter(|token| !token.is_stopped())
            .map(|token| (token.position as u32, token.text))
            .collect();

        let query: Option<Box<dyn Query>> = match terms.len() {
            0 => None,
            1 => Some(Box::new(TermQuery::new(field_name, terms[0].1.clone()))),
            _ => Some(Box::new(PhraseQuery::new(field_name, terms))),
        };
        Ok(query)
    }
}

struct ParseState<'p> {
    parser: &'p QueryParser,
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl ParseState<'_> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn next(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    /// Parse a clause list up to the end of input or, when `nested`, the
    /// closing parenthesis.
    fn parse_clauses(
        &mut self,
        field: Option<&str>,
        nested: bool,
    ) -> Result<Option<Box<dyn Query>>> {
        let mut clauses: Vec<(Box<dyn Query>, Occur)> = Vec::new();
        let mut seen_clause = false;

        loop {
            match self.peek() {
                None if nested => return Err(LucernaError::query_parse("missing closing ')'")),
                None => break,
                Some(Lexeme::RParen) if nested => {
                    self.next();
                    break;
                }
                Some(Lexeme::RParen) => {
                    return Err(LucernaError::query_parse("unexpected ')'"));
                }
                _ => {}
            }

            let conjunction = match self.peek() {
                Some(Lexeme::And) => {
                    self.next();
                    Some(Occur::Must)
                }
                Some(Lexeme::Or) => {
                    self.next();
                    Some(Occur::Should)
                }
                _ => None,
            };
            if conjunction.is_some() && !seen_clause {
                return Err(LucernaError::query_parse(
                    "operator without a left-hand clause",
                ));
            }

            let modifier = match self.peek() {
                Some(Lexeme::Plus) => {
                    self.next();
                    Some(Occur::Must)
                }
                Some(Lexeme::Minus) | Some(Lexeme::Not) => {
                    self.next();
                    Some(Occur::MustNot)
                }
                _ => None,
            };

            let query = self.parse_atom(field)?;
            seen_clause = true;

            if conjunction == Some(Occur::Must)
                && let Some((_, previous)) = clauses.last_mut()
                && *previous == Occur::Should
            {
                *previous = Occur::Must;
            }

            let occur = match (modifier, conjunction) {
                (Some(occur), _) => occur,
                (None, Some(Occur::Must)) => Occur::Must,
                (None, Some(_)) => Occur::Should,
                (None, None) => self.parser.default_occur,
            };

            if let Some(query) = query {
                clauses.push((query, occur));
            }
        }

        if clauses.len() == 1 && clauses[0].1 != Occur::MustNot {
            return Ok(clauses.pop().map(|(query, _)| query));
        }
        if clauses.is_empty() {
            return Ok(None);
        }

        let mut boolean = BooleanQuery::new();
        for (query, occur) in clauses {
            boolean.add_clause(query, occur);
        }
        Ok(Some(Box::new(boolean)))
    }

    fn parse_atom(&mut self, field: Option<&str>) -> Result<Option<Box<dyn Query>>> {
        match self.next() {
            Some(Lexeme::LParen) => self.parse_clauses(field, true),
            Some(Lexeme::Phrase(text)) => self.parser.phrase_query(field, &text),
            Some(Lexeme::Word(word)) => self.parser.term_query(field, &word),
            Some(Lexeme::FieldTerm(name, value)) => {
                if name == "*" && value == "*" {
                    Ok(Some(Box::new(MatchAllQuery::new())))
                } else {
                    self.parser.term_query(Some(&name), &value)
                }
            }
            Some(Lexeme::Field(name)) => match self.next() {
                Some(Lexeme::Phrase(text)) => self.parser.phrase_query(Some(&name), &text),
                Some(Lexeme::LParen) => self.parse_clauses(Some(&name), true),
                Some(Lexeme::Word(word)) => self.parser.term_query(Some(&name), &word),
                _ => Err(LucernaError::query_parse(format!(
                    "missing value for field '{name}'"
                ))),
            },
            Some(other) => Err(LucernaError::query_parse(format!(
                "unexpected {other:?} where a term was expected"
            ))),
            None => Err(LucernaError::query_parse(
                "query ends with a dangling operator",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::{KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
    use crate::document::RID;

    fn parser() -> QueryParser {
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new().unwrap()));
        analyzer.add_analyzer(RID, Arc::new(KeywordAnalyzer::new()));
        QueryParser::new(Arc::new(analyzer))
    }

    #[test]
    fn test_parse_simple_term() {
        let query = parser().parse("Hello").unwrap();
        assert_eq!(query.description(), "hello");

        let query = parser().with_default_field("title").parse("hello").unwrap();
        assert_eq!(query.description(), "title:hello");
    }

    #[test]
    fn test_parse_field_term() {
        let query = parser().parse("title:Hello").unwrap();
        assert_eq!(query.description(), "title:hello");

        let query = parser().parse("RID:#12:4").unwrap();
        assert_eq!(query.description(), "RID:#12:4");
    }

    #[test]
    fn test_parse_implicit_or_and_explicit_and() {
        let query = parser().parse("rome paris").unwrap();
        assert_eq!(query.description(), "(rome paris)");

        let query = parser().parse("rome AND paris").unwrap();
        assert_eq!(query.description(), "(+rome +paris)");

        let query = parser().with_default_and().parse("rome paris").unwrap();
        assert_eq!(query.description(), "(+rome +paris)");

        let query = parser().parse("rome || paris").unwrap();
        assert_eq!(query.description(), "(rome paris)");
    }

    #[test]
    fn test_parse_modifiers() {
        let query = parser().parse("+title:hello -title:spam").unwrap();
        assert_eq!(query.description(), "(+title:hello -title:spam)");

        let query = parser().parse("hello NOT spam").unwrap();
        assert_eq!(query.description(), "(hello -spam)");

        let query = parser().parse("-spam").unwrap();
        assert_eq!(query.description(), "(-spam)");
    }

    #[test]
    fn test_parse_phrase() {
        let query = parser().parse("\"Hello World\"").unwrap();
        assert_eq!(query.description(), "\"hello world\"");

        let query = parser().parse("title:\"hello world\"").unwrap();
        assert_eq!(query.description(), "title:\"hello world\"");

        let query = parser().parse("\"hello\"").unwrap();
        assert_eq!(query.description(), "hello");
    }

    #[test]
    fn test_parse_groups() {
        let query = parser().parse("+(rome paris) -milan").unwrap();
        assert_eq!(query.description(), "(+(rome paris) -milan)");

        let query = parser().parse("city:(rome paris)").unwrap();
        assert_eq!(query.description(), "(city:rome city:paris)");
    }

    #[test]
    fn test_stop_words_drop_clauses() {
        let query = parser().parse("the rome").unwrap();
        assert_eq!(query.description(), "rome");

        let query = parser().parse("the").unwrap();
        assert_eq!(query.description(), "()");
    }

    #[test]
    fn test_parse_match_all_and_empty() {
        assert_eq!(parser().parse("*:*").unwrap().description(), "*:*");
        assert_eq!(parser().parse("   ").unwrap().description(), "()");
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "\"unterminated",
            "(rome paris",
            "rome paris)",
            "AND rome",
            "rome AND",
            "rome +",
            "title:",
            ":rome",
            "rome\\",
        ] {
            let err = parser().parse(bad).unwrap_err();
            assert!(err.is_parse_error(), "expected parse error for {bad:?}, got {err}");
        }
    }

    #[test]
    fn test_escaped_colon_is_not_a_field() {
        let query = parser().parse("rome\\:paris").unwrap();
        assert_eq!(query.description(), "(rome paris)");
    }
}
