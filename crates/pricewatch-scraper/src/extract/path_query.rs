//! A compact XPath 1.0 subset evaluated over [`Dom`].
//!
//! Supported: absolute and relative location paths with `/` and `//`; name
//! tests, `*`, `.`, `..`, `text()`, `node()`, `@name`, `@*`; predicates with
//! positions, `last()`, `and`, `or`, `not()`, parentheses, `=`/`!=` against a
//! literal, `contains()`, `starts-with()` and `normalize-space()`; and a
//! top-level `string(path)`.
//!
//! Relative paths are evaluated against the `<html>` element, absolute paths
//! against the document node.

use thiserror::Error;

use super::dom::{Dom, DomNode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct PathQueryError {
    pub message: String,
    pub offset: usize,
}

impl PathQueryError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    At,
    Star,
    Dot,
    DotDot,
    Eq,
    NotEq,
    Number(usize),
    Literal(String),
    Name(String),
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, PathQueryError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => {
                i += 1;
                Token::DoubleSlash
            }
            '/' => Token::Slash,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '@' => Token::At,
            '*' => Token::Star,
            '=' => Token::Eq,
            '!' if next == Some('=') => {
                i += 1;
                Token::NotEq
            }
            '.' if next == Some('.') => {
                i += 1;
                Token::DotDot
            }
            '.' => Token::Dot,
            '"' | '\'' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].1 != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(PathQueryError::new("unterminated string literal", offset));
                }
                let literal: String = chars[start..end].iter().map(|&(_, c)| c).collect();
                i = end;
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i + 1 < chars.len() && chars[i + 1].1.is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..=i].iter().map(|&(_, c)| c).collect();
                let value = digits
                    .parse::<usize>()
                    .map_err(|e| PathQueryError::new(format!("invalid number: {e}"), offset))?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i + 1 < chars.len() {
                    let n = chars[i + 1].1;
                    if n.is_alphanumeric() || n == '_' || n == '-' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                Token::Name(chars[start..=i].iter().map(|&(_, c)| c).collect())
            }
            other => {
                return Err(PathQueryError::new(
                    format!("unexpected character '{other}'"),
                    offset,
                ))
            }
        };
        tokens.push((token, offset));
        i += 1;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    AnyNode,
    Attribute(Option<String>),
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    /// Preceded by `//`.
    descendant: bool,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attr(String),
    Text,
    Context,
    NormalizeSpace(Box<Operand>),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Position(usize),
    Last,
    Exists(Operand),
    Equals(Operand, String),
    NotEquals(Operand, String),
    Contains(Operand, String),
    StartsWith(Operand, String),
}

/// A compiled path query.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    absolute: bool,
    steps: Vec<Step>,
    /// Wrapped in `string(...)`: only the first node's string value is returned.
    string_value: bool,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end_offset: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end_offset, |&(_, offset)| offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), PathQueryError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(PathQueryError::new(format!("expected {what}"), self.offset()))
        }
    }

    fn at_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    fn at_call(&self, name: &str) -> bool {
        self.at_name(name) && self.peek_at(1) == Some(&Token::LParen)
    }

    fn query(&mut self) -> Result<PathQuery, PathQueryError> {
        let string_value = self.at_call("string");
        if string_value {
            self.pos += 2;
        }
        let (absolute, steps) = self.path()?;
        if string_value {
            self.expect(&Token::RParen, "')' to close string()")?;
        }
        if self.peek().is_some() {
            return Err(PathQueryError::new("unexpected trailing input", self.offset()));
        }
        Ok(PathQuery {
            absolute,
            steps,
            string_value,
        })
    }

    fn path(&mut self) -> Result<(bool, Vec<Step>), PathQueryError> {
        let (absolute, mut descendant) = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                (true, false)
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                (true, true)
            }
            _ => (false, false),
        };

        let mut steps = Vec::new();
        loop {
            steps.push(self.step(descendant)?);
            match self.peek() {
                Some(Token::Slash) => descendant = false,
                Some(Token::DoubleSlash) => descendant = true,
                _ => break,
            }
            self.pos += 1;
        }
        Ok((absolute, steps))
    }

    fn step(&mut self, descendant: bool) -> Result<Step, PathQueryError> {
        let offset = self.offset();
        let test = match self.advance() {
            Some(Token::Dot) => NodeTest::SelfNode,
            Some(Token::DotDot) => NodeTest::Parent,
            Some(Token::Star) => NodeTest::AnyElement,
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => NodeTest::Attribute(Some(name.to_ascii_lowercase())),
                Some(Token::Star) => NodeTest::Attribute(None),
                _ => return Err(PathQueryError::new("expected attribute name", offset)),
            },
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                self.expect(&Token::RParen, "')'")?;
                match name.as_str() {
                    "text" => NodeTest::Text,
                    "node" => NodeTest::AnyNode,
                    other => {
                        return Err(PathQueryError::new(
                            format!("unsupported node test {other}()"),
                            offset,
                        ))
                    }
                }
            }
            Some(Token::Name(name)) => NodeTest::Name(name.to_ascii_lowercase()),
            _ => return Err(PathQueryError::new("expected a location step", offset)),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            if matches!(test, NodeTest::Attribute(_)) {
                return Err(PathQueryError::new(
                    "predicates on attribute steps are not supported",
                    self.offset(),
                ));
            }
            self.pos += 1;
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket, "']'")?;
        }

        Ok(Step {
            descendant,
            test,
            predicates,
        })
    }

    fn or_expr(&mut self) -> Result<Expr, PathQueryError> {
        let mut left = self.and_expr()?;
        while self.at_name("or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, PathQueryError> {
        let mut left = self.primary()?;
        while self.at_name("and") {
            self.pos += 1;
            let right = self.primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, PathQueryError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.or_expr()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(inner);
        }
        if let Some(&Token::Number(n)) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Position(n));
        }
        if self.at_call("last") {
            self.pos += 2;
            self.expect(&Token::RParen, "')' after last(")?;
            return Ok(Expr::Last);
        }
        if self.at_call("not") {
            self.pos += 2;
            let inner = self.or_expr()?;
            self.expect(&Token::RParen, "')' to close not()")?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        for (name, build) in [
            ("contains", Expr::Contains as fn(Operand, String) -> Expr),
            ("starts-with", Expr::StartsWith),
        ] {
            if self.at_call(name) {
                self.pos += 2;
                let operand = self.operand()?;
                self.expect(&Token::Comma, "','")?;
                let literal = self.literal()?;
                self.expect(&Token::RParen, "')'")?;
                return Ok(build(operand, literal));
            }
        }

        let operand = self.operand()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                Ok(Expr::Equals(operand, self.literal()?))
            }
            Some(Token::NotEq) => {
                self.pos += 1;
                Ok(Expr::NotEquals(operand, self.literal()?))
            }
            _ => Ok(Expr::Exists(operand)),
        }
    }

    fn operand(&mut self) -> Result<Operand, PathQueryError> {
        let offset = self.offset();
        if self.at_call("text") {
            self.pos += 2;
            self.expect(&Token::RParen, "')' after text(")?;
            return Ok(Operand::Text);
        }
        if self.at_call("normalize-space") {
            self.pos += 2;
            if self.peek() == Some(&Token::RParen) {
                self.pos += 1;
                return Ok(Operand::NormalizeSpace(Box::new(Operand::Context)));
            }
            let inner = self.operand()?;
            self.expect(&Token::RParen, "')' to close normalize-space()")?;
            return Ok(Operand::NormalizeSpace(Box::new(inner)));
        }
        match self.advance() {
            Some(Token::Dot) => Ok(Operand::Context),
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => Ok(Operand::Attr(name.to_ascii_lowercase())),
                _ => Err(PathQueryError::new("expected attribute name", offset)),
            },
            _ => Err(PathQueryError::new("expected a predicate", offset)),
        }
    }

    fn literal(&mut self) -> Result<String, PathQueryError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Literal(s)) => Ok(s),
            Some(Token::Number(n)) => Ok(n.to_string()),
            _ => Err(PathQueryError::new("expected a string literal", offset)),
        }
    }
}

impl PathQuery {
    /// Compiles a query.
    ///
    /// # Errors
    ///
    /// Returns [`PathQueryError`] when the query is empty, uses syntax outside
    /// the supported subset, or is malformed.
    pub fn parse(input: &str) -> Result<Self, PathQueryError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(PathQueryError::new("empty query", 0));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            end_offset: input.len(),
        };
        parser.query()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit<'a> {
    Node(usize),
    Attr { owner: usize, value: &'a str },
}

impl Hit<'_> {
    fn order_key(&self) -> (usize, u8) {
        match self {
            Hit::Node(i) => (*i, 0),
            Hit::Attr { owner, .. } => (*owner, 1),
        }
    }
}

const HTML_ELEMENT: usize = 1;

impl PathQuery {
    /// Runs the query and returns the string value of every result, in
    /// document order.
    pub(crate) fn evaluate(&self, dom: &Dom<'_>) -> Vec<String> {
        let start = if self.absolute || dom.len() <= HTML_ELEMENT {
            0
        } else {
            HTML_ELEMENT
        };
        let mut context = vec![Hit::Node(start)];

        for step in &self.steps {
            let mut next = Vec::new();
            for hit in &context {
                let Hit::Node(node) = *hit else {
                    continue;
                };
                let origins: Vec<usize> = if step.descendant {
                    std::iter::once(node).chain(dom.descendants(node)).collect()
                } else {
                    vec![node]
                };
                for origin in origins {
                    let candidates = apply_test(dom, origin, &step.test);
                    next.extend(filter_predicates(dom, candidates, &step.predicates));
                }
            }
            next.sort_by_key(Hit::order_key);
            next.dedup();
            context = next;
        }

        let values = context.into_iter().map(|hit| match hit {
            Hit::Node(i) => dom.text_content(i),
            Hit::Attr { value, .. } => value.to_owned(),
        });

        if self.string_value {
            values.take(1).collect()
        } else {
            values.collect()
        }
    }
}

fn apply_test<'a>(dom: &Dom<'a>, origin: usize, test: &NodeTest) -> Vec<Hit<'a>> {
    match test {
        NodeTest::SelfNode => vec![Hit::Node(origin)],
        NodeTest::Parent => dom.parent(origin).map(Hit::Node).into_iter().collect(),
        NodeTest::Attribute(name) => dom
            .element(origin)
            .map(|el| {
                el.value()
                    .attrs()
                    .filter(|(attr, _)| name.as_deref().is_none_or(|n| attr.eq_ignore_ascii_case(n)))
                    .map(|(_, value)| Hit::Attr {
                        owner: origin,
                        value,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        _ => dom
            .children(origin)
            .iter()
            .copied()
            .filter(|&child| match (test, dom.node(child)) {
                (NodeTest::AnyNode, _)
                | (NodeTest::Text, DomNode::Text(_))
                | (NodeTest::AnyElement, DomNode::Element(_)) => true,
                (NodeTest::Name(name), DomNode::Element(el)) => {
                    el.value().name().eq_ignore_ascii_case(name)
                }
                _ => false,
            })
            .map(Hit::Node)
            .collect(),
    }
}

fn filter_predicates<'a>(dom: &Dom<'a>, mut hits: Vec<Hit<'a>>, predicates: &[Expr]) -> Vec<Hit<'a>> {
    for predicate in predicates {
        let size = hits.len();
        hits = hits
            .into_iter()
            .enumerate()
            .filter(|&(i, hit)| match hit {
                Hit::Node(node) => matches(dom, node, i + 1, size, predicate),
                Hit::Attr { .. } => false,
            })
            .map(|(_, hit)| hit)
            .collect();
    }
    hits
}

fn matches(dom: &Dom<'_>, node: usize, position: usize, size: usize, expr: &Expr) -> bool {
    match expr {
        Expr::Or(a, b) => {
            matches(dom, node, position, size, a) || matches(dom, node, position, size, b)
        }
        Expr::And(a, b) => {
            matches(dom, node, position, size, a) && matches(dom, node, position, size, b)
        }
        Expr::Not(inner) => !matches(dom, node, position, size, inner),
        Expr::Position(n) => position == *n,
        Expr::Last => position == size,
        Expr::Exists(operand) => !operand_values(dom, node, operand).is_empty(),
        Expr::Equals(operand, literal) => operand_values(dom, node, operand)
            .iter()
            .any(|v| v == literal),
        Expr::NotEquals(operand, literal) => operand_values(dom, node, operand)
            .iter()
            .any(|v| v != literal),
        Expr::Contains(operand, literal) => {
            first_value(dom, node, operand).contains(literal.as_str())
        }
        Expr::StartsWith(operand, literal) => {
            first_value(dom, node, operand).starts_with(literal.as_str())
        }
    }
}

fn operand_values(dom: &Dom<'_>, node: usize, operand: &Operand) -> Vec<String> {
    match operand {
        Operand::Attr(name) => dom
            .element(node)
            .and_then(|el| el.value().attr(name))
            .map(str::to_owned)
            .into_iter()
            .collect(),
        Operand::Text => dom
            .children(node)
            .iter()
            .filter_map(|&child| match dom.node(child) {
                DomNode::Text(text) => Some(text.to_owned()),
                _ => None,
            })
            .collect(),
        Operand::Context => vec![dom.text_content(node)],
        Operand::NormalizeSpace(inner) => {
            let value = first_value(dom, node, inner);
            vec![value.split_whitespace().collect::<Vec<_>>().join(" ")]
        }
    }
}

fn first_value(dom: &Dom<'_>, node: usize, operand: &Operand) -> String {
    operand_values(dom, node, operand)
        .into_iter()
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "path_query_test.rs"]
mod tests;
