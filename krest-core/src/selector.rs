//! Label and field selector expressions in the Kubernetes query grammar.
use std::{collections::BTreeMap, fmt, iter::FromIterator, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

type Map = BTreeMap<String, String>;

#[derive(Debug, Error)]
#[error("failed to parse selector requirement: {0}")]
/// Failed to parse a selector requirement
pub struct ParseExpressionError(pub String);

/// A single label selector requirement.
///
/// Values of `In`/`NotIn` keep the caller's insertion order when serialized.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Expression {
    /// `key=value`
    Equal(String, String),
    /// `key!=value`
    NotEqual(String, String),
    /// `key in (v1,v2)`
    In(String, Vec<String>),
    /// `key notin (v1,v2)`
    NotIn(String, Vec<String>),
    /// bare `key`
    Exists(String),
}

/// An ordered list of label selector requirements, comma-joined on the wire.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct Selector(pub(crate) Vec<Expression>);

impl Selector {
    /// Create a selector from a vector of expressions
    pub fn from_expressions(exprs: Vec<Expression>) -> Self {
        Self(exprs)
    }

    /// Whether this selector places no restriction at all
    pub fn selects_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Append further requirements to the selector
    pub fn extend(&mut self, other: Selector) {
        self.0.extend(other.0);
    }

    /// Evaluate the selector against a label map
    pub fn matches(&self, labels: &Map) -> bool {
        self.0.iter().all(|e| e.matches(labels))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Equal(key, value) => write!(f, "{key}={value}"),
            Expression::NotEqual(key, value) => write!(f, "{key}!={value}"),
            Expression::In(key, values) => write!(f, "{key} in ({})", values.join(",")),
            Expression::NotIn(key, values) => write!(f, "{key} notin ({})", values.join(",")),
            Expression::Exists(key) => write!(f, "{key}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for expr in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{expr}")?;
            first = false;
        }
        Ok(())
    }
}

impl Expression {
    fn matches(&self, labels: &Map) -> bool {
        match self {
            Expression::Equal(key, value) => labels.get(key) == Some(value),
            Expression::NotEqual(key, value) => labels.get(key) != Some(value),
            Expression::In(key, values) => match labels.get(key) {
                Some(v) => values.contains(v),
                None => false,
            },
            Expression::NotIn(key, values) => match labels.get(key) {
                Some(v) => !values.contains(v),
                None => true,
            },
            Expression::Exists(key) => labels.contains_key(key),
        }
    }
}

impl FromStr for Expression {
    type Err = ParseExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseExpressionError(s.into()));
        }
        if let Some((key, rest)) = split_set_operator(s, " notin ") {
            return Ok(Expression::NotIn(key, parse_value_set(rest, s)?));
        }
        if let Some((key, rest)) = split_set_operator(s, " in ") {
            return Ok(Expression::In(key, parse_value_set(rest, s)?));
        }
        if let Some((key, value)) = s.split_once("!=") {
            return Ok(Expression::NotEqual(key.trim().into(), value.trim().into()));
        }
        if let Some((key, value)) = s.split_once('=') {
            return Ok(Expression::Equal(key.trim().into(), value.trim().into()));
        }
        if s.contains(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',') {
            return Err(ParseExpressionError(s.into()));
        }
        Ok(Expression::Exists(s.into()))
    }
}

fn split_set_operator<'a>(s: &'a str, op: &str) -> Option<(String, &'a str)> {
    s.find(op)
        .map(|idx| (s[..idx].trim().to_string(), s[idx + op.len()..].trim()))
}

fn parse_value_set(rest: &str, original: &str) -> Result<Vec<String>, ParseExpressionError> {
    let inner = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| ParseExpressionError(original.into()))?;
    Ok(inner.split(',').map(|v| v.trim().to_string()).collect())
}

impl FromStr for Selector {
    type Err = ParseExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Selector::default());
        }
        split_requirements(s)
            .into_iter()
            .map(Expression::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Selector)
    }
}

// Commas inside an `in (a,b)` value set do not separate requirements.
fn split_requirements(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

impl FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| Expression::Equal(k, v)).collect())
    }
}

impl FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| Expression::Equal(k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Expression> for Selector {
    fn from(value: Expression) -> Self {
        Self(vec![value])
    }
}

/// A single field selector requirement; only equality forms exist.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum FieldExpression {
    /// `field=value`
    Equal(String, String),
    /// `field!=value`
    NotEqual(String, String),
}

/// An ordered list of field selector requirements.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct FieldSelector(pub(crate) Vec<FieldExpression>);

impl FieldSelector {
    /// Create a field selector from a vector of requirements
    pub fn from_expressions(exprs: Vec<FieldExpression>) -> Self {
        Self(exprs)
    }

    /// Whether this selector places no restriction at all
    pub fn selects_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Append further requirements to the selector
    pub fn extend(&mut self, other: FieldSelector) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for FieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpression::Equal(key, value) => write!(f, "{key}={value}"),
            FieldExpression::NotEqual(key, value) => write!(f, "{key}!={value}"),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for expr in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{expr}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for FieldExpression {
    type Err = ParseExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((key, value)) = s.split_once("!=") {
            return Ok(FieldExpression::NotEqual(key.trim().into(), value.trim().into()));
        }
        if let Some((key, value)) = s.split_once('=') {
            return Ok(FieldExpression::Equal(key.trim().into(), value.trim().into()));
        }
        Err(ParseExpressionError(s.into()))
    }
}

impl FromStr for FieldSelector {
    type Err = ParseExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(FieldSelector::default());
        }
        s.split(',')
            .map(FieldExpression::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(FieldSelector)
    }
}

impl From<FieldExpression> for FieldSelector {
    fn from(value: FieldExpression) -> Self {
        Self(vec![value])
    }
}

impl FromIterator<FieldExpression> for FieldSelector {
    fn from_iter<T: IntoIterator<Item = FieldExpression>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_string_rendering() {
        let selector = Selector(vec![
            Expression::In("foo".into(), vec!["bar".into(), "baz".into()]),
            Expression::NotIn("foo".into(), vec!["bar".into(), "baz".into()]),
            Expression::Equal("foo".into(), "bar".into()),
            Expression::NotEqual("foo".into(), "bar".into()),
            Expression::Exists("foo".into()),
        ]);
        assert_eq!(
            selector.to_string(),
            "foo in (bar,baz),foo notin (bar,baz),foo=bar,foo!=bar,foo"
        );
    }

    #[test]
    fn selector_involution() {
        for input in [
            "app=nginx",
            "app!=nginx",
            "env in (prod,staging)",
            "env notin (dev)",
            "release",
            "app=nginx,env in (prod,staging),release",
        ] {
            let parsed: Selector = input.parse().unwrap();
            assert_eq!(parsed.to_string(), input, "involution for {input}");
            let reparsed: Selector = parsed.to_string().parse().unwrap();
            assert_eq!(parsed, reparsed);
        }
    }

    #[test]
    fn in_values_keep_insertion_order() {
        let selector: Selector = "tier in (web,cache,db)".parse().unwrap();
        assert_eq!(
            selector,
            Selector(vec![Expression::In(
                "tier".into(),
                vec!["web".into(), "cache".into(), "db".into()]
            )])
        );
    }

    #[test]
    fn invalid_requirements_rejected() {
        assert!("env in prod".parse::<Selector>().is_err());
        assert!("bad key".parse::<Selector>().is_err());
        assert!("a=b".parse::<FieldSelector>().is_ok());
        assert!("bare".parse::<FieldSelector>().is_err());
    }

    #[test]
    fn selector_matching() {
        let labels: BTreeMap<String, String> = [
            ("app".to_string(), "nginx".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]
        .into();
        assert!(Selector::from_iter([("app", "nginx")]).matches(&labels));
        assert!(Selector::from(Expression::Exists("env".into())).matches(&labels));
        assert!(Selector::from(Expression::In("env".into(), vec!["prod".into()])).matches(&labels));
        assert!(!Selector::from(Expression::NotIn("env".into(), vec!["prod".into()])).matches(&labels));
        assert!(!Selector::from_iter([("app", "apache")]).matches(&labels));
    }

    #[test]
    fn field_selector_rendering() {
        let fs = FieldSelector(vec![
            FieldExpression::Equal("metadata.name".into(), "pod-1".into()),
            FieldExpression::NotEqual("status.phase".into(), "Running".into()),
        ]);
        assert_eq!(fs.to_string(), "metadata.name=pod-1,status.phase!=Running");
        let reparsed: FieldSelector = fs.to_string().parse().unwrap();
        assert_eq!(fs, reparsed);
    }
}
