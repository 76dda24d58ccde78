//! Match/replace rules for rewriting replayed responses.

use crate::model::NormalizedRequest;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// A rule value as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleValue {
    Literal { value: String },
    Regex { pattern: String },
    Variable { name: String },
}

impl RuleValue {
    pub fn literal(value: &str) -> Self {
        RuleValue::Literal {
            value: value.to_string(),
        }
    }

    pub fn regex(pattern: &str) -> Self {
        RuleValue::Regex {
            pattern: pattern.to_string(),
        }
    }

    pub fn variable(name: &str) -> Self {
        RuleValue::Variable {
            name: name.to_string(),
        }
    }

    /// Check the value without keeping the compiled form.
    pub fn validate_as_match(&self) -> anyhow::Result<()> {
        CompiledMatch::compile(self).map(|_| ())
    }

    pub fn validate_as_replacement(&self) -> anyhow::Result<()> {
        CompiledReplacement::compile(self).map(|_| ())
    }
}

/// Live-request attribute a variable rule resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVariable {
    Url,
    Method,
    Scheme,
    Host,
    Port,
    Path,
    Query,
}

impl RequestVariable {
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        Ok(match name.trim() {
            "request.url" => RequestVariable::Url,
            "request.method" => RequestVariable::Method,
            "request.scheme" => RequestVariable::Scheme,
            "request.host" => RequestVariable::Host,
            "request.port" => RequestVariable::Port,
            "request.path" => RequestVariable::Path,
            "request.query" => RequestVariable::Query,
            other => anyhow::bail!(
                "Unknown variable '{other}'. Supported: request.url, request.method, \
                 request.scheme, request.host, request.port, request.path, request.query"
            ),
        })
    }

    /// Value for `request`; absent parts resolve to an empty string.
    pub fn resolve(&self, request: &NormalizedRequest) -> String {
        let url = &request.url;
        match self {
            RequestVariable::Url => url.to_string(),
            RequestVariable::Method => request.method.to_string(),
            RequestVariable::Scheme => url.scheme.clone().unwrap_or_default(),
            RequestVariable::Host => url.host.clone(),
            RequestVariable::Port => url.port.map(|p| p.to_string()).unwrap_or_default(),
            RequestVariable::Path => url.path.clone(),
            RequestVariable::Query => url.query.clone().unwrap_or_default(),
        }
    }
}

/// A rule compiled for matching.
#[derive(Debug, Clone)]
pub enum CompiledMatch {
    Literal(String),
    Regex(Arc<Regex>),
    Variable(RequestVariable),
}

impl CompiledMatch {
    pub fn compile(rule: &RuleValue) -> anyhow::Result<Self> {
        Ok(match rule {
            RuleValue::Literal { value } => {
                if value.is_empty() {
                    anyhow::bail!("Literal match value must not be empty");
                }
                CompiledMatch::Literal(value.clone())
            }
            RuleValue::Regex { pattern } => match Regex::new(pattern) {
                Ok(regex) => CompiledMatch::Regex(Arc::new(regex)),
                Err(e) => anyhow::bail!("Invalid regex pattern '{pattern}': {e}"),
            },
            RuleValue::Variable { name } => CompiledMatch::Variable(RequestVariable::parse(name)?),
        })
    }

    /// Whether `input` contains a match.
    pub fn is_match(&self, input: &str, request: &NormalizedRequest) -> bool {
        match self {
            CompiledMatch::Literal(value) => input.contains(value.as_str()),
            CompiledMatch::Regex(regex) => regex.is_match(input),
            CompiledMatch::Variable(variable) => {
                let value = variable.resolve(request);
                !value.is_empty() && input.contains(&value)
            }
        }
    }

    /// Whether the whole of `input` matches, ignoring ASCII case for
    /// literal and variable rules. Used for header names.
    pub fn matches_name(&self, input: &str, request: &NormalizedRequest) -> bool {
        match self {
            CompiledMatch::Literal(value) => value.eq_ignore_ascii_case(input),
            CompiledMatch::Regex(regex) => regex.is_match(input),
            CompiledMatch::Variable(variable) => variable.resolve(request).eq_ignore_ascii_case(input),
        }
    }

    /// Replace every match in `input` with `replacement`, taken literally.
    pub fn replace_all<'a>(&self, input: &'a str, replacement: &str, request: &NormalizedRequest) -> Cow<'a, str> {
        match self {
            CompiledMatch::Literal(value) => replace_literal(input, value, replacement),
            CompiledMatch::Regex(regex) => regex.replace_all(input, NoExpand(replacement)),
            CompiledMatch::Variable(variable) => {
                replace_literal(input, &variable.resolve(request), replacement)
            }
        }
    }
}

fn replace_literal<'a>(input: &'a str, needle: &str, replacement: &str) -> Cow<'a, str> {
    if needle.is_empty() || !input.contains(needle) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.replace(needle, replacement))
    }
}

/// A rule compiled for producing replacement text.
#[derive(Debug, Clone)]
pub enum CompiledReplacement {
    Literal(String),
    Variable(RequestVariable),
}

impl CompiledReplacement {
    pub fn compile(rule: &RuleValue) -> anyhow::Result<Self> {
        Ok(match rule {
            RuleValue::Literal { value } => CompiledReplacement::Literal(value.clone()),
            RuleValue::Regex { pattern } => {
                anyhow::bail!("Regex '{pattern}' cannot be used as a replacement value")
            }
            RuleValue::Variable { name } => {
                CompiledReplacement::Variable(RequestVariable::parse(name)?)
            }
        })
    }

    pub fn resolve<'a>(&'a self, request: &NormalizedRequest) -> Cow<'a, str> {
        match self {
            CompiledReplacement::Literal(value) => Cow::Borrowed(value),
            CompiledReplacement::Variable(variable) => Cow::Owned(variable.resolve(request)),
        }
    }
}

/// Body rewrite: every occurrence of `match` becomes `replace`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Replacement {
    #[serde(rename = "match")]
    pub match_rule: RuleValue,
    pub replace: RuleValue,
}

impl Replacement {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.match_rule.validate_as_match()?;
        self.replace.validate_as_replacement()
    }
}

/// Header rewrite.
///
/// A header is selected when it satisfies every match given. Its name is
/// replaced wholesale by `nameReplace`. With `valueMatch`, `valueReplace`
/// substitutes the matched text; without it, the whole value. A transform
/// with no replacement removes the selected headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeaderTransform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_match: Option<RuleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_match: Option<RuleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_replace: Option<RuleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_replace: Option<RuleValue>,
}

impl ResponseHeaderTransform {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name_match.is_none() && self.value_match.is_none() {
            anyhow::bail!("Response header transform needs 'nameMatch' or 'valueMatch'");
        }
        for rule in [&self.name_match, &self.value_match].into_iter().flatten() {
            rule.validate_as_match()?;
        }
        for rule in [&self.name_replace, &self.value_replace].into_iter().flatten() {
            rule.validate_as_replacement()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CompiledBodyRule {
    pattern: CompiledMatch,
    replacement: CompiledReplacement,
}

#[derive(Debug, Clone)]
struct CompiledHeaderRule {
    name_match: Option<CompiledMatch>,
    value_match: Option<CompiledMatch>,
    name_replace: Option<CompiledReplacement>,
    value_replace: Option<CompiledReplacement>,
}

impl CompiledHeaderRule {
    fn selects(&self, name: &str, value: &str, request: &NormalizedRequest) -> bool {
        self.name_match
            .as_ref()
            .is_none_or(|m| m.matches_name(name, request))
            && self
                .value_match
                .as_ref()
                .is_none_or(|m| m.is_match(value, request))
    }

    fn apply(&self, name: String, value: String, request: &NormalizedRequest) -> Option<(String, String)> {
        if self.name_replace.is_none() && self.value_replace.is_none() {
            return None;
        }
        let name = match &self.name_replace {
            Some(replace) => replace.resolve(request).into_owned(),
            None => name,
        };
        let value = match (&self.value_match, &self.value_replace) {
            (Some(pattern), Some(replace)) => pattern
                .replace_all(&value, &replace.resolve(request), request)
                .into_owned(),
            (None, Some(replace)) => replace.resolve(request).into_owned(),
            (_, None) => value,
        };
        Some((name, value))
    }
}

/// Replacement and header rules, compiled once and applied per response.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    body: Vec<CompiledBodyRule>,
    headers: Vec<CompiledHeaderRule>,
}

impl CompiledRules {
    pub fn compile(
        replacements: &[Replacement],
        header_transforms: &[ResponseHeaderTransform],
    ) -> anyhow::Result<Self> {
        let body = replacements
            .iter()
            .map(|r| {
                Ok(CompiledBodyRule {
                    pattern: CompiledMatch::compile(&r.match_rule)?,
                    replacement: CompiledReplacement::compile(&r.replace)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let headers = header_transforms
            .iter()
            .map(|t| {
                t.validate()?;
                Ok(CompiledHeaderRule {
                    name_match: t.name_match.as_ref().map(CompiledMatch::compile).transpose()?,
                    value_match: t.value_match.as_ref().map(CompiledMatch::compile).transpose()?,
                    name_replace: t
                        .name_replace
                        .as_ref()
                        .map(CompiledReplacement::compile)
                        .transpose()?,
                    value_replace: t
                        .value_replace
                        .as_ref()
                        .map(CompiledReplacement::compile)
                        .transpose()?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { body, headers })
    }

    pub fn has_body_rules(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn has_header_rules(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Apply every body rule in order.
    pub fn rewrite_body<'a>(&self, text: &'a str, request: &NormalizedRequest) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);
        for rule in &self.body {
            let replacement = rule.replacement.resolve(request);
            let rewritten = match rule.pattern.replace_all(&current, &replacement, request) {
                Cow::Owned(rewritten) => Some(rewritten),
                Cow::Borrowed(_) => None,
            };
            if let Some(rewritten) = rewritten {
                current = Cow::Owned(rewritten);
            }
        }
        current
    }

    /// Apply every header rule in order; a header dropped by one rule is
    /// not seen by later ones.
    pub fn rewrite_headers<I>(&self, headers: I, request: &NormalizedRequest) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut current: Vec<(String, String)> = headers.into_iter().collect();
        for rule in &self.headers {
            current = current
                .into_iter()
                .filter_map(|(name, value)| {
                    if rule.selects(&name, &value, request) {
                        rule.apply(name, value, request)
                    } else {
                        Some((name, value))
                    }
                })
                .collect();
        }
        current
    }
}
