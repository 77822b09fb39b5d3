//! YAML Path parsing.
//!
//! A compact parser covering the addressing forms merge rules and merge
//! targets need: keys, key globs, indexes, wildcards, anchors, attribute
//! searches and keyword searches. Both notations are accepted:
//!
//! - forward-slash: `/hash/list[0]/id`
//! - dot: `hash.list[0].id`

use crate::error::PathError;
use crate::keywords::PathSearchKeyword;
use crate::tree::Node;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathSeparator {
    /// Inferred from the path: a leading `/` selects forward-slash notation
    #[default]
    Auto,
    Dot,
    ForwardSlash,
}

impl PathSeparator {
    pub fn infer(path: &str) -> Self {
        if path.starts_with('/') {
            PathSeparator::ForwardSlash
        } else {
            PathSeparator::Dot
        }
    }

    pub fn as_char(self) -> char {
        match self {
            PathSeparator::ForwardSlash => '/',
            PathSeparator::Auto | PathSeparator::Dot => '.',
        }
    }
}

/// Comparison performed by an attribute search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Equals,
    StartsWith,
    EndsWith,
    Contains,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Regex,
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            SearchMethod::Equals => "=",
            SearchMethod::StartsWith => "^",
            SearchMethod::EndsWith => "$",
            SearchMethod::Contains => "%",
            SearchMethod::LessThan => "<",
            SearchMethod::GreaterThan => ">",
            SearchMethod::LessThanOrEqual => "<=",
            SearchMethod::GreaterThanOrEqual => ">=",
            SearchMethod::Regex => "=~",
        };
        write!(f, "{}", op)
    }
}

/// An `[attribute OP term]` search.
///
/// An attribute of `.` compares the key name of Hash children or the value of
/// scalar Array elements; any other attribute compares that field of a Hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub inverted: bool,
    pub method: SearchMethod,
    pub attribute: String,
    pub term: String,
}

impl SearchTerms {
    /// Tests a scalar against this search, ignoring inversion.
    ///
    /// Collections and aliases never match.
    pub fn matches_value(&self, value: &Node) -> bool {
        let Some(text) = value.scalar_text() else {
            return false;
        };
        self.matches_text(&text, value.as_f64())
    }

    /// Tests text (a key name or scalar rendering) against this search.
    pub fn matches_text(&self, text: &str, number: Option<f64>) -> bool {
        let term_number = self.term.trim().parse::<f64>().ok();
        match self.method {
            SearchMethod::Equals => match (number, term_number) {
                (Some(a), Some(b)) => a == b,
                _ => text == self.term,
            },
            SearchMethod::StartsWith => text.starts_with(&self.term),
            SearchMethod::EndsWith => text.ends_with(&self.term),
            SearchMethod::Contains => text.contains(&self.term),
            SearchMethod::LessThan
            | SearchMethod::GreaterThan
            | SearchMethod::LessThanOrEqual
            | SearchMethod::GreaterThanOrEqual => {
                let ordering = match (number.or_else(|| text.trim().parse().ok()), term_number) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => Some(text.cmp(self.term.as_str())),
                };
                let Some(ordering) = ordering else {
                    return false;
                };
                match self.method {
                    SearchMethod::LessThan => ordering.is_lt(),
                    SearchMethod::GreaterThan => ordering.is_gt(),
                    SearchMethod::LessThanOrEqual => ordering.is_le(),
                    _ => ordering.is_ge(),
                }
            }
            // The pattern was validated when the path was parsed.
            SearchMethod::Regex => Regex::new(&self.term)
                .map(|re| re.is_match(text))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for SearchTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}{}{}{}]",
            self.attribute,
            if self.inverted { "!" } else { "" },
            self.method,
            self.term
        )
    }
}

/// A `[keyword(parameters)]` search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTerms {
    pub inverted: bool,
    pub keyword: PathSearchKeyword,
    pub parameters: Vec<String>,
}

impl fmt::Display for KeywordTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}{}({})]",
            if self.inverted { "!" } else { "" },
            self.keyword,
            self.parameters.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Exact Hash key
    Key(String),
    /// Hash key pattern; `pattern` is an anchored regular expression
    KeyGlob { glob: String, pattern: String },
    /// Array index; negative values count from the end
    Index(i64),
    /// Children that are aliases of the named anchor
    Anchor(String),
    /// `*`: every immediate child
    Wildcard,
    /// `**`: the node and all of its descendants
    Traverse,
    Search(SearchTerms),
    Keyword(KeywordTerms),
}

/// A parsed YAML Path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlPath {
    original: String,
    separator: PathSeparator,
    segments: Vec<PathSegment>,
}

impl YamlPath {
    /// The document root, `/`.
    pub fn root() -> Self {
        Self {
            original: "/".to_string(),
            separator: PathSeparator::ForwardSlash,
            segments: Vec::new(),
        }
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        Self::parse_with(path, PathSeparator::Auto)
    }

    pub fn parse_with(path: &str, separator: PathSeparator) -> Result<Self, PathError> {
        let separator = match separator {
            PathSeparator::Auto => PathSeparator::infer(path),
            explicit => explicit,
        };
        let segments = Parser::new(path, separator.as_char()).parse()?;
        Ok(Self {
            original: path.to_string(),
            separator,
            segments,
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn separator(&self) -> PathSeparator {
        self.separator
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl Default for YamlPath {
    fn default() -> Self {
        Self::root()
    }
}

impl FromStr for YamlPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for YamlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.original)
        }
    }
}

/// Escapes the characters of a Hash key that would otherwise be read as path
/// syntax under the given separator.
pub fn escape_key(key: &str, separator: char) -> String {
    let mut escaped = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        let special = c == '\\'
            || c == separator
            || c == '['
            || c == ']'
            || c == '*'
            || (i == 0 && c == '&');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One character of a plain segment and whether it was escaped.
type Marked = (char, bool);

struct Parser<'a> {
    path: &'a str,
    chars: Vec<char>,
    pos: usize,
    separator: char,
}

impl<'a> Parser<'a> {
    fn new(path: &'a str, separator: char) -> Self {
        Self {
            path,
            chars: path.chars().collect(),
            pos: 0,
            separator,
        }
    }

    fn error(&self, reason: impl Into<String>) -> PathError {
        PathError::malformed(self.path, reason)
    }

    fn parse(mut self) -> Result<Vec<PathSegment>, PathError> {
        let mut segments = Vec::new();
        let mut plain: Vec<Marked> = Vec::new();

        if self.separator == '/' && self.chars.first() == Some(&'/') {
            self.pos = 1;
        }

        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            match c {
                '\\' => {
                    let Some(&next) = self.chars.get(self.pos + 1) else {
                        return Err(self.error("trailing escape character"));
                    };
                    plain.push((next, true));
                    self.pos += 2;
                }
                '[' => {
                    self.flush(&mut plain, &mut segments)?;
                    let content = self.bracket_content()?;
                    segments.push(self.bracket_segment(&content)?);
                }
                ']' => return Err(self.error("unmatched ]")),
                '~' => return Err(self.error("Unexpected use of ~ operator")),
                c if c == self.separator => {
                    self.flush(&mut plain, &mut segments)?;
                    self.pos += 1;
                }
                c => {
                    plain.push((c, false));
                    self.pos += 1;
                }
            }
        }
        self.flush(&mut plain, &mut segments)?;
        Ok(segments)
    }

    fn flush(
        &self,
        plain: &mut Vec<Marked>,
        segments: &mut Vec<PathSegment>,
    ) -> Result<(), PathError> {
        if plain.is_empty() {
            return Ok(());
        }
        let chars = std::mem::take(plain);
        let text: String = chars.iter().map(|(c, _)| *c).collect();
        let unescaped = |c: char| chars.iter().any(|&(x, escaped)| x == c && !escaped);

        let segment = if chars.iter().all(|&(c, escaped)| c == '*' && !escaped) {
            match chars.len() {
                1 => PathSegment::Wildcard,
                2 => PathSegment::Traverse,
                _ => return Err(self.error(format!("invalid wildcard segment, {}", text))),
            }
        } else if chars[0] == ('&', false) {
            let name: String = text.chars().skip(1).collect();
            if name.is_empty() {
                return Err(self.error("empty anchor name"));
            }
            PathSegment::Anchor(name)
        } else if unescaped('*') {
            let mut pattern = String::from("^");
            for &(c, escaped) in &chars {
                if c == '*' && !escaped {
                    pattern.push_str(".*");
                } else {
                    pattern.push_str(&regex::escape(&c.to_string()));
                }
            }
            pattern.push('$');
            PathSegment::KeyGlob {
                glob: text,
                pattern,
            }
        } else {
            PathSegment::Key(text)
        };
        segments.push(segment);
        Ok(())
    }

    /// Consumes `[...]` starting at the opening bracket and returns its inner
    /// text with escapes preserved.
    fn bracket_content(&mut self) -> Result<String, PathError> {
        let mut content = String::new();
        let mut quote: Option<char> = None;
        self.pos += 1;
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            self.pos += 1;
            match (c, quote) {
                ('\\', _) => {
                    let Some(&next) = self.chars.get(self.pos) else {
                        return Err(self.error("trailing escape character"));
                    };
                    content.push('\\');
                    content.push(next);
                    self.pos += 1;
                }
                ('"' | '\'', None) => {
                    quote = Some(c);
                    content.push(c);
                }
                (q, Some(open)) if q == open => {
                    quote = None;
                    content.push(c);
                }
                (']', None) => return Ok(content),
                _ => content.push(c),
            }
        }
        Err(self.error("unterminated ["))
    }

    fn bracket_segment(&self, content: &str) -> Result<PathSegment, PathError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(self.error("empty []"));
        }

        if let Ok(index) = trimmed.parse::<i64>() {
            return Ok(PathSegment::Index(index));
        }

        if let Some(terms) = self.keyword_terms(trimmed)? {
            return Ok(PathSegment::Keyword(terms));
        }

        self.search_terms(trimmed).map(PathSegment::Search)
    }

    fn keyword_terms(&self, content: &str) -> Result<Option<KeywordTerms>, PathError> {
        let (inverted, body) = match content.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, content),
        };
        let Some(open) = body.find('(') else {
            return Ok(None);
        };
        let name = body[..open].trim();
        if !body.ends_with(')')
            || name.is_empty()
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Ok(None);
        }

        let keyword = name
            .parse::<PathSearchKeyword>()
            .map_err(|_| PathError::UnknownKeyword {
                keyword: name.to_string(),
                path: self.path.to_string(),
            })?;

        let inner = &body[open + 1..body.len() - 1];
        let parameters = split_parameters(inner);
        Ok(Some(KeywordTerms {
            inverted,
            keyword,
            parameters,
        }))
    }

    fn search_terms(&self, content: &str) -> Result<SearchTerms, PathError> {
        let chars: Vec<char> = content.chars().collect();
        let mut attribute = String::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\\' if i + 1 < chars.len() => {
                    attribute.push(chars[i + 1]);
                    i += 2;
                }
                '=' | '^' | '$' | '%' | '<' | '>' | '!' | '~' => break,
                c => {
                    attribute.push(c);
                    i += 1;
                }
            }
        }

        let attribute = unquote(attribute.trim()).to_string();
        if attribute.is_empty() {
            return Err(self.error(format!("search [{}] has no attribute", content)));
        }

        let mut inverted = false;
        if chars.get(i) == Some(&'!') {
            inverted = true;
            i += 1;
        }

        let (method, width) = match (chars.get(i), chars.get(i + 1)) {
            (Some('='), Some('~')) => (SearchMethod::Regex, 2),
            (Some('<'), Some('=')) => (SearchMethod::LessThanOrEqual, 2),
            (Some('>'), Some('=')) => (SearchMethod::GreaterThanOrEqual, 2),
            (Some('='), _) => (SearchMethod::Equals, 1),
            (Some('^'), _) => (SearchMethod::StartsWith, 1),
            (Some('$'), _) => (SearchMethod::EndsWith, 1),
            (Some('%'), _) => (SearchMethod::Contains, 1),
            (Some('<'), _) => (SearchMethod::LessThan, 1),
            (Some('>'), _) => (SearchMethod::GreaterThan, 1),
            (Some('~'), _) => return Err(self.error("Unexpected use of ~ operator")),
            _ => return Err(self.error(format!("search [{}] has no operator", content))),
        };
        i += width;

        let raw: String = chars[i..].iter().collect();
        let raw = raw.trim();
        let mut term = unquote(&unescape(raw)).to_string();

        if method == SearchMethod::Regex {
            // Regular expressions keep their own backslash escapes.
            term = strip_regex_delimiters(unquote(raw)).to_string();
            if let Err(e) = Regex::new(&term) {
                return Err(PathError::Regex {
                    path: self.path.to_string(),
                    pattern: term,
                    reason: e.to_string(),
                });
            }
        }

        Ok(SearchTerms {
            inverted,
            method,
            attribute,
            term,
        })
    }
}

fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// `/pattern/` or `!pattern!` style delimiters around a regular expression.
fn strip_regex_delimiters(term: &str) -> &str {
    let mut chars = term.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last))
            if first == last && !first.is_alphanumeric() && term.len() >= 2 =>
        {
            &term[first.len_utf8()..term.len() - last.len_utf8()]
        }
        _ => term,
    }
}

fn split_parameters(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut parameters = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match (c, quote) {
            ('\\', _) => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ('"' | '\'', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            (',', None) => parameters.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    parameters.push(current.trim().to_string());
    parameters
}
