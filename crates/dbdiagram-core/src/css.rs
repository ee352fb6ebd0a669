//! CSS declaration parsing.
//!
//! Diagram fonts are configured by the host through CSS custom properties
//! (`--dbdg-table-title-font-family: "Fira Sans"`), either in an inline
//! `style` attribute on the root element or in a `:root { ... }` rule of a
//! `<style>` sheet. This module parses both forms into a [`StyleDeclaration`].
//!
//! Only what the measurement service needs is supported: declaration lists,
//! comments, quoted values, and top-level rules. At-rules are skipped
//! wholesale.
//!
//! # Example
//!
//! ```
//! # use dbdiagram_core::css::parse_declarations;
//! let style = parse_declarations("--title-font: 'Fira Sans'; font-size: 12px").unwrap();
//! assert_eq!(style.property_value("--title-font"), "'Fira Sans'");
//! assert_eq!(style.property_value("font-size"), "12px");
//! assert_eq!(style.property_value("missing"), "");
//! ```

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use winnow::{
    Parser as _,
    ascii::multispace1,
    combinator::{alt, delimited, opt, repeat},
    error::{ContextError, ErrMode},
    token::{take_till, take_until, take_while},
};

type IResult<O> = std::result::Result<O, ErrMode<ContextError>>;

/// Errors produced while parsing CSS text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssError {
    #[error("invalid CSS at offset {offset}: {message}")]
    Syntax { offset: usize, message: &'static str },
}

impl CssError {
    /// Byte offset into the parsed text where the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            Self::Syntax { offset, .. } => *offset,
        }
    }
}

/// An ordered set of CSS property declarations.
///
/// Reading a property that is not declared yields an empty string, the same
/// contract as `CSSStyleDeclaration.getPropertyValue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    properties: IndexMap<String, String>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trimmed value of `name`, or `""` when not declared.
    pub fn property_value(&self, name: &str) -> &str {
        self.properties
            .get(&normalize_name(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Sets `name` to `value`, replacing any previous declaration.
    pub fn set_property(&mut self, name: &str, value: &str) {
        self.properties
            .insert(normalize_name(name), value.trim().to_string());
    }

    /// Removes `name`, returning its previous value.
    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.properties.shift_remove(&normalize_name(name))
    }

    /// Copies every declaration of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &StyleDeclaration) {
        for (name, value) in &other.properties {
            self.properties.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Display for StyleDeclaration {
    /// Serializes the declarations in the form used by a `style` attribute.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.properties.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}: {value};")?;
        }
        Ok(())
    }
}

/// Custom properties are case-sensitive; standard properties are not.
fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Removes one pair of matching surrounding quotes from a CSS value.
///
/// ```
/// # use dbdiagram_core::css::strip_quotes;
/// assert_eq!(strip_quotes("\"bold\""), "bold");
/// assert_eq!(strip_quotes("'italic'"), "italic");
/// assert_eq!(strip_quotes("normal"), "normal");
/// ```
pub fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Parses a declaration list such as the content of a `style` attribute.
///
/// # Errors
///
/// Returns [`CssError::Syntax`] when a declaration has no property name or no
/// colon, or when a quoted value is not terminated.
pub fn parse_declarations(source: &str) -> Result<StyleDeclaration, CssError> {
    let mut input = source;
    let declarations = declaration_list(&mut input)
        .map_err(|_| syntax_error(source, input, "malformed declaration"))?;
    if !input.is_empty() {
        return Err(syntax_error(source, input, "unexpected character"));
    }
    Ok(declarations)
}

/// Collects the declarations that apply to the document root element.
///
/// Every rule whose selector list names `:root`, `html` or `svg` contributes,
/// in source order, so later rules override earlier ones.
///
/// # Errors
///
/// Returns [`CssError::Syntax`] for unbalanced braces or malformed
/// declarations inside a root rule.
pub fn parse_root_declarations(stylesheet: &str) -> Result<StyleDeclaration, CssError> {
    let mut input = stylesheet;
    let mut root = StyleDeclaration::new();

    loop {
        trivia(&mut input).map_err(|_| syntax_error(stylesheet, input, "unterminated comment"))?;
        if input.is_empty() {
            break;
        }

        let selector: IResult<&str> = take_till(1.., |c: char| c == '{').parse_next(&mut input);
        let selector = selector
            .map_err(|_| syntax_error(stylesheet, input, "expected selector"))?
            .trim();

        if selector.starts_with('@') {
            skip_block(stylesheet, &mut input)?;
            continue;
        }

        let block: IResult<StyleDeclaration> =
            delimited('{', declaration_list, '}').parse_next(&mut input);
        let block = block.map_err(|_| syntax_error(stylesheet, input, "malformed rule block"))?;

        if selector.split(',').any(|part| is_root_selector(part.trim())) {
            root.merge(&block);
        }
    }

    Ok(root)
}

fn is_root_selector(selector: &str) -> bool {
    matches!(selector, ":root" | "html" | "svg")
}

fn syntax_error(source: &str, rest: &str, message: &'static str) -> CssError {
    CssError::Syntax {
        offset: source.len() - rest.len(),
        message,
    }
}

/// Skips a `{ ... }` block including nested blocks, as used by at-rules.
fn skip_block(source: &str, input: &mut &str) -> Result<(), CssError> {
    let mut depth = 0usize;
    for (index, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    *input = &input[index + 1..];
                    return Ok(());
                }
            }
            _ => {}
        }
    }
    Err(syntax_error(source, input, "unbalanced braces"))
}

// =============================================================================
// Parsers
// =============================================================================

fn comment<'s>(input: &mut &'s str) -> IResult<&'s str> {
    delimited("/*", take_until(0.., "*/"), "*/").parse_next(input)
}

/// Whitespace and comments.
fn trivia(input: &mut &str) -> IResult<()> {
    repeat(0.., alt((multispace1.void(), comment.void()))).parse_next(input)
}

fn property_name<'s>(input: &mut &'s str) -> IResult<&'s str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> IResult<&'s str> {
    alt((
        delimited('"', take_till(0.., |c: char| c == '"'), '"').take(),
        delimited('\'', take_till(0.., |c: char| c == '\''), '\'').take(),
    ))
    .parse_next(input)
}

fn value_chunk<'s>(input: &mut &'s str) -> IResult<&'s str> {
    alt((
        quoted,
        take_till(1.., |c: char| matches!(c, ';' | '}' | '"' | '\'')),
    ))
    .parse_next(input)
}

fn value(input: &mut &str) -> IResult<String> {
    repeat(0.., value_chunk)
        .fold(String::new, |mut acc, chunk| {
            acc.push_str(chunk);
            acc
        })
        .map(|raw| raw.trim().to_string())
        .parse_next(input)
}

fn declaration(input: &mut &str) -> IResult<(String, String)> {
    let name = property_name.parse_next(input)?;
    trivia.parse_next(input)?;
    ':'.parse_next(input)?;
    let value = value.parse_next(input)?;
    Ok((name.to_string(), value))
}

/// Declarations separated by `;`, stopping before `}` or end of input.
fn declaration_list(input: &mut &str) -> IResult<StyleDeclaration> {
    let mut declarations = StyleDeclaration::new();
    loop {
        trivia.parse_next(input)?;
        if opt(';').parse_next(input)?.is_some() {
            continue;
        }
        if input.is_empty() || input.starts_with('}') {
            break;
        }

        let (name, value) = declaration.parse_next(input)?;
        declarations.set_property(&name, &value);

        trivia.parse_next(input)?;
        if opt(';').parse_next(input)?.is_none() {
            break;
        }
    }
    Ok(declarations)
}
