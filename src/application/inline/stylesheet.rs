//! Syntax-level stylesheet parsing.
//!
//! Rules are kept as raw text: selector strings and declaration values are
//! sliced straight out of the source so functional values (data URIs,
//! `calc()`, font stacks) survive untouched. At-rules are skipped whole.

use cssparser::{
    BasicParseErrorKind, Delimiter, ParseError, ParseErrorKind, Parser, ParserInput, Token,
};
use tracing::debug;

use super::error::InlineError;

/// One `property: value` pair with the value kept as literal CSS text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl Rule {
    /// Selector list joined back into its source form, used for textual
    /// pseudo-element lookups.
    pub fn selector_text(&self) -> String {
        self.selectors.join(",")
    }
}

/// Ordered rule sequence. Source order is the only precedence mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
enum SyntaxError {
    ExpectedBlock,
    ExpectedPropertyName,
    UnbalancedBrace,
    BadString,
    BadUrl,
}

impl SyntaxError {
    fn message(&self) -> &'static str {
        match self {
            SyntaxError::ExpectedBlock => "expected `{` after selector",
            SyntaxError::ExpectedPropertyName => "expected property name",
            SyntaxError::UnbalancedBrace => "unexpected `}`",
            SyntaxError::BadString => "unterminated string",
            SyntaxError::BadUrl => "malformed url()",
        }
    }
}

type SyntaxResult<'i, T> = Result<T, ParseError<'i, SyntaxError>>;

impl Stylesheet {
    /// Parse `css` into rules. Any syntax error aborts the whole parse.
    pub fn parse(css: &str) -> Result<Self, InlineError> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let rules = parse_rule_list(&mut parser).map_err(into_inline_error)?;
        debug!(
            target = "application::inline::stylesheet",
            rules = rules.len(),
            "stylesheet parsed"
        );
        Ok(Self { rules })
    }

    /// Append sheets in argument order; later sheets take precedence.
    pub fn concat(sheets: impl IntoIterator<Item = Stylesheet>) -> Self {
        let rules = sheets.into_iter().flat_map(|sheet| sheet.rules).collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_rule_list<'i>(parser: &mut Parser<'i, '_>) -> SyntaxResult<'i, Vec<Rule>> {
    let mut rules = Vec::new();

    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }

        let state = parser.state();
        match parser.next()? {
            Token::AtKeyword(name) => {
                let name = name.to_string();
                skip_at_rule(parser)?;
                debug!(
                    target = "application::inline::stylesheet",
                    at_rule = %name,
                    "at-rule skipped"
                );
                continue;
            }
            Token::CDO | Token::CDC => continue,
            Token::CloseCurlyBracket => {
                return Err(parser.new_custom_error(SyntaxError::UnbalancedBrace));
            }
            _ => parser.reset(&state),
        }

        if let Some(rule) = parse_qualified_rule(parser)? {
            rules.push(rule);
        }
    }

    Ok(rules)
}

fn skip_at_rule<'i>(parser: &mut Parser<'i, '_>) -> SyntaxResult<'i, ()> {
    loop {
        match parser.next() {
            Ok(Token::Semicolon) | Ok(Token::CurlyBracketBlock) | Err(_) => return Ok(()),
            Ok(Token::BadString(_)) => {
                return Err(parser.new_custom_error(SyntaxError::BadString));
            }
            Ok(_) => {}
        }
    }
}

fn parse_qualified_rule<'i>(parser: &mut Parser<'i, '_>) -> SyntaxResult<'i, Option<Rule>> {
    let selectors = parser.parse_until_before(
        Delimiter::CurlyBracketBlock,
        |prelude| -> SyntaxResult<'i, Vec<String>> {
            prelude.parse_comma_separated(|item| -> SyntaxResult<'i, String> {
                let start = item.position();
                while !item.is_exhausted() {
                    skip_component(item)?;
                }
                Ok(normalize_selector(item.slice_from(start)))
            })
        },
    )?;

    if parser.expect_curly_bracket_block().is_err() {
        return Err(parser.new_custom_error(SyntaxError::ExpectedBlock));
    }

    let declarations = parser.parse_nested_block(parse_declaration_list)?;

    if selectors.iter().all(String::is_empty) {
        return Ok(None);
    }

    Ok(Some(Rule {
        selectors,
        declarations,
    }))
}

fn parse_declaration_list<'i>(block: &mut Parser<'i, '_>) -> SyntaxResult<'i, Vec<Declaration>> {
    let mut declarations = Vec::new();

    loop {
        block.skip_whitespace();
        if block.is_exhausted() {
            break;
        }

        let property = match block.next()? {
            Token::Semicolon => continue,
            Token::Ident(name) => name.to_ascii_lowercase(),
            _ => return Err(block.new_custom_error(SyntaxError::ExpectedPropertyName)),
        };

        block.skip_whitespace();
        block.expect_colon()?;

        let raw = block.parse_until_before(
            Delimiter::Semicolon,
            |value| -> SyntaxResult<'i, String> {
                value.skip_whitespace();
                let start = value.position();
                while !value.is_exhausted() {
                    skip_component(value)?;
                }
                Ok(value.slice_from(start).trim().to_string())
            },
        )?;

        if !block.is_exhausted() {
            // Consume the terminating semicolon.
            let _ = block.next();
        }

        // Custom properties are variable metadata, not renderable declarations.
        if property.starts_with("--") {
            continue;
        }

        let value = strip_important(&raw);
        if value.is_empty() {
            continue;
        }
        declarations.push(Declaration::new(property, value));
    }

    Ok(declarations)
}

/// Consume one component value. Functions and bracketed blocks are walked
/// to their closing token so a later `slice_from` covers them whole.
fn skip_component<'i>(parser: &mut Parser<'i, '_>) -> SyntaxResult<'i, ()> {
    let opens_block = match parser.next_including_whitespace()? {
        Token::BadString(_) => return Err(parser.new_custom_error(SyntaxError::BadString)),
        Token::BadUrl(_) => return Err(parser.new_custom_error(SyntaxError::BadUrl)),
        Token::Function(_)
        | Token::ParenthesisBlock
        | Token::SquareBracketBlock
        | Token::CurlyBracketBlock => true,
        _ => false,
    };
    if opens_block {
        parser.parse_nested_block(|nested| -> SyntaxResult<'i, ()> {
            while !nested.is_exhausted() {
                skip_component(nested)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn strip_important(value: &str) -> String {
    let trimmed = value.trim_end();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(index) = lower.rfind("!important")
        && lower[index + "!important".len()..].trim().is_empty()
    {
        return trimmed[..index].trim_end().to_string();
    }
    trimmed.to_string()
}

fn normalize_selector(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn into_inline_error(error: ParseError<'_, SyntaxError>) -> InlineError {
    let message = match &error.kind {
        ParseErrorKind::Custom(kind) => kind.message().to_string(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected token {token:?}")
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            "unexpected end of input".to_string()
        }
        ParseErrorKind::Basic(other) => format!("{other:?}"),
    };
    InlineError::stylesheet(error.location.line + 1, error.location.column, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selector_lists_and_declarations_in_order() {
        let sheet = Stylesheet::parse("h1, h2 > span { color: red; margin: 0 auto }").expect("parse");
        assert_eq!(sheet.len(), 1);
        let rule = &sheet.rules()[0];
        assert_eq!(rule.selectors, vec!["h1", "h2 > span"]);
        assert_eq!(
            rule.declarations,
            vec![
                Declaration::new("color", "red"),
                Declaration::new("margin", "0 auto"),
            ]
        );
        assert_eq!(rule.selector_text(), "h1,h2 > span");
    }

    #[test]
    fn data_uri_values_survive_verbatim() {
        let css = r#"blockquote::before { background-image: url("data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg'></svg>"); }"#;
        let sheet = Stylesheet::parse(css).expect("parse");
        let decl = &sheet.rules()[0].declarations[0];
        assert_eq!(decl.property, "background-image");
        assert!(decl.value.starts_with("url(\"data:image/svg+xml;utf8,<svg"));
        assert!(decl.value.ends_with("</svg>\")"));
    }

    #[test]
    fn trailing_functions_are_kept_whole() {
        let css = "p { color: rgb(1, 2, 3); border-color: var(--missing); background: url(x.png) }\n\
                   blockquote::before { background-image: url(\"data:image/png;base64,AAAA\") }";
        let sheet = Stylesheet::parse(css).expect("parse");
        assert_eq!(
            sheet.rules()[0].declarations,
            vec![
                Declaration::new("color", "rgb(1, 2, 3)"),
                Declaration::new("border-color", "var(--missing)"),
                Declaration::new("background", "url(x.png)"),
            ]
        );
        assert_eq!(
            sheet.rules()[1].declarations[0].value,
            "url(\"data:image/png;base64,AAAA\")"
        );
    }

    #[test]
    fn functional_pseudo_classes_stay_in_the_selector() {
        let sheet = Stylesheet::parse("p:not(.x), li:nth-child(2n+1) { color: red }\nh1 { color: blue }")
            .expect("parse");
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rules()[0].selectors, vec!["p:not(.x)", "li:nth-child(2n+1)"]);
    }

    #[test]
    fn nested_bad_string_is_still_an_error() {
        assert!(Stylesheet::parse("p { font-family: local(\"Inter\n) }").is_err());
    }

    #[test]
    fn unquoted_url_with_quotes_is_malformed() {
        let css = "h1::before { background-image: url(data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg'></svg>); }";
        match Stylesheet::parse(css).expect_err("bad url") {
            InlineError::Stylesheet { line, message, .. } => {
                assert_eq!(line, 1);
                assert_eq!(message, "malformed url()");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn custom_properties_and_at_rules_are_not_rules() {
        let css = "@import url(x.css);\n@media (max-width: 10px) { p { color: blue; } }\n#wenyan { --x: 1px; color: #333; }";
        let sheet = Stylesheet::parse(css).expect("parse");
        assert_eq!(sheet.len(), 1);
        assert_eq!(
            sheet.rules()[0].declarations,
            vec![Declaration::new("color", "#333")]
        );
    }

    #[test]
    fn important_flag_is_dropped_from_value() {
        let sheet = Stylesheet::parse("p { color: red !important; }").expect("parse");
        assert_eq!(sheet.rules()[0].declarations[0].value, "red");
    }

    #[test]
    fn comments_are_ignored() {
        let sheet = Stylesheet::parse("/* theme */ p { /* x */ color: red; }").expect("parse");
        assert_eq!(sheet.rules()[0].declarations[0], Declaration::new("color", "red"));
    }

    #[test]
    fn malformed_css_reports_position() {
        let err = Stylesheet::parse("p { color: red; }\nh1 { : blue; }").expect_err("must fail");
        match err {
            InlineError::Stylesheet { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn stray_closing_brace_is_an_error() {
        assert!(Stylesheet::parse("p { color: red; } }").is_err());
    }

    #[test]
    fn concat_preserves_argument_order() {
        let first = Stylesheet::parse("pre { font-size: 14px; }").expect("first");
        let second = Stylesheet::parse("pre { font-size: 12px; }").expect("second");
        let merged = Stylesheet::concat([first, second]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rules()[1].declarations[0].value, "12px");
    }
}
