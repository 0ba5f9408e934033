//! Selector parsing and matching over the arena tree.
//!
//! Selectors are flat data: a list of compound selectors joined by
//! combinators, each compound a list of simple selectors. Matching is a pure
//! function of the selector and the document.

use cssparser::{ParseError, Parser, ParserInput, Token, parse_nth};

use super::dom::{Document, ElementData, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOperator, String)>,
    },
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild { a: i32, b: i32 },
    NthLastChild { a: i32, b: i32 },
    Not(Compound),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound(Vec<SimpleSelector>);

/// A complex selector: `compounds[i]` and `compounds[i + 1]` are joined by
/// `combinators[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

type SelectorResult<'i, T> = Result<T, ParseError<'i, ()>>;

impl Selector {
    /// Parse one complex selector. Returns `None` for anything outside the
    /// supported grammar, pseudo-elements included.
    pub fn parse(text: &str) -> Option<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parse_complex(&mut parser).ok()
    }

    pub fn matches(&self, doc: &Document, element: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            len => self.matches_from(doc, Position::Element(element), len - 1),
        }
    }

    fn matches_from(&self, doc: &Document, position: Position, index: usize) -> bool {
        let compound = &self.compounds[index];
        let matched = match position {
            Position::Element(element) => compound.matches(doc, element),
            Position::Implicit(level) => compound.matches_implicit(IMPLICIT_ANCESTORS[level]),
        };
        if !matched {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => position
                .parent(doc)
                .is_some_and(|parent| self.matches_from(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = position.parent(doc);
                while let Some(ancestor) = current {
                    if self.matches_from(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = ancestor.parent(doc);
                }
                false
            }
            Combinator::NextSibling => match position {
                Position::Element(element) => doc
                    .previous_element_siblings(element)
                    .next()
                    .is_some_and(|sibling| {
                        self.matches_from(doc, Position::Element(sibling), index - 1)
                    }),
                Position::Implicit(_) => false,
            },
            Combinator::SubsequentSibling => match position {
                Position::Element(element) => {
                    doc.previous_element_siblings(element).any(|sibling| {
                        self.matches_from(doc, Position::Element(sibling), index - 1)
                    })
                }
                Position::Implicit(_) => false,
            },
        }
    }
}

/// The elements a pasted fragment ends up inside, innermost first. Selectors
/// such as `body p` reach them above the root container.
const IMPLICIT_ANCESTORS: [&str; 2] = ["body", "html"];

#[derive(Debug, Clone, Copy)]
enum Position {
    Element(NodeId),
    /// Index into [`IMPLICIT_ANCESTORS`].
    Implicit(usize),
}

impl Position {
    fn parent(self, doc: &Document) -> Option<Position> {
        match self {
            Position::Element(element) => match doc
                .parent(element)
                .filter(|&parent| doc.element(parent).is_some())
            {
                Some(parent) => Some(Position::Element(parent)),
                None => Some(Position::Implicit(0)),
            },
            Position::Implicit(level) => {
                (level + 1 < IMPLICIT_ANCESTORS.len()).then_some(Position::Implicit(level + 1))
            }
        }
    }
}

/// Every descendant element of `scope` matched by `selector`, in document
/// order. `scope` itself is never part of the result.
pub fn select(doc: &Document, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    doc.descendant_elements(scope)
        .into_iter()
        .filter(|&element| selector.matches(doc, element))
        .collect()
}

impl Compound {
    fn matches(&self, doc: &Document, element: NodeId) -> bool {
        let Some(data) = doc.element(element) else {
            return false;
        };
        self.0
            .iter()
            .all(|simple| simple.matches(doc, element, data))
    }

    /// Only type and universal selectors can say anything about an element
    /// that is not in the arena.
    fn matches_implicit(&self, tag: &str) -> bool {
        self.0.iter().all(|simple| match simple {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(name) => name.eq_ignore_ascii_case(tag),
            _ => false,
        })
    }
}

impl SimpleSelector {
    fn matches(&self, doc: &Document, element: NodeId, data: &ElementData) -> bool {
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(tag) => data.local_name().eq_ignore_ascii_case(tag),
            SimpleSelector::Id(id) => data.id() == Some(id.as_str()),
            SimpleSelector::Class(class) => data.has_class(class),
            SimpleSelector::Attribute { name, matcher } => match (data.attr(name), matcher) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some((operator, expected))) => {
                    attribute_matches(*operator, actual, expected)
                }
            },
            SimpleSelector::FirstChild => doc.previous_element_siblings(element).next().is_none(),
            SimpleSelector::LastChild => doc.element_siblings(element).last() == Some(&element),
            SimpleSelector::OnlyChild => doc.element_siblings(element).len() == 1,
            SimpleSelector::FirstOfType => {
                same_type_siblings(doc, element, data).first() == Some(&element)
            }
            SimpleSelector::LastOfType => {
                same_type_siblings(doc, element, data).last() == Some(&element)
            }
            SimpleSelector::NthChild { a, b } => {
                let siblings = doc.element_siblings(element);
                siblings
                    .iter()
                    .position(|&s| s == element)
                    .is_some_and(|index| nth_matches(*a, *b, index as i32 + 1))
            }
            SimpleSelector::NthLastChild { a, b } => {
                let siblings = doc.element_siblings(element);
                siblings
                    .iter()
                    .rev()
                    .position(|&s| s == element)
                    .is_some_and(|index| nth_matches(*a, *b, index as i32 + 1))
            }
            SimpleSelector::Not(compound) => !compound.matches(doc, element),
        }
    }
}

fn same_type_siblings(doc: &Document, element: NodeId, data: &ElementData) -> Vec<NodeId> {
    doc.element_siblings(element)
        .into_iter()
        .filter(|&sibling| {
            doc.element(sibling)
                .is_some_and(|other| other.local_name() == data.local_name())
        })
        .collect()
}

fn attribute_matches(operator: AttrOperator, actual: &str, expected: &str) -> bool {
    match operator {
        AttrOperator::Equals => actual == expected,
        AttrOperator::Includes => actual.split_ascii_whitespace().any(|word| word == expected),
        AttrOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
        AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
        AttrOperator::Substring => !expected.is_empty() && actual.contains(expected),
    }
}

/// `an+b` test for a 1-based position.
fn nth_matches(a: i32, b: i32, position: i32) -> bool {
    if a == 0 {
        return position == b;
    }
    let offset = position - b;
    offset % a == 0 && offset / a >= 0
}

fn parse_complex<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, Selector> {
    parser.skip_whitespace();
    let mut compounds = vec![parse_compound(parser)?];
    let mut combinators = Vec::new();

    loop {
        let mut saw_whitespace = false;
        let combinator = loop {
            if parser.is_exhausted() {
                break None;
            }
            let state = parser.state();
            match parser.next_including_whitespace()? {
                Token::WhiteSpace(_) => saw_whitespace = true,
                Token::Delim('>') => break Some(Combinator::Child),
                Token::Delim('+') => break Some(Combinator::NextSibling),
                Token::Delim('~') => break Some(Combinator::SubsequentSibling),
                _ => {
                    parser.reset(&state);
                    if saw_whitespace {
                        break Some(Combinator::Descendant);
                    }
                    return Err(parser.new_custom_error(()));
                }
            }
        };

        let Some(combinator) = combinator else {
            break;
        };
        parser.skip_whitespace();
        combinators.push(combinator);
        compounds.push(parse_compound(parser)?);
    }

    Ok(Selector {
        compounds,
        combinators,
    })
}

fn parse_compound<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, Compound> {
    let mut parts = Vec::new();

    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::Ident(name) if parts.is_empty() => {
                parts.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            }
            Token::Delim('*') if parts.is_empty() => parts.push(SimpleSelector::Universal),
            Token::IDHash(id) => parts.push(SimpleSelector::Id(id.to_string())),
            Token::Delim('.') => {
                let class = match parser.next_including_whitespace()? {
                    Token::Ident(class) => class.to_string(),
                    _ => return Err(parser.new_custom_error(())),
                };
                parts.push(SimpleSelector::Class(class));
            }
            Token::SquareBracketBlock => {
                parts.push(parser.parse_nested_block(parse_attribute)?);
            }
            Token::Colon => parts.push(parse_pseudo_class(parser)?),
            _ => {
                parser.reset(&state);
                break;
            }
        }
    }

    if parts.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    Ok(Compound(parts))
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSelector> {
    parser.skip_whitespace();
    let name = parser.expect_ident()?.to_ascii_lowercase();
    parser.skip_whitespace();
    if parser.is_exhausted() {
        return Ok(SimpleSelector::Attribute {
            name,
            matcher: None,
        });
    }

    let operator = match parser.next()? {
        Token::Delim('=') => AttrOperator::Equals,
        Token::IncludeMatch => AttrOperator::Includes,
        Token::DashMatch => AttrOperator::DashMatch,
        Token::PrefixMatch => AttrOperator::Prefix,
        Token::SuffixMatch => AttrOperator::Suffix,
        Token::SubstringMatch => AttrOperator::Substring,
        _ => return Err(parser.new_custom_error(())),
    };

    let value = match parser.next()? {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        _ => return Err(parser.new_custom_error(())),
    };

    if !parser.is_exhausted() {
        return Err(parser.new_custom_error(()));
    }

    Ok(SimpleSelector::Attribute {
        name,
        matcher: Some((operator, value)),
    })
}

fn parse_pseudo_class<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, SimpleSelector> {
    let token = parser.next_including_whitespace()?.clone();
    match token {
        Token::Ident(name) => match name.to_ascii_lowercase().as_str() {
            "first-child" => Ok(SimpleSelector::FirstChild),
            "last-child" => Ok(SimpleSelector::LastChild),
            "only-child" => Ok(SimpleSelector::OnlyChild),
            "first-of-type" => Ok(SimpleSelector::FirstOfType),
            "last-of-type" => Ok(SimpleSelector::LastOfType),
            _ => Err(parser.new_custom_error(())),
        },
        Token::Function(name) => match name.to_ascii_lowercase().as_str() {
            "nth-child" => {
                let (a, b) = parser.parse_nested_block(parse_nth_block)?;
                Ok(SimpleSelector::NthChild { a, b })
            }
            "nth-last-child" => {
                let (a, b) = parser.parse_nested_block(parse_nth_block)?;
                Ok(SimpleSelector::NthLastChild { a, b })
            }
            "not" => {
                let inner = parser.parse_nested_block(parse_negation)?;
                Ok(SimpleSelector::Not(inner))
            }
            _ => Err(parser.new_custom_error(())),
        },
        _ => Err(parser.new_custom_error(())),
    }
}

fn parse_nth_block<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, (i32, i32)> {
    Ok(parse_nth(parser)?)
}

fn parse_negation<'i>(parser: &mut Parser<'i, '_>) -> SelectorResult<'i, Compound> {
    parser.skip_whitespace();
    let compound = parse_compound(parser)?;
    if !parser.is_exhausted() {
        return Err(parser.new_custom_error(()));
    }
    Ok(compound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::wrap_fragment(
            "<h2 class=\"title main\"><span>T</span></h2>\
             <p id=\"first\">a</p>\
             <blockquote><p>q</p></blockquote>\
             <p data-kind=\"note-box\">b</p>\
             <pre><code class=\"hljs language-rust\">x</code></pre>",
            "wenyan",
        )
    }

    fn tags(doc: &Document, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).expect("selector parses");
        select(doc, doc.root(), &selector)
            .into_iter()
            .map(|id| {
                let el = doc.element(id).expect("element");
                match el.id() {
                    Some(id) => format!("{}#{id}", el.local_name()),
                    None => el.local_name().to_string(),
                }
            })
            .collect()
    }

    #[test]
    fn matches_type_class_and_id() {
        let doc = doc();
        assert_eq!(tags(&doc, "h2.title"), vec!["h2"]);
        assert_eq!(tags(&doc, "#first"), vec!["p#first"]);
        assert_eq!(tags(&doc, ".main.title > span"), vec!["span"]);
        assert_eq!(tags(&doc, "p").len(), 3);
    }

    #[test]
    fn matches_combinators() {
        let doc = doc();
        assert_eq!(tags(&doc, "blockquote p"), vec!["p"]);
        assert_eq!(tags(&doc, "h2 + p"), vec!["p#first"]);
        assert_eq!(tags(&doc, "h2 ~ p").len(), 2);
        assert_eq!(tags(&doc, "pre > code"), vec!["code"]);
        assert_eq!(tags(&doc, "#wenyan > blockquote"), vec!["blockquote"]);
    }

    #[test]
    fn matches_attributes_and_structural_pseudo_classes() {
        let doc = doc();
        assert_eq!(tags(&doc, "p[data-kind|=note]").len(), 1);
        assert_eq!(tags(&doc, "code[class*=rust]"), vec!["code"]);
        assert_eq!(tags(&doc, "code[class~=\"hljs\"]"), vec!["code"]);
        assert_eq!(tags(&doc, "#wenyan > :first-child"), vec!["h2"]);
        assert_eq!(tags(&doc, "#wenyan > :last-child"), vec!["pre"]);
        assert_eq!(tags(&doc, "#wenyan > :nth-child(2n)").len(), 2);
        assert_eq!(tags(&doc, "p:not(#first)").len(), 2);
        assert_eq!(tags(&doc, "blockquote p:only-child"), vec!["p"]);
    }

    #[test]
    fn body_and_html_match_above_the_root() {
        let doc = doc();
        assert_eq!(tags(&doc, "body blockquote p"), vec!["p"]);
        assert_eq!(tags(&doc, "html > body h2 span"), vec!["span"]);
        assert_eq!(tags(&doc, "body > #wenyan > pre"), vec!["pre"]);
        assert!(tags(&doc, "body > p").is_empty());
        assert!(tags(&doc, "html > p").is_empty());
        assert!(tags(&doc, "body.dark p").is_empty());
        assert!(tags(&doc, "div p").is_empty());
    }

    #[test]
    fn pseudo_elements_and_unknown_pseudo_classes_do_not_parse() {
        assert!(Selector::parse("h2::before").is_none());
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("p >").is_none());
    }

    #[test]
    fn nth_formula() {
        assert!(nth_matches(2, 0, 4));
        assert!(!nth_matches(2, 0, 3));
        assert!(nth_matches(0, 3, 3));
        assert!(nth_matches(-1, 3, 1));
        assert!(!nth_matches(-1, 3, 4));
    }
}
