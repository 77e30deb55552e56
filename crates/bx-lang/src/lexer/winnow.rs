use winnow::combinator::{alt, cut_err, opt, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::token::{literal, take_till, take_until, take_while};
use winnow::{ModalResult, Parser};

pub(crate) const MULTI_PUNCT: &[&str] = &[
    "++", "--", "+=", "-=", "*=", "/=", "&=", "==", "!=", "<=", ">=", "&&", "||", "?:", "=>",
];
pub(crate) const SINGLE_PUNCT: &str = "=+-*/%&^!<>?:;,.()[]{}";

/// Whitespace plus `//` and `/* */` comments, as allowed between script tokens.
pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    repeat::<_, _, (), _, _>(0.., alt((whitespace, line_comment, block_comment)))
        .parse_next(input)?;
    Ok(())
}

pub(crate) fn whitespace(input: &mut &str) -> ModalResult<()> {
    take_while(1.., char::is_whitespace)
        .map(|_| ())
        .parse_next(input)
}

pub(crate) fn line_comment(input: &mut &str) -> ModalResult<()> {
    literal("//").parse_next(input)?;
    take_till(0.., |c: char| c == '\n').parse_next(input)?;
    opt(literal("\n")).parse_next(input)?;
    Ok(())
}

pub(crate) fn block_comment(input: &mut &str) -> ModalResult<()> {
    literal("/*").parse_next(input)?;
    cut_err(take_until(0.., "*/")).parse_next(input)?;
    literal("*/").parse_next(input)?;
    Ok(())
}

/// `<!--- ... --->`, which may nest.
pub(crate) fn tag_comment(input: &mut &str) -> ModalResult<()> {
    literal("<!---").parse_next(input)?;
    let mut depth = 1usize;
    while depth > 0 {
        if let Some(rest) = input.strip_prefix("<!---") {
            depth += 1;
            *input = rest;
        } else if let Some(rest) = input.strip_prefix("--->") {
            depth -= 1;
            *input = rest;
        } else if let Some(ch) = input.chars().next() {
            *input = &input[ch.len_utf8()..];
        } else {
            return Err(ErrMode::Cut(ContextError::new()));
        }
    }
    Ok(())
}

pub(crate) fn identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        take_while(1..=1, is_ident_start),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
}

/// Attribute names and bare attribute values may contain `-`, `:` and `.`.
pub(crate) fn attribute_word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        take_while(1..=1, is_ident_start),
        take_while(0.., |c: char| {
            is_ident_continue(c) || c == '-' || c == ':' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

pub(crate) fn tag_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

/// `12`, `1.5`, `2e10`, `3.5E-2`.
pub(crate) fn number<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let start = *input;
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if let Some(rest) = input.strip_prefix('.') {
        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            *input = rest;
            take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        }
    }
    if let Some(rest) = input.strip_prefix(['e', 'E']) {
        let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
        if digits.starts_with(|c: char| c.is_ascii_digit()) {
            *input = digits;
            take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        }
    }
    Ok(&start[..start.len() - input.len()])
}

pub(crate) fn symbol<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((multi_punct, single_punct)).parse_next(input)
}

fn multi_punct<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    for sym in MULTI_PUNCT {
        if input.starts_with(sym) {
            let (taken, rest) = input.split_at(sym.len());
            *input = rest;
            return Ok(taken);
        }
    }
    Err(backtrack_err())
}

fn single_punct<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1..=1, |c: char| SINGLE_PUNCT.contains(c)).parse_next(input)
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_ascii_alphabetic()
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_ascii_alphanumeric()
}

pub(crate) fn starts_with_ignore_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

pub(crate) fn backtrack_err() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_stop_before_member_access() {
        let mut input = "12.5e3.x";
        assert_eq!(number(&mut input).unwrap(), "12.5e3");
        assert_eq!(input, ".x");

        let mut input = "7.foo";
        assert_eq!(number(&mut input).unwrap(), "7");
    }

    #[test]
    fn nested_tag_comments_are_skipped_whole() {
        let mut input = "<!--- a <!--- b ---> c --->rest";
        tag_comment(&mut input).unwrap();
        assert_eq!(input, "rest");

        let mut input = "<!--- open";
        assert!(tag_comment(&mut input).is_err());
    }

    #[test]
    fn multi_char_symbols_win() {
        let mut input = "+=1";
        assert_eq!(symbol(&mut input).unwrap(), "+=");
        let mut input = "?:x";
        assert_eq!(symbol(&mut input).unwrap(), "?:");
    }
}
