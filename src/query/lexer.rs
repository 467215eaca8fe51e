// Tokenizer for free-text queries

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    combinator::{all_consuming, map},
    multi::many0,
    IResult,
};

/// A maximal run of word characters, or of anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Gap(&'a str),
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word(input: &str) -> IResult<&str, Token<'_>> {
    map(take_while1(is_word_char), Token::Word)(input)
}

fn gap(input: &str) -> IResult<&str, Token<'_>> {
    map(take_while1(|c| !is_word_char(c)), Token::Gap)(input)
}

/// Split text into alternating word and gap tokens. Concatenating the
/// tokens reproduces the input.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    match all_consuming(many0(alt((word, gap))))(input) {
        Ok((_, tokens)) => tokens,
        // every char is either a word char or not, so this is unreachable
        Err(_) => Vec::new(),
    }
}
