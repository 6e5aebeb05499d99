use peg::{error::ParseError, str::LineCol};

/// Everything after the registry host
#[derive(Debug, PartialEq)]
pub struct Remainder<'a> {
    pub path: &'a str,
    pub tag: Option<&'a str>,
    pub digest: Option<&'a str>,
}

peg::parser! {
    grammar reference_parser() for str {
        rule alnum()
            = ['a'..='z' | '0'..='9']+
        rule separator()
            = "__" / ['_' | '.'] / "-"+
        rule path_component()
            = alnum() (separator() alnum())*

        rule mixed_alnum()
            = ['a'..='z' | 'A'..='Z' | '0'..='9']+
        rule domain_component()
            = mixed_alnum() ("-"+ mixed_alnum())*
        rule ipv6()
            = "[" ['0'..='9' | 'a'..='f' | 'A'..='F' | ':']+ "]"
        rule port()
            = ":" ['0'..='9']+

        rule tag()
            = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']
              ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.' | '-']*<0,127>

        rule algorithm_component()
            = ['a'..='z' | 'A'..='Z'] ['a'..='z' | 'A'..='Z' | '0'..='9']*
        rule digest()
            = algorithm_component() (['-' | '_' | '+' | '.'] algorithm_component())*
              ":" ['0'..='9' | 'a'..='f' | 'A'..='F']*<32,>

        pub rule host() -> &'input str
            = $((ipv6() / domain_component() ++ ".") port()?)

        pub rule remainder() -> Remainder<'input>
            = path:$(path_component() ++ "/")
              tag:(":" t:$(tag()) { t })?
              digest:("@" d:$(digest()) { d })? {
                Remainder { path, tag, digest }
            }
    }
}

pub fn host(input: &str) -> Result<&str, ParseError<LineCol>> {
    reference_parser::host(input)
}

pub fn remainder(input: &str) -> Result<Remainder<'_>, ParseError<LineCol>> {
    reference_parser::remainder(input)
}
