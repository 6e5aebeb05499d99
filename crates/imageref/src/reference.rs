use crate::{grammar, Error, Reason, RegistryHost, Result};
use peg::{error::ParseError, str::LineCol};

const DEFAULT_DOMAIN: &str = "docker.io";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

/// Parsed `[host[:port]/]path[:tag][@digest]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    pub host: RegistryHost,
    pub path: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

fn looks_like_host(component: &str) -> bool {
    component.contains(|c: char| c == '.' || c == ':')
        || component == "localhost"
        || component.chars().any(|c| c.is_ascii_uppercase())
}

fn split_host(reference: &str) -> (Option<&str>, &str) {
    match reference.split_once('/') {
        Some((first, rest)) if looks_like_host(first) => (Some(first), rest),
        _ => (None, reference),
    }
}

fn is_identifier(reference: &str) -> bool {
    reference.len() == 64
        && reference
            .chars()
            .all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn syntax(e: ParseError<LineCol>) -> Reason {
    Reason::Syntax {
        column: e.location.column,
        expected: e.expected.to_string(),
    }
}

/// Parse full image reference
pub fn parse(reference: &str) -> Result<ImageReference> {
    let invalid = |reason| Error::InvalidReference {
        reference: reference.to_owned(),
        reason,
    };

    if reference.is_empty() {
        return Err(invalid(Reason::Empty));
    }
    if is_identifier(reference) {
        return Err(invalid(Reason::AmbiguousIdentifier));
    }

    let (host, remainder) = split_host(reference);
    if let Some(host) = host {
        grammar::host(host).map_err(|e| {
            invalid(Reason::InvalidHost {
                column: e.location.column,
                expected: e.expected.to_string(),
            })
        })?;
    }

    let repository = remainder
        .split(|c: char| c == ':' || c == '@')
        .next()
        .unwrap_or_default();
    if repository.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(invalid(Reason::Uppercase));
    }

    let parsed = grammar::remainder(remainder).map_err(|e| {
        let mut reason = syntax(e);
        if let (Some(host), Reason::Syntax { column, .. }) = (host, &mut reason) {
            // make column relative to the whole reference
            *column += host.len() + 1;
        }
        invalid(reason)
    })?;

    let name_len = host.unwrap_or(DEFAULT_DOMAIN).len() + 1 + parsed.path.len();
    if name_len > NAME_TOTAL_LENGTH_MAX {
        return Err(invalid(Reason::NameTooLong(NAME_TOTAL_LENGTH_MAX)));
    }

    Ok(ImageReference {
        host: host.map(RegistryHost::new).unwrap_or_default(),
        path: parsed.path.to_owned(),
        tag: parsed.tag.map(ToOwned::to_owned),
        digest: parsed.digest.map(ToOwned::to_owned),
    })
}

/// Find out from which registry image is pulled
pub fn resolve(reference: &str) -> Result<RegistryHost> {
    parse(reference).map(|r| r.host)
}
