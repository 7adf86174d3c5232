use std::fmt;

use crate::mail::encoding::encode_words;
use crate::mail::BuildError;

/// A mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub address: String,
}

impl Address {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Default sender for delivered feed messages.
    pub fn sender() -> Self {
        Self::new("vmail", "vmail@localhost")
    }

    /// Parses `addr@domain`, `Name <addr@domain>` or `"Name" <addr@domain>`.
    pub fn parse(input: &str) -> Result<Self, BuildError> {
        Self::parse_inner(input, false)
    }

    /// Like [`Address::parse`], but also accepts a catch-all `@domain`.
    pub fn parse_dest(input: &str) -> Result<Self, BuildError> {
        Self::parse_inner(input, true)
    }

    fn parse_inner(input: &str, allow_catch_all: bool) -> Result<Self, BuildError> {
        let input = input.trim();
        let invalid = || BuildError::InvalidAddress(input.to_string());

        let (name, address) = match input.strip_suffix('>') {
            Some(rest) => {
                let open = rest.rfind('<').ok_or_else(invalid)?;
                let name = parse_display_name(rest[..open].trim()).ok_or_else(invalid)?;
                (name, rest[open + 1..].trim())
            }
            None => (String::new(), input),
        };

        if !valid_addr_spec(address, allow_catch_all) {
            return Err(invalid());
        }

        Ok(Self::new(name, address))
    }

    pub fn user(&self) -> &str {
        self.address
            .split_once('@')
            .map(|(user, _)| user)
            .unwrap_or_default()
    }

    pub fn domain(&self) -> &str {
        self.address
            .split_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default()
    }

    pub fn is_catch_all(&self) -> bool {
        self.address.starts_with('@')
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::sender()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return write!(f, "{}", self.address);
        }
        if self.name.bytes().all(|b| matches!(b, b' '..=b'~')) {
            f.write_str("\"")?;
            for c in self.name.chars() {
                if c == '"' || c == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, "\" <{}>", self.address)
        } else {
            write!(f, "{} <{}>", encode_words(&self.name), self.address)
        }
    }
}

fn parse_display_name(raw: &str) -> Option<String> {
    let Some(quoted) = raw.strip_prefix('"') else {
        return (!raw.contains('"')).then(|| raw.to_string());
    };
    let inner = quoted.strip_suffix('"')?;

    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => name.push(chars.next()?),
            '"' => return None,
            c => name.push(c),
        }
    }
    Some(name)
}

fn valid_addr_spec(address: &str, allow_catch_all: bool) -> bool {
    if address
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "<>,;\"()[]\\".contains(c))
    {
        return false;
    }
    let Some((user, domain)) = address.split_once('@') else {
        return false;
    };
    if user.is_empty() && !allow_catch_all {
        return false;
    }
    !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !user.starts_with('.')
        && !user.ends_with('.')
}
