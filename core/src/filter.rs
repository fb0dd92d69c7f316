use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// En filternøkkel: meldingsnavn (`"record"`) eller globalt meldingsnummer (`20`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageKey {
    Number(u16),
    Name(String),
}

impl FromStr for MessageKey {
    type Err = Infallible;

    /// Rene sifre som passer i u16 blir nummer, alt annet navn.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<u16>()
            .map(MessageKey::Number)
            .unwrap_or_else(|_| MessageKey::Name(s.to_string())))
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKey::Number(n) => write!(f, "{n}"),
            MessageKey::Name(name) => f.write_str(name),
        }
    }
}

/// Sett av aksepterte meldinger. Tomt sett = ingen filtrering.
///
/// Navn og nummer er én union: en melding slipper gjennom hvis enten
/// navnet eller nummeret finnes i settet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    names: HashSet<String>,
    numbers: HashSet<u16>,
}

impl MessageFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.numbers.is_empty()
    }

    pub fn insert(&mut self, key: MessageKey) {
        match key {
            MessageKey::Number(n) => {
                self.numbers.insert(n);
            }
            MessageKey::Name(name) => {
                self.names.insert(name);
            }
        }
    }

    pub fn accepts(&self, name: &str, global_mesg_num: u16) -> bool {
        self.is_empty() || self.names.contains(name) || self.numbers.contains(&global_mesg_num)
    }
}

impl FromIterator<MessageKey> for MessageFilter {
    fn from_iter<T: IntoIterator<Item = MessageKey>>(iter: T) -> Self {
        let mut filter = MessageFilter::default();
        for key in iter {
            filter.insert(key);
        }
        filter
    }
}

impl<'a> FromIterator<&'a str> for MessageFilter {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter()
            .map(|s| match s.parse::<MessageKey>() {
                Ok(key) => key,
                Err(never) => match never {},
            })
            .collect()
    }
}
