use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// How a request names a client: by numeric id or by slug.
///
/// Parsed once at the HTTP boundary. A segment that parses as an `i32` is an id, anything
/// else is a slug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientRef {
    Id(i32),
    Slug(String),
}

impl FromStr for ClientRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i32>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Slug(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for ClientRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(parsed) = raw.parse::<ClientRef>();
        Ok(parsed)
    }
}

impl fmt::Display for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Human-readable identifier of a contact channel: `YY-ClientId-Position`.
///
/// `YY` is the two-digit year the client was created, `Position` the 1-based ordinal of the
/// identifier within its client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeId {
    pub year: u8,
    pub client_id: i32,
    pub position: i32,
}

impl CompositeId {
    pub fn new(created_year: i32, client_id: i32, position: i32) -> Self {
        Self {
            year: created_year.rem_euclid(100) as u8,
            client_id,
            position,
        }
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}-{}", self.year, self.client_id, self.position)
    }
}

impl FromStr for CompositeId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('-');
        let (Some(year), Some(client_id), Some(position), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(());
        };
        if year.len() != 2 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(());
        }
        Ok(Self {
            year: year.parse().map_err(|_| ())?,
            client_id: client_id.parse().map_err(|_| ())?,
            position: position.parse().map_err(|_| ())?,
        })
    }
}
