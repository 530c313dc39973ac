use std::fmt;
use std::str::FromStr;

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        // Discord and the backend node both send ids as strings, so they
        // are written as strings and read from either form.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor).map(Self)
            }
        }
    };
}

snowflake!(
    /// A chat-platform guild, the unit of isolation for playback sessions.
    GuildId
);
snowflake!(
    /// A voice or text channel.
    ChannelId
);
snowflake!(
    /// A user, used to recognise the bot's own voice state updates.
    UserId
);

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a snowflake as a string or an integer")
    }

    fn visit_u64<E: DeError>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: DeError>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(E::custom)
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<u64, E> {
        v.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_strings_and_integers() {
        let a: GuildId = serde_json::from_str("\"81384788765712384\"").unwrap();
        let b: GuildId = serde_json::from_str("81384788765712384").unwrap();

        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"81384788765712384\"");
    }

    #[test]
    fn works_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(GuildId(7), 1u8);

        let raw = serde_json::to_string(&map).unwrap();
        let back: std::collections::HashMap<GuildId, u8> = serde_json::from_str(&raw).unwrap();

        assert_eq!(back.get(&GuildId(7)), Some(&1));
    }
}
