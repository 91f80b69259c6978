//! Typed platform identifiers.
//!
//! Platform snowflakes are 64-bit unsigned integers. Wrapping them keeps a
//! member id from being passed where a channel id is expected.

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw snowflake value.
            pub fn get(self) -> u64 {
                self.0
            }

            /// Convert to the signed representation used by PostgreSQL `BIGINT` columns.
            pub fn to_db(self) -> i64 {
                self.0 as i64
            }

            /// Convert from the signed database representation.
            pub fn from_db(id: i64) -> Self {
                Self(id as u64)
            }
        }
    };
}

snowflake!(
    /// Guild (server) identifier.
    GuildId
);
snowflake!(
    /// Channel identifier, used for primaries, secondaries and paired text channels.
    ChannelId
);
snowflake!(
    /// Guild member (user) identifier.
    MemberId
);
snowflake!(
    /// Role identifier.
    RoleId
);

impl GuildId {
    /// The guild's default role. On the platform it shares the guild's id.
    pub fn everyone_role(self) -> RoleId {
        RoleId(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip_keeps_high_bit() {
        let id = ChannelId(u64::MAX - 5);
        assert_eq!(ChannelId::from_db(id.to_db()), id);
    }

    #[test]
    fn test_everyone_role_matches_guild() {
        assert_eq!(GuildId(99).everyone_role(), RoleId(99));
    }
}
