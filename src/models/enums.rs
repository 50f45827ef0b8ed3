use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(SlotStatus {
    Available => "Available",
    Booked => "Booked",
});

str_enum!(AppointmentStatus {
    Confirmed => "Confirmed",
    Reminder1Sent => "Reminder 1 Sent",
    Reminder2Sent => "Reminder 2 Sent",
    Reminder3Sent => "Reminder 3 Sent",
});

impl AppointmentStatus {
    /// Status after the next reminder goes out. `None` once the final reminder is sent.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Confirmed => Some(Self::Reminder1Sent),
            Self::Reminder1Sent => Some(Self::Reminder2Sent),
            Self::Reminder2Sent => Some(Self::Reminder3Sent),
            Self::Reminder3Sent => None,
        }
    }
}

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});
