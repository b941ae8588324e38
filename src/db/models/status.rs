use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use std::{fmt, io::Write, str::FromStr};
use thiserror::Error;

/// A status string that does not name any known variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a status enum stored as lowercase text in Postgres and
/// serialized with the same spelling on the wire.
macro_rules! text_status {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
            diesel::AsExpression, diesel::FromSqlRow,
        )]
        #[diesel(sql_type = diesel::sql_types::Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownStatus {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                raw.parse().map_err(Into::into)
            }
        }
    };
}

text_status!(
    /// Lifecycle of a medicine order
    OrderStatus, "order status" {
        Pending => "pending",
        Verified => "verified",
        Dispatched => "dispatched",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
);

text_status!(
    /// Payment collected for a medicine order, usually on delivery
    PaymentStatus, "payment status" {
        Pending => "pending",
        Paid => "paid",
    }
);

text_status!(
    /// Prescription or identity document review, shared by orders and bookings
    VerificationStatus, "verification status" {
        Pending => "pending",
        Verified => "verified",
        NotVerified => "not_verified",
    }
);

text_status!(
    /// Lifecycle of a room booking
    BookingStatus, "booking status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

text_status!(
    PaidStatus, "paid status" {
        Unpaid => "unpaid",
        PartiallyPaid => "partially_paid",
        Paid => "paid",
    }
);

text_status!(
    CheckinStatus, "check-in status" {
        NotCheckedIn => "not_checked_in",
        CheckedIn => "checked_in",
        CheckedOut => "checked_out",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!(
            " not_verified ".parse::<VerificationStatus>(),
            Ok(VerificationStatus::NotVerified)
        );
        assert_eq!(
            "checked_out".parse::<CheckinStatus>(),
            Ok(CheckinStatus::CheckedOut)
        );
    }

    #[test]
    fn test_unknown_status_names_the_kind() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown order status 'shipped'");
    }

    #[test]
    fn test_wire_spelling_matches_storage() {
        assert_eq!(
            serde_json::to_string(&PaidStatus::PartiallyPaid).unwrap(),
            "\"partially_paid\""
        );
        assert_eq!(PaidStatus::PartiallyPaid.as_str(), "partially_paid");
        let parsed: BookingStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(parsed, BookingStatus::Confirmed);
    }
}
