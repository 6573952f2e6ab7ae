//! Status enums for orders and payments.
//!
//! The Mebius API encodes these as SCREAMING_SNAKE_CASE strings
//! (e.g., `"PENDING"`, `"COD"`).

use serde::{Deserialize, Serialize};

/// Order fulfillment lifecycle, as managed from the admin back-office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// How the customer pays for an order.
///
/// COD completes the order immediately; CARD requires a follow-up payment
/// confirmation against the returned payment-intent secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cod,
    Card,
}

/// Error returned when parsing a status string fails.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError {
                kind: "order status",
                value: s.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            _ => Err(ParseStatusError {
                kind: "payment status",
                value: s.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cod => "COD",
            Self::Card => "CARD",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "CARD" => Ok(Self::Card),
            _ => Err(ParseStatusError {
                kind: "payment method",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Shipped).expect("serialize");
        assert_eq!(json, "\"SHIPPED\"");

        let back: OrderStatus = serde_json::from_str("\"CANCELLED\"").expect("deserialize");
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cod).expect("serialize"),
            "\"COD\""
        );
        assert_eq!(PaymentMethod::Card.to_string(), "CARD");
        assert_eq!("COD".parse::<PaymentMethod>().expect("parse"), PaymentMethod::Cod);
    }

    #[test]
    fn test_order_status_parse_rejects_unknown() {
        assert!("REFUNDED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_status_roundtrip() {
        assert_eq!(PaymentStatus::Paid.to_string(), "PAID");
        assert_eq!(
            "PENDING".parse::<PaymentStatus>().expect("parse"),
            PaymentStatus::Pending
        );
    }
}
