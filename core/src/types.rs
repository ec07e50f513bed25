//! Shared primitive types used across the whole engine.

/// Monetary amount in dollars. Rounded to cents at allocation boundaries.
pub type Money = f64;

/// A stable, unique identifier for a bill.
pub type BillId = String;

/// The owning user's identifier.
pub type UserId = String;

/// Round a money amount to whole cents.
pub fn round_cents(amount: Money) -> Money {
    (amount * 100.0).round() / 100.0
}
