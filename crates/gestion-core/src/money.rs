//! # Money Module
//!
//! `Money` holds amounts in centimes (1 DH = 100 centimes) and `TvaRate`
//! holds VAT rates in basis points.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Ledger invariant:  total = paid_cash + paid_credit                     │
//! │                                                                         │
//! │  With floats:   19.90 = 10.00 + 9.90  → may fail by 1e-15              │
//! │  With centimes: 1990  = 1000  + 990   → exact, always                  │
//! │                                                                         │
//! │  Client credit balances are running sums over years of sales,          │
//! │  payments and returns. Float drift would show up as phantom debt.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use gestion_core::money::Money;
//!
//! let price = Money::from_cents(1250); // 12.50 DH
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.cents(), 3750);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// TVA Rate
// =============================================================================

/// VAT (TVA) rate in basis points.
///
/// 1 basis point = 0.01 %. Moroccan standard rate 20 % = 2000 bps,
/// reduced rates 14 %, 10 % and 7 % = 1400, 1000, 700 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TvaRate(u32);

impl TvaRate {
    /// Standard Moroccan TVA rate (20 %).
    pub const STANDARD: TvaRate = TvaRate(2000);

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TvaRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TvaRate(0)
    }
}

impl Default for TvaRate {
    fn default() -> Self {
        TvaRate::STANDARD
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centimes.
///
/// ## Design Decisions
/// - **i64 (signed)**: credit balances go negative when a client pays in
///   advance, refunds are negative flows
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// CartLine.unit_price ──► line_total ──► Sale.total ──┬──► paid_cash
///                                                     └──► paid_credit ──► Client.credit_balance
///
/// ReturnLine.quantity × unit_price ──► refund ──┬──► refund_cash
///                                               └──► refund_credit ──► Client.credit_balance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centimes.
    ///
    /// ## Example
    /// ```rust
    /// use gestion_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99 DH
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dirhams and centimes.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50 DH.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in centimes.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole dirham portion.
    #[inline]
    pub const fn dirhams(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centime portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates TVA on this amount, rounding half up on centimes.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large invoice totals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use gestion_core::money::{Money, TvaRate};
    ///
    /// let ht = Money::from_cents(1005); // 10.05 DH
    /// let tva = ht.calculate_tva(TvaRate::from_bps(2000));
    /// // 10.05 × 20 % = 2.01
    /// assert_eq!(tva.cents(), 201);
    /// ```
    pub fn calculate_tva(&self, rate: TvaRate) -> Money {
        self.apply_bps(rate.bps())
    }

    /// Returns `bps / 10000` of this amount, rounded half up.
    ///
    /// Used for TVA and for partial refunds of defective returns.
    pub fn apply_bps(&self, bps: u32) -> Money {
        let scaled = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(scaled as i64)
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use gestion_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Like [`Money::multiply_quantity`], but `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering, e.g. `12.50 DH`.
///
/// The GUI shell does its own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02} DH",
            sign,
            self.dirhams().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dirhams(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99 DH");
        assert_eq!(Money::from_cents(500).to_string(), "5.00 DH");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50 DH");
        assert_eq!(Money::zero().to_string(), "0.00 DH");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_checked_multiply_quantity() {
        let price = Money::from_cents(299);
        assert_eq!(price.checked_multiply_quantity(3), Some(Money::from_cents(897)));
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 1000);
    }

    #[test]
    fn test_tva_standard_rate() {
        let ht = Money::from_cents(10_000);
        assert_eq!(ht.calculate_tva(TvaRate::STANDARD).cents(), 2_000);
    }

    #[test]
    fn test_tva_rounds_half_up() {
        // 0.25 DH at 14 % = 0.035 → 0.04
        let ht = Money::from_cents(25);
        assert_eq!(ht.calculate_tva(TvaRate::from_bps(1400)).cents(), 4);
    }

    #[test]
    fn test_apply_bps_half_refund() {
        let refund = Money::from_cents(999);
        assert_eq!(refund.apply_bps(5000).cents(), 500);
        assert_eq!(refund.apply_bps(10_000).cents(), 999);
        assert_eq!(refund.apply_bps(0).cents(), 0);
    }

    #[test]
    fn test_zero_and_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert_eq!(Money::from_cents(-42).abs().cents(), 42);
    }

    #[test]
    fn test_tva_rate_percentage() {
        let rate = TvaRate::from_bps(1400);
        assert_eq!(rate.bps(), 1400);
        assert!((rate.percentage() - 14.0).abs() < f64::EPSILON);
        assert_eq!(TvaRate::default(), TvaRate::STANDARD);
    }
}
