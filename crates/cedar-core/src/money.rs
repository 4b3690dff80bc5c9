//! # Money Module
//!
//! Fixed-point monetary and quantity types for the dual-currency ledger.
//!
//! ## Why Integer Fixed-Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A weighted-average cost drifts by a fraction of a cent per receipt    │
//! │  and the books stop reconciling within a month.                        │
//! │                                                                         │
//! │  OUR SOLUTION: i64 at a fixed storage scale                            │
//! │    Usd = i64 at 4 decimal places  (1 raw unit = $0.0001)               │
//! │    Lbp = i64 at 2 decimal places  (1 raw unit = 0.01 LL)               │
//! │    Qty = i64 at 3 decimal places  (1 raw unit = 0.001 of the UoM)      │
//! │                                                                         │
//! │  Division rounds half away from zero at the storage scale, so the      │
//! │  rounding rule is explicit and identical everywhere.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Currency Discipline
//! USD and LBP amounts are parallel, independently-entered ledgers. They are
//! NEVER derived from one another through an exchange rate at read time; the
//! rate stored on a journal is audit metadata only. That is why there is no
//! conversion between [`Usd`] and [`Lbp`] anywhere in this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Storage scale for USD amounts: 4 decimal places.
pub const USD_SCALE: i64 = 10_000;

/// Storage scale for LBP amounts: 2 decimal places.
pub const LBP_SCALE: i64 = 100;

/// Storage scale for stock quantities: 3 decimal places.
pub const QTY_SCALE: i64 = 1_000;

/// Divides with rounding half away from zero.
///
/// The denominator must be positive; every caller in this crate guarantees it
/// (aggregate quantities are checked before the division happens).
#[inline]
fn div_round_half(num: i128, den: i128) -> i64 {
    debug_assert!(den > 0);
    if num >= 0 {
        ((num + den / 2) / den) as i64
    } else {
        -(((-num) + den / 2) / den) as i64
    }
}

// =============================================================================
// Usd
// =============================================================================

/// A USD amount at 4-decimal-place storage precision.
///
/// ## Design Decisions
/// - **i64 (signed)**: credits, reversals and adjustments need negatives
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Raw unit = $0.0001**: matches the ledger's storage precision, so the
///   weighted average survives a round trip through the database unchanged
///
/// ## Example
/// ```rust
/// use cedar_core::money::Usd;
///
/// let cost = Usd::from_raw(23_333); // $2.3333
/// assert_eq!(cost.raw(), 23_333);
/// assert_eq!(format!("{cost}"), "$2.3333");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Usd(i64);

impl Usd {
    /// Creates a USD amount from raw units ($0.0001 each).
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Usd(raw)
    }

    /// Creates a USD amount from whole dollars.
    ///
    /// ## Example
    /// ```rust
    /// use cedar_core::money::Usd;
    ///
    /// assert_eq!(Usd::from_major(2).raw(), 20_000);
    /// ```
    #[inline]
    pub const fn from_major(dollars: i64) -> Self {
        Usd(dollars * USD_SCALE)
    }

    /// Returns the value in raw units ($0.0001 each).
    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Zero dollars.
    #[inline]
    pub const fn zero() -> Self {
        Usd(0)
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Usd(self.0.abs())
    }

    /// Extends a unit cost over a quantity: `self × qty`, rounded half away
    /// from zero back to 4 decimal places.
    ///
    /// This is the COGS computation for an outbound move.
    ///
    /// ## Example
    /// ```rust
    /// use cedar_core::money::{Qty, Usd};
    ///
    /// let avg = Usd::from_raw(23_333);       // $2.3333
    /// let qty = Qty::from_whole(8);
    /// assert_eq!(avg.extend(qty).raw(), 186_664); // $18.6664
    /// ```
    pub fn extend(&self, qty: Qty) -> Usd {
        // i128 intermediate: scale 4 × scale 3 = scale 7, divide back to 4.
        Usd(div_round_half(
            self.0 as i128 * qty.raw() as i128,
            QTY_SCALE as i128,
        ))
    }

    /// Computes the new weighted moving average after receiving `qty` units
    /// at unit cost `cost` on top of `on_hand` units carried at `avg`.
    ///
    /// `new_avg = (on_hand × avg + qty × cost) / (on_hand + qty)`
    ///
    /// The caller must guarantee `on_hand + qty > 0`; the fallback for empty
    /// or negative aggregates lives in the costing module, not here.
    pub fn weighted_avg(on_hand: Qty, avg: Usd, qty: Qty, cost: Usd) -> Usd {
        let carried = on_hand.raw() as i128 * avg.raw() as i128;
        let incoming = qty.raw() as i128 * cost.raw() as i128;
        let total_qty = on_hand.raw() as i128 + qty.raw() as i128;
        // Numerator is at scale 3+4=7; dividing by a scale-3 quantity lands
        // back on the 4-decimal storage scale.
        Usd(div_round_half(carried + incoming, total_qty))
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:04}",
            sign,
            (self.0 / USD_SCALE).abs(),
            (self.0 % USD_SCALE).abs()
        )
    }
}

impl Add for Usd {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Usd(self.0 + other.0)
    }
}

impl AddAssign for Usd {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Usd {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Usd(self.0 - other.0)
    }
}

impl SubAssign for Usd {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Usd {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Usd(-self.0)
    }
}

// =============================================================================
// Lbp
// =============================================================================

/// An LBP (Lebanese pound) amount at 2-decimal-place storage precision.
///
/// Same shape as [`Usd`], different scale. The two ledgers never convert
/// into each other; see the module docs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Lbp(i64);

impl Lbp {
    /// Creates an LBP amount from raw units (0.01 LL each).
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Lbp(raw)
    }

    /// Creates an LBP amount from whole pounds.
    #[inline]
    pub const fn from_major(pounds: i64) -> Self {
        Lbp(pounds * LBP_SCALE)
    }

    /// Returns the value in raw units (0.01 LL each).
    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Lbp(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Lbp(self.0.abs())
    }

    /// Extends a unit cost over a quantity at 2 decimal places.
    pub fn extend(&self, qty: Qty) -> Lbp {
        Lbp(div_round_half(
            self.0 as i128 * qty.raw() as i128,
            QTY_SCALE as i128,
        ))
    }

    /// Weighted moving average in the LBP ledger; see [`Usd::weighted_avg`].
    pub fn weighted_avg(on_hand: Qty, avg: Lbp, qty: Qty, cost: Lbp) -> Lbp {
        let carried = on_hand.raw() as i128 * avg.raw() as i128;
        let incoming = qty.raw() as i128 * cost.raw() as i128;
        let total_qty = on_hand.raw() as i128 + qty.raw() as i128;
        Lbp(div_round_half(carried + incoming, total_qty))
    }
}

impl fmt::Display for Lbp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02} LL",
            sign,
            (self.0 / LBP_SCALE).abs(),
            (self.0 % LBP_SCALE).abs()
        )
    }
}

impl Add for Lbp {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Lbp(self.0 + other.0)
    }
}

impl AddAssign for Lbp {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Lbp {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Lbp(self.0 - other.0)
    }
}

impl SubAssign for Lbp {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Lbp {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Lbp(-self.0)
    }
}

// =============================================================================
// Qty
// =============================================================================

/// A stock quantity at 3-decimal-place storage precision.
///
/// Signed because an aggregate on-hand balance may legitimately go negative
/// when the surrounding policy allows overselling; the costing ledger applies
/// whatever quantity arrives and does not decide policy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Qty(i64);

impl Qty {
    /// Creates a quantity from raw units (0.001 each).
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Qty(raw)
    }

    /// Creates a quantity from whole units.
    ///
    /// ## Example
    /// ```rust
    /// use cedar_core::money::Qty;
    ///
    /// assert_eq!(Qty::from_whole(10).raw(), 10_000);
    /// ```
    #[inline]
    pub const fn from_whole(units: i64) -> Self {
        Qty(units * QTY_SCALE)
    }

    /// Returns the value in raw units (0.001 each).
    #[inline]
    pub const fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Qty(0)
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
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:03}",
            sign,
            (self.0 / QTY_SCALE).abs(),
            (self.0 % QTY_SCALE).abs()
        )
    }
}

impl Add for Qty {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Qty(self.0 + other.0)
    }
}

impl AddAssign for Qty {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Qty {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Qty(self.0 - other.0)
    }
}

impl SubAssign for Qty {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Qty {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Qty(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
