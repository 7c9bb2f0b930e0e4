use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Category`].
    CategoryId
);
record_id!(
    /// Identifier of a [`Tag`].
    TagId
);
record_id!(
    /// Identifier of a [`Product`].
    ProductId
);
record_id!(
    /// Identifier of a [`ProductDetail`].
    DetailId
);

/// Why a value cannot be held by a [`Fixed`] decimal.
///
/// The messages are shown to the user next to the offending form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedPointError {
    NotANumber,
    Negative,
    TooManyDigits { max: u32 },
    TooManyDecimalPlaces { max: u32 },
    TooManyWholeDigits { max: u32 },
}

impl fmt::Display for FixedPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedPointError::NotANumber => write!(f, "Enter a number."),
            FixedPointError::Negative => {
                write!(f, "Ensure this value is greater than or equal to 0.")
            }
            FixedPointError::TooManyDigits { max } => {
                write!(f, "Ensure that there are no more than {} digits in total.", max)
            }
            FixedPointError::TooManyDecimalPlaces { max } => {
                write!(f, "Ensure that there are no more than {} decimal places.", max)
            }
            FixedPointError::TooManyWholeDigits { max } => write!(
                f,
                "Ensure that there are no more than {} digits before the decimal point.",
                max
            ),
        }
    }
}

impl std::error::Error for FixedPointError {}

/// A non-negative exact decimal with at most `DIGITS` significant digits,
/// `PLACES` of them after the point.
///
/// Values are stored rescaled to exactly `PLACES` fraction digits, so `45`
/// becomes `45.00`. Serialized as a decimal string.
///
/// # Examples
///
/// ```
/// use tcatalog::domain::Price;
///
/// let price: Price = "19.99".parse().unwrap();
/// assert_eq!(price.to_string(), "19.99");
/// assert!("19.999".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Fixed<const DIGITS: u32, const PLACES: u32>(Decimal);

/// Product price: 10 digits, 2 of them decimal.
pub type Price = Fixed<10, 2>;
/// Detail weight in kilograms: 5 digits, 2 of them decimal.
pub type Weight = Fixed<5, 2>;

impl<const DIGITS: u32, const PLACES: u32> Fixed<DIGITS, PLACES> {
    pub fn new(value: Decimal) -> Result<Self, FixedPointError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(FixedPointError::Negative);
        }

        // Digit accounting follows the written form: 45.00 has four digits, two decimal.
        let decimals = value.scale();
        let significant = value
            .mantissa()
            .unsigned_abs()
            .checked_ilog10()
            .map_or(1, |d| d + 1);
        let digits = significant.max(decimals);
        let whole_digits = digits - decimals;

        if digits > DIGITS {
            return Err(FixedPointError::TooManyDigits { max: DIGITS });
        }
        if decimals > PLACES {
            return Err(FixedPointError::TooManyDecimalPlaces { max: PLACES });
        }
        if whole_digits > DIGITS - PLACES {
            return Err(FixedPointError::TooManyWholeDigits {
                max: DIGITS - PLACES,
            });
        }

        let mut stored = value;
        stored.rescale(PLACES);
        if stored.is_zero() {
            stored.set_sign_positive(true);
        }
        Ok(Self(stored))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl<const DIGITS: u32, const PLACES: u32> FromStr for Fixed<DIGITS, PLACES> {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains('_') {
            return Err(FixedPointError::NotANumber);
        }
        let value = Decimal::from_str(trimmed).map_err(|_| FixedPointError::NotANumber)?;
        Self::new(value)
    }
}

impl<const DIGITS: u32, const PLACES: u32> TryFrom<Decimal> for Fixed<DIGITS, PLACES> {
    type Error = FixedPointError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const DIGITS: u32, const PLACES: u32> From<Fixed<DIGITS, PLACES>> for Decimal {
    fn from(fixed: Fixed<DIGITS, PLACES>) -> Decimal {
        fixed.0
    }
}

impl<const DIGITS: u32, const PLACES: u32> fmt::Display for Fixed<DIGITS, PLACES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: CategoryId,
    #[serde(default)]
    pub tag_ids: BTreeSet<TagId>,
}

/// Technical data for a product. At most one per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: DetailId,
    pub product_id: ProductId,
    pub weight: Weight,
    pub dimensions: String,
    #[serde(default)]
    pub manufacture_date: Option<NaiveDate>,
}

/// A product together with its detail, which may legitimately be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductWithDetail {
    pub product: Product,
    pub detail: Option<ProductDetail>,
}

/// Validated category fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: CategoryId,
    pub tag_ids: BTreeSet<TagId>,
}

/// Validated detail fields. The owning product is supplied at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailDraft {
    pub weight: Weight,
    pub dimensions: String,
    pub manufacture_date: Option<NaiveDate>,
}
