//! Versioned order draft carried through checkout session metadata.
//!
//! The draft is built from the cart when checkout starts, serialized into the
//! payment provider's session metadata, and decoded again when the session is
//! confirmed. The provider stores it opaquely between the two requests, so the
//! schema carries an explicit `version`.
//!
//! Metadata values are limited to [`METADATA_VALUE_LIMIT`] characters, so the
//! encoded JSON is split across numbered keys:
//!
//! ```text
//! order_data_chunks = "2"
//! order_data_0      = "{\"version\":1,\"customer\":{..."
//! order_data_1      = "...}]}"
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ContactError, CustomerContact, DiscountCodeId, ProductId};

/// Current draft schema version.
pub const DRAFT_VERSION: u32 = 1;

/// Maximum length of a single metadata value at the payment provider.
pub const METADATA_VALUE_LIMIT: usize = 500;

/// Maximum number of metadata keys the draft may occupy.
///
/// The provider allows 50 keys per object; a handful are reserved for the
/// payment method and discount bookkeeping.
pub const MAX_DRAFT_CHUNKS: usize = 40;

/// Metadata key holding the number of draft chunks.
pub const CHUNK_COUNT_KEY: &str = "order_data_chunks";

const CHUNK_KEY_PREFIX: &str = "order_data_";

/// Errors from validating or decoding an [`OrderDraft`].
#[derive(thiserror::Error, Debug)]
pub enum DraftError {
    #[error("invalid customer details: {0}")]
    Contact(#[from] ContactError),
    #[error("order has no items")]
    NoItems,
    #[error("quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),
    #[error("price for product {0} cannot be negative")]
    NegativePrice(ProductId),
    #[error("order total cannot be negative")]
    NegativeTotal,
    #[error("order draft is too large for session metadata ({0} chunks)")]
    TooLarge(usize),
    #[error("session metadata is missing {0}")]
    MissingMetadata(String),
    #[error("unsupported order draft version {0}")]
    UnsupportedVersion(u32),
    #[error("malformed order draft: {0}")]
    Malformed(#[from] serde_json::Error),
}

const fn current_version() -> u32 {
    DRAFT_VERSION
}

/// One line of the draft: what was bought, how many, at what unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraftItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// Client-assembled, unverified description of an intended purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default = "current_version")]
    pub version: u32,
    pub customer: CustomerContact,
    pub items: Vec<OrderDraftItem>,
    pub total: Decimal,
    #[serde(default)]
    pub discount_code_id: Option<DiscountCodeId>,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub card_discount_percentage: Option<Decimal>,
}

impl OrderDraft {
    /// Check the draft is internally sane before it is sent to the provider.
    ///
    /// The total is *not* reconciled against the items here; the confirmed
    /// provider amount is what the order records.
    ///
    /// # Errors
    ///
    /// Returns the first [`DraftError`] found.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.version != DRAFT_VERSION {
            return Err(DraftError::UnsupportedVersion(self.version));
        }
        self.customer.validate()?;
        if self.items.is_empty() {
            return Err(DraftError::NoItems);
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(DraftError::InvalidQuantity(item.product_id));
            }
            if item.price.is_sign_negative() && !item.price.is_zero() {
                return Err(DraftError::NegativePrice(item.product_id));
            }
        }
        if self.total.is_sign_negative() && !self.total.is_zero() {
            return Err(DraftError::NegativeTotal);
        }
        Ok(())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether any discount (code or card) went into the total.
    #[must_use]
    pub const fn discount_applied(&self) -> bool {
        self.discount_code_id.is_some() || self.card_discount_percentage.is_some()
    }

    /// Encode into metadata entries, chunked to fit the provider's limits.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::TooLarge`] if more than [`MAX_DRAFT_CHUNKS`] are needed.
    pub fn to_metadata(&self) -> Result<BTreeMap<String, String>, DraftError> {
        let json = serde_json::to_string(self)?;
        let chunks = chunk_str(&json, METADATA_VALUE_LIMIT);
        if chunks.len() > MAX_DRAFT_CHUNKS {
            return Err(DraftError::TooLarge(chunks.len()));
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(CHUNK_COUNT_KEY.to_owned(), chunks.len().to_string());
        for (index, chunk) in chunks.into_iter().enumerate() {
            metadata.insert(format!("{CHUNK_KEY_PREFIX}{index}"), chunk);
        }
        Ok(metadata)
    }

    /// Reassemble and decode a draft from session metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::MissingMetadata`] if a chunk is absent,
    /// [`DraftError::Malformed`] if the JSON does not parse, and
    /// [`DraftError::UnsupportedVersion`] for drafts from another schema.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Result<Self, DraftError> {
        let count: usize = metadata
            .get(CHUNK_COUNT_KEY)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| DraftError::MissingMetadata(CHUNK_COUNT_KEY.to_owned()))?;
        if count > MAX_DRAFT_CHUNKS {
            return Err(DraftError::TooLarge(count));
        }

        let mut json = String::new();
        for index in 0..count {
            let key = format!("{CHUNK_KEY_PREFIX}{index}");
            let chunk = metadata
                .get(&key)
                .ok_or(DraftError::MissingMetadata(key))?;
            json.push_str(chunk);
        }

        let draft: Self = serde_json::from_str(&json)?;
        if draft.version != DRAFT_VERSION {
            return Err(DraftError::UnsupportedVersion(draft.version));
        }
        Ok(draft)
    }
}

/// Split on char boundaries into pieces of at most `limit` bytes.
fn chunk_str(s: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::with_capacity(limit);
    for ch in s.chars() {
        if current.len() + ch.len_utf8() > limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
