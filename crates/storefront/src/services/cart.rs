//! Session-backed cart storage.
//!
//! The visitor's cart lives in their server-side session, under the same two
//! keys the cart state holder persists: items and the applied discount.

use tower_sessions::Session;

use timberline_core::cart::{DISCOUNT_KEY, ITEMS_KEY};
use timberline_core::{AppliedDiscount, CartItem, CartStorage, PersistentCart};

/// [`CartStorage`] over a `tower-sessions` session.
#[derive(Debug, Clone)]
pub struct SessionCartStorage(Session);

/// A cart bound to the current visitor's session.
pub type SessionCart = PersistentCart<SessionCartStorage>;

impl SessionCartStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }
}

impl CartStorage for SessionCartStorage {
    type Error = tower_sessions::session::Error;

    async fn load_items(&self) -> Result<Option<Vec<CartItem>>, Self::Error> {
        self.0.get(ITEMS_KEY).await
    }

    async fn save_items(&self, items: &[CartItem]) -> Result<(), Self::Error> {
        self.0.insert(ITEMS_KEY, items).await
    }

    async fn load_discount(&self) -> Result<Option<AppliedDiscount>, Self::Error> {
        self.0.get(DISCOUNT_KEY).await
    }

    async fn save_discount(&self, discount: Option<&AppliedDiscount>) -> Result<(), Self::Error> {
        match discount {
            Some(discount) => self.0.insert(DISCOUNT_KEY, discount).await,
            None => self.0.remove_value(DISCOUNT_KEY).await.map(|_| ()),
        }
    }
}

/// Load the visitor's cart from their session.
///
/// # Errors
///
/// Returns the session error if stored cart data cannot be read.
pub async fn load(session: Session) -> Result<SessionCart, tower_sessions::session::Error> {
    PersistentCart::load(SessionCartStorage::new(session)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;
    use timberline_core::{DiscountCodeId, DiscountKind, ProductId};

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_items_and_discount_use_separate_keys() {
        let session = session();
        let mut cart = load(session.clone()).await.unwrap();
        cart.add_item(CartItem {
            product_id: ProductId::new(),
            name: "Walnut side table".to_owned(),
            price: Decimal::from(240),
            image: Some("/img/side-table.jpg".to_owned()),
            quantity: 1,
        })
        .await
        .unwrap();
        cart.apply_discount(AppliedDiscount {
            id: DiscountCodeId::new(),
            code: "WALNUT".to_owned(),
            kind: DiscountKind::Fixed,
            value: Decimal::from(40),
        })
        .await
        .unwrap();

        let items: Vec<CartItem> = session.get(ITEMS_KEY).await.unwrap().unwrap();
        assert_eq!(items.len(), 1);
        let discount: AppliedDiscount = session.get(DISCOUNT_KEY).await.unwrap().unwrap();
        assert_eq!(discount.code, "WALNUT");

        cart.remove_discount().await.unwrap();
        let discount: Option<AppliedDiscount> = session.get(DISCOUNT_KEY).await.unwrap();
        assert!(discount.is_none());
        let reloaded = load(session).await.unwrap();
        assert_eq!(reloaded.cart().total_price(), Decimal::from(240));
    }
}
