use std::sync::Arc;

use crate::{
    audit::{AuditLog, PgAuditLog, TracingAuditLog},
    config::PricingConfig,
    db::{DbPool, OrmConn},
    repository::{
        CartRepository, InMemoryStore, OrderRepository, PgStore, ProductRepository,
        UserRepository,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub audit: Arc<dyn AuditLog>,
    pub pricing: PricingConfig,
}

impl AppState {
    pub fn postgres(pool: DbPool, orm: OrmConn, pricing: PricingConfig) -> Self {
        let store = Arc::new(PgStore::new(orm));
        Self {
            users: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            orders: store,
            audit: Arc::new(PgAuditLog::new(pool)),
            pricing,
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>, pricing: PricingConfig) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            orders: store,
            audit: Arc::new(TracingAuditLog),
            pricing,
        }
    }
}
