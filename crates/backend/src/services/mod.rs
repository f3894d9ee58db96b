//! Service layer: the checkout workflow and the cached entity services.
//!
//! Services own the invalidation half of the cache contract: every mutating
//! operation deletes the entity's exact key and the list prefixes that could
//! contain it, synchronously, after its transaction commits.

pub mod carts;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod profiles;

pub use carts::CartService;
pub use checkout::CheckoutOrchestrator;
pub use inventory::InventoryLedger;
pub use orders::OrderService;
pub use products::ProductService;
pub use profiles::ProfileService;
