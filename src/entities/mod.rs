//! SeaORM entities backing the storefront pipeline.
//!
//! Catalog and reference tables (products, variants, promotions, delivery
//! zones, payment methods) are admin-managed and keyed by auto-increment
//! integers; transactional rows (cart items, orders, order lines, cards,
//! backorder requests, users) are keyed by UUIDs.

pub mod backorder_request;
pub mod cart_item;
pub mod delivery_zone;
pub mod order;
pub mod order_line;
pub mod payment_method;
pub mod product;
pub mod product_variant;
pub mod promotion;
pub mod promotion_variant;
pub mod simulated_card;
pub mod user;

pub use backorder_request::Entity as BackorderRequest;
pub use cart_item::Entity as CartItem;
pub use delivery_zone::Entity as DeliveryZone;
pub use order::Entity as Order;
pub use order_line::Entity as OrderLine;
pub use payment_method::Entity as PaymentMethod;
pub use product::Entity as Product;
pub use product_variant::Entity as ProductVariant;
pub use promotion::Entity as Promotion;
pub use promotion_variant::Entity as PromotionVariant;
pub use simulated_card::Entity as SimulatedCard;
pub use user::Entity as User;
