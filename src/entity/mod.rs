pub mod addresses;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod enums;
pub mod guests;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod product_variants;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlists;

pub use addresses::Entity as Addresses;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use coupons::Entity as Coupons;
pub use guests::Entity as Guests;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
pub use wishlists::Entity as Wishlists;
