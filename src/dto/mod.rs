pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlist;
