pub mod auth;
pub mod cart;
pub mod feedback;
pub mod orders;
pub mod products;
pub mod vouchers;
