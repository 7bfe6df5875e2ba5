pub mod audit_logs;
pub mod cart_items;
pub mod orders;
pub mod products;
pub mod questionnaires;
pub mod reviews;
pub mod users;
pub mod vouchers;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use questionnaires::Entity as Questionnaires;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
pub use vouchers::Entity as Vouchers;
