//! Retail domain layer: customers, products, orders, and proof-of-payment
//! uploads, stored as versioned rows in fixed table partitions.

mod customer;
mod money;
mod order;
mod product;
mod reference;
mod upload;

pub use customer::{Customer, CustomerDirectory, CustomerError, NewCustomer};
pub use money::Money;
pub use order::Order;
pub use product::{Product, ProductCatalog, ProductError};
pub use reference::{
    CustomerSummary, ProductSummary, ReferenceData, CUSTOMER_LIST_TTL, PRODUCT_LIST_TTL,
};
pub use upload::{NewUpload, UploadError, UploadRecord, UploadService, PROOF_CONTAINER};
