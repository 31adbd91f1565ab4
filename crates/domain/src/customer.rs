//! Customer entity and registration service.

use common::EntityId;
use serde::{Deserialize, Serialize};
use storage::{RetryPolicy, StorageError, TableEntity, TableStore, TypedTable};
use thiserror::Error;

/// A registered customer. Identity fields are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub address: String,
    pub username: String,
}

impl Customer {
    /// Full name used for order snapshots and display lists.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}

impl TableEntity for Customer {
    const PARTITION: &'static str = "Customer";

    fn row_key(&self) -> String {
        self.id.to_string()
    }
}

/// Input for registering a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub address: String,
    pub username: String,
}

/// Errors that can occur during customer operations.
#[derive(Debug, Error)]
pub enum CustomerError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// The email address is not plausibly valid.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Another customer already uses this username or email.
    #[error("Username or email already exists")]
    DuplicateIdentity,

    /// Customer not found.
    #[error("Customer not found: {0}")]
    NotFound(EntityId),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Customer registration and lookup over the `"Customer"` partition.
#[derive(Clone)]
pub struct CustomerDirectory<S> {
    table: TypedTable<Customer, S>,
    retry: RetryPolicy,
}

impl<S: TableStore + Clone> CustomerDirectory<S> {
    /// Creates a directory with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    /// Creates a directory with an explicit retry policy.
    pub fn with_retry(store: S, retry: RetryPolicy) -> Self {
        Self {
            table: TypedTable::new(store),
            retry,
        }
    }

    /// Registers a new customer.
    ///
    /// The username/email duplicate check is a scan-then-insert with no
    /// store-level uniqueness constraint, so it is best-effort only: two
    /// concurrent registrations with the same username can both pass the
    /// scan.
    #[tracing::instrument(skip(self, new), fields(username = %new.username))]
    pub async fn register(&self, new: NewCustomer) -> Result<Customer, CustomerError> {
        validate_required("first_name", &new.first_name)?;
        validate_required("surname", &new.surname)?;
        validate_required("email", &new.email)?;
        validate_required("address", &new.address)?;
        validate_required("username", &new.username)?;
        if !new.email.contains('@') {
            return Err(CustomerError::InvalidEmail(new.email));
        }

        let existing = self.retry.run(|| self.table.list()).await?;
        if existing
            .iter()
            .any(|c| c.entity.username == new.username || c.entity.email == new.email)
        {
            return Err(CustomerError::DuplicateIdentity);
        }

        let customer = Customer {
            id: EntityId::new(),
            first_name: new.first_name,
            surname: new.surname,
            email: new.email,
            address: new.address,
            username: new.username,
        };
        self.retry.run(|| self.table.insert(&customer)).await?;

        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok(customer)
    }

    /// Fetches a customer by ID.
    pub async fn get(&self, id: EntityId) -> Result<Customer, CustomerError> {
        let key = id.to_string();
        match self.retry.run(|| self.table.get(&key)).await {
            Ok(versioned) => Ok(versioned.entity),
            Err(StorageError::NotFound { .. }) => Err(CustomerError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists all customers.
    pub async fn list(&self) -> Result<Vec<Customer>, CustomerError> {
        let rows = self.retry.run(|| self.table.list()).await?;
        Ok(rows.into_iter().map(|row| row.entity).collect())
    }
}

fn validate_required(field: &'static str, value: &str) -> Result<(), CustomerError> {
    if value.trim().is_empty() {
        return Err(CustomerError::MissingField { field });
    }
    Ok(())
}
