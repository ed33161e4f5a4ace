//! Clients for the services auth-service depends on.

mod user_client;

pub use user_client::{UserClient, UserServiceClient};

#[cfg(any(test, feature = "test-utils"))]
pub use user_client::MockUserServiceClient;
