pub mod activity;
pub mod auth;
pub mod client;
pub mod management_groups;
pub mod resources;
pub mod subscriptions;

pub use auth::{acquire_token, Credential};
pub use client::ArmClient;
pub use management_groups::ManagementGroupIndex;
pub use resources::ResourceInventory;
pub use subscriptions::Subscription;
