//! Mailchimp integration: campaigns, list subscriptions and member paging.

mod api;
mod client;
mod hash;
mod members;
mod retry;

pub use api::{MailchimpApi, MarketingApi, datacenter_url};
pub use client::MailchimpClient;
pub use hash::email_hash;
pub use members::ListMembers;
pub use retry::with_timeout_retry;

/// Service tag for timing records.
pub const SERVICE_NAME: &str = "Mailchimp";

/// Default number of members requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;
