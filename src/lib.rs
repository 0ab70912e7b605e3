pub mod commands;
pub mod formats;
pub mod http;
pub mod logger;
pub mod mailchimp;
pub mod runtime;
pub mod session;
pub mod status;
pub mod timing;
