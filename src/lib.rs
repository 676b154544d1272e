pub mod api;
pub mod channel;
pub mod cli;
pub mod courier;
pub mod env;
mod error;
pub mod geo;
pub mod i18n;
pub mod map;
pub mod order;
pub mod tracking;

#[cfg(test)]
pub mod test_utils;

pub use error::{ApiError, ChannelError, RouteError, TrackError};
