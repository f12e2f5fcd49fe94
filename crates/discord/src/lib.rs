//! Discord adapter for suggestbox, built on serenity.
//!
//! - [`DiscordGateway`] implements the outbound `ChatGateway` over serenity's HTTP client.
//! - [`DiscordTransport`] runs the serenity gateway client and feeds message and button events
//!   to the runner as `ChatEnvelope`s.

mod convert;
mod gateway;
mod transport;

pub use gateway::DiscordGateway;
pub use transport::DiscordTransport;
