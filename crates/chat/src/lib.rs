//! Chat-platform interface for suggestbox
//!
//! This crate is platform-neutral; concrete adapters implement its two seams:
//! - **Gateway** (`gateway`) - outbound platform operations and the timeout wrapper
//! - **Runner** (`runner`) - inbound event loop over a `GatewayTransport` with reconnection logic
//! - **Events** (`events`) - envelopes, handler trait and dispatcher
//! - **Templates** (`templates`) - suggestion posts, vote buttons and companion messages
//! - **Suggestions** (`suggestions`) - submission intake and vote handling
//!
//! # Architecture
//!
//! ```text
//! Transport → GatewayRunner → EventDispatcher → Intake / Vote handlers → VoteLedger
//!                                                       ↓
//!                                    TimeoutGateway → ChatGateway (platform adapter)
//! ```

pub mod events;
pub mod gateway;
pub mod runner;
pub mod suggestions;
pub mod templates;
