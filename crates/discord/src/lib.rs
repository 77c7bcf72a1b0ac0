//! Discord Integration - gateway bot interface
//!
//! This crate provides the chat surface for warboard:
//! - **Gateway** (`gateway`) - event-loop abstraction with reconnection logic
//! - **Commands** (`commands`) - `/reserve`, `/cancel`, `/view` plus the
//!   `!`-prefixed direct-message forms
//! - **Events** (`events`) - slash-command and DM dispatch, channel allow-list
//! - **Messages** (`messages`) - embed builders for replies and the
//!   reservation list
//!
//! The actual Discord wire protocol lives behind the `GatewayTransport`
//! trait; everything in this crate works against that boundary.
//!
//! # Key Types
//!
//! - `GatewayRunner` - event loop with reconnection policy
//! - `EventDispatcher` - routes envelopes to handlers by event type
//! - `CommandRouter` - classifies verbs and calls a `ReservationCommandService`
//! - `MessageBuilder` - constructs reply templates with embeds

pub mod commands;
pub mod events;
pub mod gateway;
pub mod messages;
