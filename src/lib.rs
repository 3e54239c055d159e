//! # subswarm
//!
//! `subswarm` keeps a pool of simulated users connected to a realtime
//! broker. Every user holds a websocket connection and a subscription to its
//! own private channel, and the pool grows and shrinks through a small HTTP
//! control API. It is meant for putting realistic subscriber load on a
//! broker and watching how many sessions stay connected and subscribed.
//!
//! ## Core Modules
//!
//! - `registry`: the concurrent map of live sessions, their status flags and
//!   the cancellation of their workers.
//! - `worker`: the per-session task driving one realtime connection.
//! - `transport`: the websocket client speaking the broker's JSON protocol.
//! - `api`: the control intents and their HTTP routes.
//! - `report`: the periodic counters log.
//! - `config`: loading settings from files and the environment.
//! - `utils`: error types and logging setup.

pub mod api;
pub mod config;
pub mod registry;
pub mod report;
pub mod transport;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;
