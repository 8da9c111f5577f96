//! Realtime broadcast layer for community posts, comments, challenges and
//! direct messages.
//!
//! Connections are tracked by [`session::SessionTracker`], grouped into rooms by
//! [`room::RoomRegistry`], and every inbound event goes through
//! [`router::EventRouter`], which commits changes to a [`store::CommunityStore`]
//! before fanning the result out.

pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod room;
pub mod router;
pub mod routes;
pub mod server;
pub mod session;
pub mod store;
