//! A REST backend for a video-sharing platform: account management with
//! signed access/refresh tokens, video publishing through a remote media
//! host, comments, likes, playlists and short text posts.

pub mod auth;
pub mod config;
pub mod media;
pub mod models;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod tokens;
pub mod utils;
