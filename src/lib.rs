//! CropCare: a mock crop-diagnosis chat.
//!
//! Replies are canned text picked by keyword (or at random for photos); the
//! interesting parts are the turn-taking in [`controller`] and the camera
//! resource handling in [`capture`].

pub mod capture;
pub mod config;
pub mod controller;
pub mod responses;
pub mod session;
pub mod types;
pub mod ui;
pub mod views;
