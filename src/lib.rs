//! Codereel - Code extraction from programming tutorial videos
//!
//! Downloads a video and its subtitle track, samples frames, runs OCR on
//! them and asks a language model to reconcile the on-screen text with
//! what is being said into one consolidated source listing.

pub mod cli;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod fetch;
pub mod media;
pub mod ocr;
pub mod progress;
pub mod transcript;
pub mod workflow;
