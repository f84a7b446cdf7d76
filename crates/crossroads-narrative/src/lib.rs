//! Crossroads: music adventure context.
//!
//! An adventure is a tree of albums and musical directions in alternation.
//! This crate replays any path through it into a generation transcript,
//! grows it from generator replies, and stores it as a single document.

pub mod application;
pub mod domain;
