//! # Terminal Interfaces Module
//!
//! This module provides interfaces for interacting with the project
//! through a terminal emulator.

pub mod cli;
