//! Authoritative engine for real-time simultaneous-move chess: all players
//! issue moves concurrently, pieces travel squares over discrete ticks with
//! post-move cooldowns, and captures resolve through positional collision
//! rather than turn-based replacement.
//!
//! The crate is organized leaves-first:
//!
//! - [`chess`] — boards, pieces, pure move geometry and the shared admission
//!   oracle;
//! - [`game`] — the mutable game state and the fixed-step tick processor;
//! - [`protocol`] — snapshot/update deltas, the consumer-side mirror and
//!   replays;
//! - [`engine`] — the per-game driver thread with its command mailbox and
//!   event fan-out.
//!
//! Lobby, identity, ratings, storage and rendering live outside; they speak
//! to the core only through [`engine`] commands and events.

#![warn(missing_docs, variant_size_differences)]
// Rustc lints.
#![warn(
    absolute_paths_not_starting_with_crate,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]
// Rustdoc lints.
#![warn(
    rustdoc::private_doc_tests,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls
)]
// Clippy lints.
#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
// The tick loop runs at a fixed rate, but collision resolution sits on its
// hot path for every in-flight piece.
#![deny(clippy::perf)]

pub mod chess;
pub mod engine;
pub mod game;
pub mod protocol;
