//! Chess domain for the real-time variant: boards, pieces, pure move
//! geometry and the shared admission oracle.

pub mod board;
pub mod core;
pub mod geometry;
pub mod legality;
