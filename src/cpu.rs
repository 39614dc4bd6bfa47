/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Building blocks of the register file: flags, register pairs and op-code bit parsers.
mod flags;
mod parse;
mod registers;

pub use flags::*;
pub use parse::*;
pub use registers::*;
