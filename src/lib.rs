#![deny(clippy::uninlined_format_args, clippy::to_string_in_format_args)]

pub use crate::{
    command::register_commands,
    keyspace::FastHashMap,
    range::{RangeError, RangeSpec},
    skiplist::{Iter, RangeIter, ScoreIter, SkipList, MAX_LEVEL},
    token::{Token, MAX_STRING, MIN_STRING},
};

mod command;
pub mod keyspace;
mod memory;
mod range;
mod skiplist;
mod token;
pub use keyspace as sets;
