mod common;
mod flags;
mod outcome;
