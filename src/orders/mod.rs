pub mod outcome;
pub mod parse;
pub mod record;
