mod common;
mod link;
mod ordering;
