/// Identifier assigned by the upstream notification queue.
pub type DbId = i64;
