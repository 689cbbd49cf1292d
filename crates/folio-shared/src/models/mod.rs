mod comment;
mod subject;

pub use comment::*;
pub use subject::*;
