pub mod comments;
pub mod subjects;
