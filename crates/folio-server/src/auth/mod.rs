mod jwt;
mod middleware;

pub use jwt::verify_access_token;
pub use middleware::{auth_middleware, AuthUser};
