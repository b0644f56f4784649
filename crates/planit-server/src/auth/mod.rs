mod jwt;
mod middleware;
mod password;
mod session;

pub use jwt::{create_token, verify_token, Claims};
pub use middleware::{auth_middleware, enterprise_middleware, AccountRow, AuthUser};
pub use password::{hash_password, verify_password};
pub use session::{bearer_token, clear_session_cookie, cookie_token, session_cookie};
