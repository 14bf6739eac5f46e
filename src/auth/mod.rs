mod credentials;
mod gate;
mod token;

pub use credentials::{hash_password, validate_credentials, AuthError, Credentials};
pub use gate::{resolve_identity, AuthenticatedUser};
pub use token::{Claims, InvalidToken, TokenKeys};
