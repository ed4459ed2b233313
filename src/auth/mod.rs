/// Authentication module
///
/// Token claims, the sign/verify/decode codec, pair issuance, and
/// password hashing.

mod claims;
mod issuer;
mod password;
mod token;

pub use claims::Claims;
pub use claims::IdentityClaim;
pub use claims::REFRESH_TOKEN_TYPE;
pub use issuer::TokenIssuer;
pub use issuer::TokenPair;
pub use password::hash_password;
pub use password::verify_password;
pub use token::decode_unverified;
pub use token::sign;
pub use token::verify;
pub use token::TokenError;
