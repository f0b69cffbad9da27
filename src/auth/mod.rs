pub mod authority;
pub mod blocklist;
pub mod claims;
pub mod middleware;
pub mod outcome;

pub use authority::{Credential, TokenAuthority, TokenError, TokenPair};
pub use blocklist::{InMemoryBlocklist, RevocationError, RevocationStore};
pub use claims::{Claims, TokenType};
pub use outcome::{Identity, Outcome, Rejection, Requirement};
