pub mod credential;

pub use credential::{hash_credential, verify_credential, Credential, CredentialHash};
