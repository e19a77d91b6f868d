pub mod aead;
pub mod types;

pub use aead::Encryptor;
pub use types::*;
