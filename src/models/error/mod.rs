mod repository;
pub use repository::*;

mod provider;
pub use provider::*;

mod signer;
pub use signer::*;

mod protocol;
pub use protocol::*;

mod executor;
pub use executor::*;

mod decoder;
pub use decoder::*;
