mod contract_call_event;
pub use contract_call_event::*;

mod message_approved;
pub use message_approved::*;

mod gas_payment;
pub use gas_payment::*;

mod chain_event;
pub use chain_event::*;

mod protocol;
pub use protocol::*;

mod error;
pub use error::*;

mod app_state;
pub use app_state::*;
