//! Infrastructure services: chain access, signing, fee accounting, the
//! protocol hub client, event decoding, and operator alerts.

pub mod decoder;
pub mod gas;
pub mod notification;
pub mod protocol;
pub mod provider;
pub mod signer;

pub use gas::FeeAccountant;
pub use notification::{AlertSeverity, OperatorAlert, WebhookAlertService};
pub use protocol::{HttpProtocolClient, ProtocolClientTrait};
pub use provider::{ChainProviderTrait, EvmChainProvider};
pub use signer::{LocalRelayerSigner, RelayerSignerTrait, SignedTransaction};

#[cfg(test)]
pub use protocol::MockProtocolClientTrait;
#[cfg(test)]
pub use provider::MockChainProviderTrait;
#[cfg(test)]
pub use signer::MockRelayerSignerTrait;
