//! Typed decoding of gateway, gas-service and token-service events.
//!
//! ABI internals stay contained here: the rest of the pipeline only ever
//! sees [`DecodedEvent`] variants. Matching is on the leading topic; events
//! outside the allow-list come back as [`DecodeError::UnknownEvent`] and are
//! skipped by the classifier.

use alloy::{
    primitives::{Log, LogData},
    sol,
    sol_types::SolEvent,
};

use crate::models::{
    ContractCallData, DecodeError, DecodedEvent, GasAddedData, GasPaidData, ItsDeploymentStartedData,
    ItsTransferData, MessageApprovedData, MessageExecutedData, RawChainEvent, RefundedData,
    SignersRotatedData,
};

sol! {
    event ContractCall(
        address indexed sender,
        string destinationChain,
        string destinationContractAddress,
        bytes32 indexed payloadHash,
        bytes payload
    );

    event MessageApproved(
        bytes32 indexed commandId,
        string sourceChain,
        string messageId,
        string sourceAddress,
        address indexed contractAddress,
        bytes32 indexed payloadHash,
        bytes payload
    );

    event MessageExecuted(
        bytes32 indexed commandId,
        string sourceChain,
        string messageId
    );

    event SignersRotated(uint256 indexed epoch, bytes32 signersHash);

    event NativeGasPaidForContractCall(
        address indexed sourceAddress,
        string destinationChain,
        string destinationAddress,
        bytes32 indexed payloadHash,
        uint256 gasFeeAmount,
        address refundAddress
    );

    event NativeGasAdded(
        bytes32 indexed payloadHash,
        uint256 gasFeeAmount,
        address refundAddress
    );

    event Refunded(
        bytes32 indexed payloadHash,
        address receiver,
        address token,
        uint256 amount
    );

    event InterchainTransfer(
        bytes32 indexed tokenId,
        address indexed sourceAddress,
        string destinationChain,
        uint256 amount
    );

    event InterchainTokenDeploymentStarted(
        bytes32 indexed tokenId,
        string tokenName,
        string tokenSymbol,
        uint8 tokenDecimals,
        string destinationChain
    );
}

fn to_primitive_log(raw: &RawChainEvent) -> Result<Log, DecodeError> {
    LogData::new(raw.topics.clone(), raw.data.clone())
        .map(|data| Log {
            address: raw.address,
            data,
        })
        .ok_or_else(|| DecodeError::MalformedData("Too many topics".to_string()))
}

/// Decodes a raw log into a typed [`DecodedEvent`].
pub fn decode(raw: &RawChainEvent) -> Result<DecodedEvent, DecodeError> {
    let topic0 = raw
        .topics
        .first()
        .ok_or_else(|| DecodeError::MalformedData("Missing leading topic".to_string()))?;
    let log = to_primitive_log(raw)?;
    let malformed = |e: alloy::sol_types::Error| DecodeError::MalformedData(e.to_string());

    match *topic0 {
        t if t == ContractCall::SIGNATURE_HASH => {
            let event = ContractCall::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::ContractCall(ContractCallData {
                source_address: event.sender,
                destination_chain: event.destinationChain.clone(),
                destination_address: event.destinationContractAddress.clone(),
                payload_hash: event.payloadHash,
                payload: event.payload.clone(),
            }))
        }
        t if t == MessageApproved::SIGNATURE_HASH => {
            let event = MessageApproved::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::MessageApproved(MessageApprovedData {
                source_chain: event.sourceChain.clone(),
                message_id: event.messageId.clone(),
                source_address: event.sourceAddress.clone(),
                contract_address: event.contractAddress,
                payload_hash: event.payloadHash,
                payload: event.payload.clone(),
            }))
        }
        t if t == MessageExecuted::SIGNATURE_HASH => {
            let event = MessageExecuted::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::MessageExecuted(MessageExecutedData {
                source_chain: event.sourceChain.clone(),
                message_id: event.messageId.clone(),
            }))
        }
        t if t == SignersRotated::SIGNATURE_HASH => {
            let event = SignersRotated::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::SignersRotated(SignersRotatedData {
                epoch: event.epoch.try_into().unwrap_or(u64::MAX),
                signers_hash: event.signersHash,
            }))
        }
        t if t == NativeGasPaidForContractCall::SIGNATURE_HASH => {
            let event = NativeGasPaidForContractCall::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::GasPaid(GasPaidData {
                source_address: event.sourceAddress,
                destination_chain: event.destinationChain.clone(),
                destination_address: event.destinationAddress.clone(),
                payload_hash: event.payloadHash,
                gas_token: None,
                gas_value: event.gasFeeAmount,
                refund_address: event.refundAddress,
            }))
        }
        t if t == NativeGasAdded::SIGNATURE_HASH => {
            let event = NativeGasAdded::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::GasAdded(GasAddedData {
                payload_hash: event.payloadHash,
                gas_token: None,
                gas_value: event.gasFeeAmount,
                refund_address: event.refundAddress,
            }))
        }
        t if t == Refunded::SIGNATURE_HASH => {
            let event = Refunded::decode_log(&log, true).map_err(malformed)?;
            let token = if event.token.is_zero() {
                None
            } else {
                Some(event.token.to_string())
            };
            Ok(DecodedEvent::Refunded(RefundedData {
                payload_hash: event.payloadHash,
                receiver: event.receiver,
                token,
                amount: event.amount,
            }))
        }
        t if t == InterchainTransfer::SIGNATURE_HASH => {
            let event = InterchainTransfer::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::ItsInterchainTransfer(ItsTransferData {
                token_id: event.tokenId,
                source_address: event.sourceAddress,
                destination_chain: event.destinationChain.clone(),
                amount: event.amount,
            }))
        }
        t if t == InterchainTokenDeploymentStarted::SIGNATURE_HASH => {
            let event = InterchainTokenDeploymentStarted::decode_log(&log, true).map_err(malformed)?;
            Ok(DecodedEvent::ItsDeploymentStarted(ItsDeploymentStartedData {
                token_id: event.tokenId,
                destination_chain: event.destinationChain.clone(),
                token_name: event.tokenName.clone(),
                token_symbol: event.tokenSymbol.clone(),
                decimals: event.tokenDecimals,
            }))
        }
        t => Err(DecodeError::UnknownEvent(format!("{:#x}", t))),
    }
}
