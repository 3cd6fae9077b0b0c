//! Log line → typed event decoding.
//!
//! A recognized line looks like `Program log: PaymentMade:<base64>`: the
//! payload segment follows the marker and a `:`, ends at the next whitespace,
//! and is base64 of a JSON object. Decoding is split in two:
//!
//! 1. **Transport**: locate the segment and base64-decode it (shared by all kinds).
//! 2. **Schema**: an [`EventDecoder`] turns the bytes into a [`LoanProgramEvent`].
//!
//! Decoders are registered per marker in a [`DecoderRegistry`], so a new kind
//! plugs in without touching the classification loop.

use std::marker::PhantomData;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::event::{
    AutoRepayment, EventKind, LoanCreated, LoanForgiven, LoanProgramEvent, LoanRepaid, PaymentMade,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no payload segment after marker '{marker}'")]
    MissingPayload { marker: String },

    #[error("payload for '{marker}' is not valid base64: {message}")]
    Transport { marker: String, message: String },

    #[error("payload for '{marker}' does not match the event schema: {message}")]
    Schema { marker: String, message: String },
}

/// Deserializes one event kind from its raw payload bytes.
pub trait EventDecoder: Send + Sync {
    fn kind(&self) -> EventKind;

    fn decode(&self, bytes: &[u8]) -> Result<LoanProgramEvent, DecodeError>;
}

/// Decoder for JSON payloads deserializing into `T`.
pub struct JsonEventDecoder<T> {
    kind: EventKind,
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonEventDecoder<T> {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            _payload: PhantomData,
        }
    }
}

impl<T> EventDecoder for JsonEventDecoder<T>
where
    T: DeserializeOwned + Into<LoanProgramEvent>,
{
    fn kind(&self) -> EventKind {
        self.kind
    }

    fn decode(&self, bytes: &[u8]) -> Result<LoanProgramEvent, DecodeError> {
        serde_json::from_slice::<T>(bytes)
            .map(Into::into)
            .map_err(|e| DecodeError::Schema {
                marker: self.kind.marker().to_string(),
                message: e.to_string(),
            })
    }
}

/// A line that matched a registered marker, with its decode result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub marker: String,
    pub result: Result<LoanProgramEvent, DecodeError>,
}

/// Marker → decoder lookup.
///
/// Markers are tested in registration order; the first one contained in a
/// line wins.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: Vec<(String, Arc<dyn EventDecoder>)>,
}

impl core::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("markers", &self.markers().collect::<Vec<_>>())
            .finish()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with JSON decoders for every [`EventKind`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_kind(JsonEventDecoder::<LoanCreated>::new(EventKind::LoanCreated));
        registry.register_kind(JsonEventDecoder::<PaymentMade>::new(EventKind::PaymentMade));
        registry.register_kind(JsonEventDecoder::<LoanRepaid>::new(EventKind::LoanRepaid));
        registry.register_kind(JsonEventDecoder::<LoanForgiven>::new(EventKind::LoanForgiven));
        registry.register_kind(JsonEventDecoder::<AutoRepayment>::new(EventKind::AutoRepayment));
        registry
    }

    /// Register `decoder` under its kind's canonical marker.
    pub fn register_kind<D>(&mut self, decoder: D) -> &mut Self
    where
        D: EventDecoder + 'static,
    {
        let marker = decoder.kind().marker();
        self.register(marker, decoder)
    }

    /// Register `decoder` under an arbitrary marker, replacing any previous
    /// decoder for the same marker.
    pub fn register<D>(&mut self, marker: impl Into<String>, decoder: D) -> &mut Self
    where
        D: EventDecoder + 'static,
    {
        let marker = marker.into();
        let decoder: Arc<dyn EventDecoder> = Arc::new(decoder);
        match self.decoders.iter_mut().find(|(m, _)| *m == marker) {
            Some(slot) => slot.1 = decoder,
            None => self.decoders.push((marker, decoder)),
        }
        self
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.decoders.iter().map(|(m, _)| m.as_str())
    }

    /// The first registered marker contained in `line`, with its decoder.
    pub fn classify(&self, line: &str) -> Option<(&str, &dyn EventDecoder)> {
        self.decoders
            .iter()
            .find(|(marker, _)| line.contains(marker.as_str()))
            .map(|(marker, decoder)| (marker.as_str(), decoder.as_ref()))
    }

    /// Classify and decode a single line. `None` means no marker matched.
    pub fn decode_line(&self, line: &str) -> Option<DecodedLine> {
        let (marker, decoder) = self.classify(line)?;
        let result = payload_bytes(line, marker).and_then(|bytes| decoder.decode(&bytes));
        Some(DecodedLine {
            marker: marker.to_string(),
            result,
        })
    }
}

/// Locate and base64-decode the payload segment following `marker:`.
///
/// The marker may also appear as plain text earlier in the line; only the
/// `marker:` occurrence carries the payload.
pub fn payload_bytes(line: &str, marker: &str) -> Result<Vec<u8>, DecodeError> {
    let missing = || DecodeError::MissingPayload {
        marker: marker.to_string(),
    };

    let tagged = format!("{marker}:");
    let start = line.find(&tagged).ok_or_else(missing)? + tagged.len();
    let segment = line[start..]
        .split_whitespace()
        .next()
        .ok_or_else(missing)?;

    STANDARD.decode(segment).map_err(|e| DecodeError::Transport {
        marker: marker.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanledger_core::LoanId;

    fn line(marker: &str, json: &str) -> String {
        format!("Program log: {marker}:{}", STANDARD.encode(json))
    }

    #[test]
    fn decodes_payment_made_line() {
        let registry = DecoderRegistry::with_defaults();
        let l = line(
            "PaymentMade",
            r#"{"loanId":3,"amount":5000000,"oldCreditScore":700,"newCreditScore":710,"remainingPrincipal":45000000,"paymentNumber":2}"#,
        );

        let decoded = registry.decode_line(&l).unwrap();
        assert_eq!(decoded.marker, "PaymentMade");
        match decoded.result.unwrap() {
            LoanProgramEvent::PaymentMade(p) => {
                assert_eq!(p.loan_id, LoanId::new(3));
                assert_eq!(p.amount, 5_000_000);
                assert_eq!(p.payment_number, Some(2));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unrecognized_lines_are_not_classified() {
        let registry = DecoderRegistry::with_defaults();
        assert!(registry.decode_line("Program log: Instruction: MakeRepayment").is_none());
        assert!(registry.decode_line("").is_none());
    }

    #[test]
    fn marker_without_payload_is_missing_payload() {
        let registry = DecoderRegistry::with_defaults();
        let decoded = registry.decode_line("Program log: LoanRepaid").unwrap();
        assert!(matches!(decoded.result, Err(DecodeError::MissingPayload { .. })));
    }

    #[test]
    fn invalid_base64_is_transport_error() {
        let registry = DecoderRegistry::with_defaults();
        let decoded = registry.decode_line("Program log: LoanCreated:%%%not-base64").unwrap();
        assert!(matches!(decoded.result, Err(DecodeError::Transport { .. })));
    }

    #[test]
    fn wrong_shape_is_schema_error() {
        let registry = DecoderRegistry::with_defaults();
        let decoded = registry
            .decode_line(&line("LoanCreated", r#"{"loanId":"nope"}"#))
            .unwrap();
        assert!(matches!(decoded.result, Err(DecodeError::Schema { .. })));
    }

    #[test]
    fn payload_segment_stops_at_whitespace() {
        let encoded = STANDARD.encode(r#"{"loanId":1,"totalRepaid":10}"#);
        let l = format!("Program log: LoanRepaid:{encoded} trailing words");
        assert_eq!(
            payload_bytes(&l, "LoanRepaid").unwrap(),
            br#"{"loanId":1,"totalRepaid":10}"#.to_vec()
        );
    }

    #[test]
    fn decodes_auto_repayment_line() {
        let registry = DecoderRegistry::with_defaults();
        let l = line(
            "AutoRepayment",
            r#"{"loanId":4,"revenueAmount":50000000,"repaymentAmount":5000000,"timestamp":1700000000}"#,
        );

        let decoded = registry.decode_line(&l).unwrap();
        assert_eq!(decoded.marker, "AutoRepayment");
        match decoded.result.unwrap() {
            LoanProgramEvent::AutoRepayment(a) => {
                assert_eq!(a.loan_id, LoanId::new(4));
                assert_eq!(a.revenue_amount, 50_000_000);
                assert_eq!(a.repayment_amount, 5_000_000);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn payload_follows_the_tagged_marker_not_the_first_mention() {
        let registry = DecoderRegistry::with_defaults();
        let encoded = STANDARD.encode(r#"{"loanId":6,"amount":1000000,"remainingPrincipal":0}"#);
        let l = format!("Program log: emitting PaymentMade event PaymentMade:{encoded}");

        let decoded = registry.decode_line(&l).unwrap();
        assert_eq!(decoded.result.unwrap().loan_id(), LoanId::new(6));
    }

    /// Off-chain manual payments logged by an operator tool.
    struct ManualPaymentDecoder;

    impl EventDecoder for ManualPaymentDecoder {
        fn kind(&self) -> EventKind {
            EventKind::PaymentMade
        }

        fn decode(&self, bytes: &[u8]) -> Result<LoanProgramEvent, DecodeError> {
            #[derive(serde::Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct ManualPayment {
                loan_id: LoanId,
                paid: u64,
            }
            let m: ManualPayment = serde_json::from_slice(bytes).map_err(|e| DecodeError::Schema {
                marker: "ManualPayment".into(),
                message: e.to_string(),
            })?;
            Ok(LoanProgramEvent::PaymentMade(PaymentMade {
                loan_id: m.loan_id,
                amount: m.paid,
                fee: 0,
                old_credit_score: None,
                new_credit_score: None,
                remaining_principal: 0,
                payment_number: None,
                timestamp: None,
            }))
        }
    }

    #[test]
    fn new_markers_register_without_touching_dispatch() {
        let mut registry = DecoderRegistry::with_defaults();
        registry.register("ManualPayment", ManualPaymentDecoder);

        let l = line("ManualPayment", r#"{"loanId":9,"paid":1000000}"#);
        let decoded = registry.decode_line(&l).unwrap();
        assert_eq!(decoded.marker, "ManualPayment");
        assert_eq!(decoded.result.unwrap().kind(), EventKind::PaymentMade);
        assert_eq!(registry.markers().count(), 6);
    }

    #[test]
    fn registering_same_marker_replaces_decoder() {
        let mut registry = DecoderRegistry::with_defaults();
        registry.register("PaymentMade", ManualPaymentDecoder);
        assert_eq!(registry.markers().count(), 5);
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_lines_never_panic(l in ".*") {
            let registry = DecoderRegistry::with_defaults();
            let _ = registry.decode_line(&l);
        }

        #[test]
        fn arbitrary_payloads_after_marker_never_panic(tail in "\\PC*") {
            let registry = DecoderRegistry::with_defaults();
            let l = format!("Program log: PaymentMade{tail}");
            let decoded = registry.decode_line(&l);
            proptest::prop_assert!(decoded.is_some());
        }
    }
}
