//! Record and enum tables of the `pruntime_rpc` package.
//!
//! Field numbers follow declaration order. Fields marked optional carry
//! explicit presence: unset and set-to-empty are different states.

use pruntime_wire::{EnumSchema, EnumValue, FieldDescriptor as F, FieldKind as K, MessageSchema};

// =========================================================================
// Enums
// =========================================================================

pub static GATEKEEPER_ROLE: EnumSchema = EnumSchema {
    name: "GatekeeperRole",
    values: &[
        EnumValue::new("None", 0),
        EnumValue::new("Dummy", 1),
        EnumValue::new("Active", 2),
    ],
};

pub static SIGNATURE_TYPE: EnumSchema = EnumSchema {
    name: "SignatureType",
    values: &[
        EnumValue::new("Ed25519", 0),
        EnumValue::new("Sr25519", 1),
        EnumValue::new("Ecdsa", 2),
        EnumValue::new("Ed25519WrapBytes", 3),
        EnumValue::new("Sr25519WrapBytes", 4),
        EnumValue::new("EcdsaWrapBytes", 5),
    ],
};

pub static RESPONSIVE_EVENT: EnumSchema = EnumSchema {
    name: "ResponsiveEvent",
    values: &[
        EnumValue::new("NoEvent", 0),
        EnumValue::new("EnterUnresponsive", 1),
        EnumValue::new("ExitUnresponsive", 2),
    ],
};

// =========================================================================
// Status
// =========================================================================

pub static EMPTY: MessageSchema = MessageSchema {
    name: "Empty",
    fields: &[],
};

/// Basic information about a worker.
pub static PHACTORY_INFO: MessageSchema = MessageSchema {
    name: "PhactoryInfo",
    fields: &[
        F::new(1, "initialized", K::Bool),
        F::new(2, "registered", K::Bool),
        F::new(3, "genesis_block_hash", K::String).optional(),
        F::new(4, "public_key", K::String).optional(),
        F::new(5, "ecdh_public_key", K::String).optional(),
        F::new(6, "headernum", K::Uint32),
        F::new(7, "para_headernum", K::Uint32),
        F::new(8, "blocknum", K::Uint32),
        F::new(9, "state_root", K::String),
        F::new(10, "dev_mode", K::Bool),
        F::new(11, "pending_messages", K::Uint64),
        F::new(12, "score", K::Uint64),
        F::new(13, "gatekeeper", K::Message(&GATEKEEPER_STATUS)),
        F::new(14, "version", K::String),
        F::new(15, "git_revision", K::String),
        F::new(16, "running_side_tasks", K::Uint64),
        F::new(17, "memory_usage", K::Message(&MEMORY_USAGE)),
    ],
};

pub static GATEKEEPER_STATUS: MessageSchema = MessageSchema {
    name: "GatekeeperStatus",
    fields: &[
        F::new(1, "role", K::Enum(&GATEKEEPER_ROLE)),
        F::new(2, "master_public_key", K::String),
    ],
};

pub static MEMORY_USAGE: MessageSchema = MessageSchema {
    name: "MemoryUsage",
    fields: &[
        F::new(1, "rust_used", K::Uint64),
        F::new(2, "rust_peak_used", K::Uint64),
        F::new(3, "total_peak_used", K::Uint64),
    ],
};

// =========================================================================
// Chain sync
// =========================================================================

pub static SYNCED_TO: MessageSchema = MessageSchema {
    name: "SyncedTo",
    fields: &[F::new(1, "synced_to", K::Uint32)],
};

pub static HEADERS_TO_SYNC: MessageSchema = MessageSchema {
    name: "HeadersToSync",
    fields: &[
        F::new(1, "encoded_headers", K::Bytes),
        F::new(2, "encoded_authority_set_change", K::Bytes).optional(),
    ],
};

pub static PARA_HEADERS_TO_SYNC: MessageSchema = MessageSchema {
    name: "ParaHeadersToSync",
    fields: &[
        F::new(1, "encoded_headers", K::Bytes),
        F::new(2, "proof", K::Bytes).repeated(),
    ],
};

pub static COMBINED_HEADERS_TO_SYNC: MessageSchema = MessageSchema {
    name: "CombinedHeadersToSync",
    fields: &[
        F::new(1, "encoded_relaychain_headers", K::Bytes),
        F::new(2, "authority_set_change", K::Bytes).optional(),
        F::new(3, "encoded_parachain_headers", K::Bytes),
        F::new(4, "proof", K::Bytes).repeated(),
    ],
};

pub static HEADERS_SYNCED_TO: MessageSchema = MessageSchema {
    name: "HeadersSyncedTo",
    fields: &[
        F::new(1, "relaychain_synced_to", K::Uint32),
        F::new(2, "parachain_synced_to", K::Uint32),
    ],
};

pub static BLOCKS: MessageSchema = MessageSchema {
    name: "Blocks",
    fields: &[F::new(1, "encoded_blocks", K::Bytes)],
};

// =========================================================================
// Runtime
// =========================================================================

pub static INIT_RUNTIME_REQUEST: MessageSchema = MessageSchema {
    name: "InitRuntimeRequest",
    fields: &[
        F::new(1, "skip_ra", K::Bool),
        F::new(2, "encoded_genesis_info", K::Bytes),
        F::new(3, "debug_set_key", K::Bytes).optional(),
        F::new(4, "encoded_genesis_state", K::Bytes),
        F::new(5, "encoded_operator", K::Bytes).optional(),
        F::new(6, "is_parachain", K::Bool),
    ],
};

pub static INIT_RUNTIME_RESPONSE: MessageSchema = MessageSchema {
    name: "InitRuntimeResponse",
    fields: &[
        F::new(1, "encoded_runtime_info", K::Bytes),
        F::new(2, "encoded_genesis_block_hash", K::Bytes),
        F::new(3, "encoded_public_key", K::Bytes),
        F::new(4, "encoded_ecdh_public_key", K::Bytes),
        F::new(5, "attestation", K::Message(&ATTESTATION)).optional(),
    ],
};

pub static ATTESTATION: MessageSchema = MessageSchema {
    name: "Attestation",
    fields: &[
        F::new(1, "version", K::Int32),
        F::new(2, "provider", K::String),
        F::new(3, "payload", K::Message(&ATTESTATION_REPORT)),
        F::new(4, "timestamp", K::Uint64),
    ],
};

pub static ATTESTATION_REPORT: MessageSchema = MessageSchema {
    name: "AttestationReport",
    fields: &[
        F::new(1, "report", K::String),
        F::new(2, "signature", K::Bytes),
        F::new(3, "signing_cert", K::Bytes),
    ],
};

pub static GET_EGRESS_MESSAGES_RESPONSE: MessageSchema = MessageSchema {
    name: "GetEgressMessagesResponse",
    fields: &[F::new(1, "encoded_messages", K::Bytes)],
};

// =========================================================================
// Contract queries
// =========================================================================

pub static CONTRACT_QUERY_REQUEST: MessageSchema = MessageSchema {
    name: "ContractQueryRequest",
    fields: &[
        F::new(1, "encoded_encrypted_data", K::Bytes),
        F::new(2, "signature", K::Message(&SIGNATURE)),
    ],
};

// Signature and Certificate refer to each other.
pub static SIGNATURE: MessageSchema = MessageSchema {
    name: "Signature",
    fields: &[
        F::new(1, "signed_by", K::Message(&CERTIFICATE)),
        F::new(2, "signature_type", K::Enum(&SIGNATURE_TYPE)),
        F::new(3, "signature", K::Bytes),
    ],
};

pub static CERTIFICATE: MessageSchema = MessageSchema {
    name: "Certificate",
    fields: &[
        F::new(1, "encoded_body", K::Bytes),
        F::new(2, "signature", K::Message(&SIGNATURE)),
    ],
};

pub static CONTRACT_QUERY_RESPONSE: MessageSchema = MessageSchema {
    name: "ContractQueryResponse",
    fields: &[F::new(1, "encoded_encrypted_data", K::Bytes)],
};

// =========================================================================
// Worker state
// =========================================================================

pub static GET_WORKER_STATE_REQUEST: MessageSchema = MessageSchema {
    name: "GetWorkerStateRequest",
    fields: &[F::new(1, "public_key", K::Bytes)],
};

pub static WORKER_STATE: MessageSchema = MessageSchema {
    name: "WorkerState",
    fields: &[
        F::new(1, "registered", K::Bool),
        F::new(2, "unresponsive", K::Bool),
        F::new(3, "bench_state", K::Message(&BENCH_STATE)),
        F::new(4, "mining_state", K::Message(&MINING_STATE)),
        F::new(5, "waiting_heartbeats", K::Uint32).repeated(),
        F::new(6, "last_heartbeat_for_block", K::Uint32),
        F::new(7, "last_heartbeat_at_block", K::Uint32),
        F::new(8, "last_gk_responsive_event", K::Enum(&RESPONSIVE_EVENT)),
        F::new(9, "last_gk_responsive_event_at_block", K::Uint32),
        F::new(10, "tokenomic_info", K::Message(&TOKENOMIC_INFO)),
    ],
};

pub static BENCH_STATE: MessageSchema = MessageSchema {
    name: "BenchState",
    fields: &[
        F::new(1, "start_block", K::Uint32),
        F::new(2, "start_time", K::Uint64),
        F::new(3, "duration", K::Uint32),
    ],
};

pub static MINING_STATE: MessageSchema = MessageSchema {
    name: "MiningState",
    fields: &[
        F::new(1, "session_id", K::Uint32),
        F::new(2, "paused", K::Bool),
        F::new(3, "start_time", K::Uint64),
    ],
};

/// Tokenomic parameters; fixed-point numbers travel as strings.
pub static TOKENOMIC_INFO: MessageSchema = MessageSchema {
    name: "TokenomicInfo",
    fields: &[
        F::new(1, "v", K::String),
        F::new(2, "v_init", K::String),
        F::new(3, "payable", K::String),
        F::new(4, "v_update_at", K::Uint64),
        F::new(5, "v_update_block", K::Uint32),
        F::new(6, "iteration_last", K::Uint64),
        F::new(7, "challenge_time_last", K::Uint64),
        F::new(8, "p_bench", K::String),
        F::new(9, "p_instant", K::String),
        F::new(10, "confidence_level", K::Uint32),
        F::new(11, "last_payout", K::String),
        F::new(12, "last_payout_at_block", K::Uint32),
        F::new(13, "total_payout", K::String),
        F::new(14, "total_payout_count", K::Uint32),
        F::new(15, "last_slash", K::String),
        F::new(16, "last_slash_at_block", K::Uint32),
        F::new(17, "total_slash", K::String),
        F::new(18, "total_slash_count", K::Uint32),
    ],
};

pub static ECHO_MESSAGE: MessageSchema = MessageSchema {
    name: "EchoMessage",
    fields: &[F::new(1, "echo_msg", K::Bytes)],
};

// =========================================================================
// Lookup
// =========================================================================

/// Every record of the package.
pub static ALL_MESSAGES: [&MessageSchema; 25] = [
    &PHACTORY_INFO,
    &GATEKEEPER_STATUS,
    &MEMORY_USAGE,
    &SYNCED_TO,
    &HEADERS_TO_SYNC,
    &PARA_HEADERS_TO_SYNC,
    &COMBINED_HEADERS_TO_SYNC,
    &HEADERS_SYNCED_TO,
    &BLOCKS,
    &INIT_RUNTIME_REQUEST,
    &INIT_RUNTIME_RESPONSE,
    &ATTESTATION,
    &ATTESTATION_REPORT,
    &GET_EGRESS_MESSAGES_RESPONSE,
    &CONTRACT_QUERY_REQUEST,
    &SIGNATURE,
    &CERTIFICATE,
    &CONTRACT_QUERY_RESPONSE,
    &GET_WORKER_STATE_REQUEST,
    &WORKER_STATE,
    &BENCH_STATE,
    &MINING_STATE,
    &ECHO_MESSAGE,
    &TOKENOMIC_INFO,
    &EMPTY,
];

/// Every enum of the package.
pub static ALL_ENUMS: [&EnumSchema; 3] = [&GATEKEEPER_ROLE, &SIGNATURE_TYPE, &RESPONSIVE_EVENT];

/// Looks a record schema up by name.
pub fn message_schema(name: &str) -> Option<&'static MessageSchema> {
    ALL_MESSAGES.iter().copied().find(|schema| schema.name == name)
}

/// Looks an enum schema up by name.
pub fn enum_schema(name: &str) -> Option<&'static EnumSchema> {
    ALL_ENUMS.iter().copied().find(|schema| schema.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use proptest::prelude::*;
    use pruntime_wire::{decode, encode, Cardinality, CodecError, Record, Value};

    #[test]
    fn test_all_schemas_validate() {
        for schema in ALL_MESSAGES.iter() {
            schema.validate().unwrap();
        }
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = ALL_MESSAGES.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_MESSAGES.len());
    }

    #[test]
    fn test_lookup() {
        assert!(message_schema("WorkerState").unwrap().is(&WORKER_STATE));
        assert!(message_schema("Nope").is_none());
        assert_eq!(enum_schema("SignatureType").unwrap().name_of(4), Some("Sr25519WrapBytes"));
    }

    #[test]
    fn test_presence_tracked_fields() {
        for name in ["genesis_block_hash", "public_key", "ecdh_public_key"] {
            assert_eq!(
                PHACTORY_INFO.field(name).unwrap().cardinality,
                Cardinality::Optional
            );
        }
        assert_eq!(
            INIT_RUNTIME_RESPONSE.field("attestation").unwrap().cardinality,
            Cardinality::Optional
        );
    }

    #[test]
    fn test_worker_state_request_bytes() {
        let request = Record::new(&GET_WORKER_STATE_REQUEST)
            .with("public_key", vec![0u8; 32])
            .unwrap();
        let bytes = encode(&request).unwrap();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[..2], &[0x0a, 0x20]);
        assert!(bytes[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_phactory_info_absent_genesis_hash() {
        let info = Record::new(&PHACTORY_INFO)
            .with("initialized", true)
            .unwrap()
            .with("headernum", 10u32)
            .unwrap();
        let decoded = decode(&PHACTORY_INFO, &encode(&info).unwrap()).unwrap();
        assert!(!decoded.has("genesis_block_hash"));
        assert_eq!(decoded.get_str("genesis_block_hash"), None);

        let info = info.with("genesisBlockHash", "").unwrap();
        let decoded = decode(&PHACTORY_INFO, &encode(&info).unwrap()).unwrap();
        assert_eq!(decoded.get_str("genesis_block_hash"), Some(""));
    }

    #[test]
    fn test_recursive_signature_chain() {
        let root = Record::new(&SIGNATURE)
            .with("signature_type", Value::Enum(1))
            .unwrap()
            .with("signature", vec![9u8; 4])
            .unwrap();
        let cert = Record::new(&CERTIFICATE)
            .with("encoded_body", vec![1u8, 2])
            .unwrap()
            .with("signature", root)
            .unwrap();
        let signature = Record::new(&SIGNATURE)
            .with("signed_by", cert)
            .unwrap()
            .with("signature", vec![7u8])
            .unwrap();
        let query = Record::new(&CONTRACT_QUERY_REQUEST)
            .with("encoded_encrypted_data", vec![0xaa])
            .unwrap()
            .with("signature", signature)
            .unwrap();

        let decoded = decode(&CONTRACT_QUERY_REQUEST, &encode(&query).unwrap()).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn test_worker_state_roundtrip() {
        let state = Record::new(&WORKER_STATE)
            .with("registered", true)
            .unwrap()
            .with(
                "bench_state",
                Record::new(&BENCH_STATE)
                    .with("start_time", u64::MAX)
                    .unwrap(),
            )
            .unwrap()
            .with("waiting_heartbeats", Value::list([5u32, 6, 7]))
            .unwrap()
            .with("last_gk_responsive_event", Value::Enum(2))
            .unwrap()
            .with(
                "tokenomic_info",
                Record::new(&TOKENOMIC_INFO).with("v", "1.5").unwrap(),
            )
            .unwrap();

        let decoded = decode(&WORKER_STATE, &encode(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    fn arb_worker_state() -> impl Strategy<Value = Record> {
        (
            any::<bool>(),
            any::<bool>(),
            proptest::option::of((any::<u32>(), any::<u64>(), any::<u32>())),
            proptest::option::of((any::<u32>(), any::<bool>(), any::<u64>())),
            proptest::collection::vec(any::<u32>(), 0..8),
            any::<u32>(),
            any::<i32>(),
            proptest::option::of((".{0,8}", any::<u64>(), any::<u32>())),
        )
            .prop_map(
                |(registered, unresponsive, bench, mining, heartbeats, at_block, event, tokenomic)| {
                    let mut state = Record::new(&WORKER_STATE);
                    state.set("registered", registered).unwrap();
                    state.set("unresponsive", unresponsive).unwrap();
                    if let Some((start_block, start_time, duration)) = bench {
                        let bench = Record::new(&BENCH_STATE)
                            .with("start_block", start_block)
                            .unwrap()
                            .with("start_time", start_time)
                            .unwrap()
                            .with("duration", duration)
                            .unwrap();
                        state.set("bench_state", bench).unwrap();
                    }
                    if let Some((session_id, paused, start_time)) = mining {
                        let mining = Record::new(&MINING_STATE)
                            .with("session_id", session_id)
                            .unwrap()
                            .with("paused", paused)
                            .unwrap()
                            .with("start_time", start_time)
                            .unwrap();
                        state.set("mining_state", mining).unwrap();
                    }
                    state.set("waiting_heartbeats", Value::list(heartbeats)).unwrap();
                    state.set("last_heartbeat_at_block", at_block).unwrap();
                    state
                        .set("last_gk_responsive_event", Value::Enum(event))
                        .unwrap();
                    if let Some((v, update_at, payout_count)) = tokenomic {
                        let info = Record::new(&TOKENOMIC_INFO)
                            .with("v", v)
                            .unwrap()
                            .with("v_update_at", update_at)
                            .unwrap()
                            .with("total_payout_count", payout_count)
                            .unwrap();
                        state.set("tokenomic_info", info).unwrap();
                    }
                    state
                },
            )
    }

    fn arb_phactory_info() -> impl Strategy<Value = Record> {
        (
            any::<bool>(),
            proptest::option::of(".{0,12}"),
            proptest::option::of(".{0,12}"),
            proptest::option::of(".{0,12}"),
            any::<u32>(),
            any::<u64>(),
            proptest::option::of((any::<i32>(), ".{0,8}")),
            ".{0,8}",
            proptest::option::of((any::<u64>(), any::<u64>(), any::<u64>())),
        )
            .prop_map(
                |(initialized, genesis, public_key, ecdh, headernum, pending, gatekeeper, version, memory)| {
                    let mut info = Record::new(&PHACTORY_INFO);
                    info.set("initialized", initialized).unwrap();
                    if let Some(hash) = genesis {
                        info.set("genesis_block_hash", hash).unwrap();
                    }
                    if let Some(key) = public_key {
                        info.set("public_key", key).unwrap();
                    }
                    if let Some(key) = ecdh {
                        info.set("ecdh_public_key", key).unwrap();
                    }
                    info.set("headernum", headernum).unwrap();
                    info.set("pending_messages", pending).unwrap();
                    if let Some((role, master_key)) = gatekeeper {
                        let status = Record::new(&GATEKEEPER_STATUS)
                            .with("role", Value::Enum(role))
                            .unwrap()
                            .with("master_public_key", master_key)
                            .unwrap();
                        info.set("gatekeeper", status).unwrap();
                    }
                    info.set("version", version).unwrap();
                    if let Some((used, peak, total)) = memory {
                        let usage = Record::new(&MEMORY_USAGE)
                            .with("rust_used", used)
                            .unwrap()
                            .with("rust_peak_used", peak)
                            .unwrap()
                            .with("total_peak_used", total)
                            .unwrap();
                        info.set("memory_usage", usage).unwrap();
                    }
                    info
                },
            )
    }

    fn arb_init_runtime_response() -> impl Strategy<Value = Record> {
        let bytes = || proptest::collection::vec(any::<u8>(), 0..16);
        (
            bytes(),
            bytes(),
            bytes(),
            proptest::option::of((
                any::<i32>(),
                ".{0,8}",
                proptest::option::of((".{0,8}", bytes(), bytes())),
                any::<u64>(),
            )),
        )
            .prop_map(|(runtime_info, genesis_hash, public_key, attestation)| {
                let mut response = Record::new(&INIT_RUNTIME_RESPONSE);
                response.set("encoded_runtime_info", runtime_info).unwrap();
                response
                    .set("encoded_genesis_block_hash", genesis_hash)
                    .unwrap();
                response.set("encoded_public_key", public_key).unwrap();
                if let Some((version, provider, payload, timestamp)) = attestation {
                    let mut attestation = Record::new(&ATTESTATION)
                        .with("version", version)
                        .unwrap()
                        .with("provider", provider)
                        .unwrap()
                        .with("timestamp", timestamp)
                        .unwrap();
                    if let Some((report, signature, cert)) = payload {
                        let report = Record::new(&ATTESTATION_REPORT)
                            .with("report", report)
                            .unwrap()
                            .with("signature", signature)
                            .unwrap()
                            .with("signing_cert", cert)
                            .unwrap();
                        attestation.set("payload", report).unwrap();
                    }
                    response.set("attestation", attestation).unwrap();
                }
                response
            })
    }

    fn arb_service_record() -> impl Strategy<Value = Record> {
        prop_oneof![
            arb_worker_state(),
            arb_phactory_info(),
            arb_init_runtime_response(),
        ]
    }

    proptest! {
        #[test]
        fn prop_service_records_roundtrip(record in arb_service_record()) {
            let bytes = encode(&record).unwrap();
            prop_assert_eq!(decode(record.schema(), &bytes).unwrap(), record);
        }

        #[test]
        fn prop_service_records_reject_truncation(record in arb_service_record()) {
            let bytes = encode(&record).unwrap();
            prop_assume!(!bytes.is_empty());
            let err = decode(record.schema(), &bytes[..bytes.len() - 1]).unwrap_err();
            let is_malformed = matches!(err, CodecError::Malformed(_));
            prop_assert!(is_malformed);
            let is_malformed_wire = matches!(RpcError::from(err), RpcError::MalformedWire(_));
            prop_assert!(is_malformed_wire);
        }
    }
}
