use detached_extrinsic::tx::era::align_period;
use detached_extrinsic::tx::{default_signed_extensions, FORMAT_VERSION};
use detached_extrinsic::{Address, ArgValue, CallRegistry, Envelope, Era, SigningPayload};
use proptest::prelude::*;

fn any_era() -> impl Strategy<Value = Era> {
    prop_oneof![
        Just(Era::Immortal),
        (4u64..=70_000, any::<u32>()).prop_map(|(period, block)| Era::mortal(period, block as u64).unwrap()),
    ]
}

fn any_payload() -> impl Strategy<Value = SigningPayload> {
    (
        (any::<u32>(), any::<u32>(), prop::array::uniform32(any::<u8>()), 0u16..16_384),
        (prop::array::uniform32(any::<u8>()), any::<u32>(), any_era()),
        (prop::collection::vec(any::<u8>(), 0..300), any::<u64>(), any::<u128>()),
    )
        .prop_map(
            |((spec_version, tx_version, account, prefix), (block_hash, block_number, era), (call, nonce, tip))| {
                SigningPayload {
                    spec_version,
                    tx_version,
                    sender: Address::new(account, prefix).unwrap(),
                    block_hash,
                    block_number: block_number as u64,
                    era,
                    genesis_hash: [0x9a; 32],
                    call,
                    nonce,
                    signed_extensions: default_signed_extensions(),
                    tip,
                    format_version: FORMAT_VERSION,
                }
            },
        )
}

proptest! {
    #[test]
    fn transfer_calls_decode_to_their_arguments(
        dest in prop::array::uniform32(any::<u8>()),
        value in any::<u128>(),
    ) {
        let registry = CallRegistry::substrate_defaults();
        let args = vec![ArgValue::MultiAddress(dest), ArgValue::Compact(value)];
        let call = registry.encode("Balances.transfer_keep_alive", args.clone()).unwrap();

        let decoded = registry.decode(call.bytes()).unwrap();
        prop_assert_eq!(decoded.label.as_str(), "Balances.transfer_keep_alive");
        prop_assert_eq!(&decoded.args, &args);
        prop_assert_eq!(decoded.bytes(), call.bytes());
    }

    #[test]
    fn remark_bytes_survive_encoding(remark in prop::collection::vec(any::<u8>(), 0..2048)) {
        let registry = CallRegistry::substrate_defaults();
        let call = registry.encode("System.remark", vec![ArgValue::Bytes(remark.clone())]).unwrap();
        let decoded = registry.decode(call.bytes()).unwrap();
        prop_assert_eq!(decoded.args, vec![ArgValue::Bytes(remark)]);
    }

    #[test]
    fn mortal_window_contains_anchor(requested in 4u64..=1_000_000, block in any::<u32>()) {
        let block = block as u64;
        let era = Era::mortal(requested, block).unwrap();
        let period = align_period(requested).unwrap();

        let window = era.window(block);
        prop_assert!(window.contains(block));
        prop_assert_eq!(window.birth, block);
        prop_assert_eq!(window.death - window.birth, period);
        prop_assert!(period <= requested);
        prop_assert!(!window.contains(window.death));

        let encoded = era.encode();
        prop_assert_eq!(encoded.len(), 2);
        let decoded = Era::decode(&mut encoded.as_slice()).unwrap();
        prop_assert_eq!(decoded, era);
    }

    #[test]
    fn payload_bytes_identify_the_payload(payload in any_payload()) {
        let bytes = payload.canonical_bytes();
        prop_assert_eq!(&bytes, &payload.clone().canonical_bytes());
        prop_assert_eq!(SigningPayload::decode(&bytes).unwrap(), payload.clone());

        let mut bumped = payload.clone();
        bumped.nonce = bumped.nonce.wrapping_add(1);
        prop_assert_ne!(bumped.canonical_bytes(), bytes);
    }

    #[test]
    fn decoders_reject_garbage_without_panicking(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let registry = CallRegistry::substrate_defaults();
        let _ = registry.decode(&bytes);
        let _ = Era::decode(&mut bytes.as_slice());
        let _ = SigningPayload::decode(&bytes);
        let _ = Envelope::decode(&bytes, &registry, 42);
    }
}
