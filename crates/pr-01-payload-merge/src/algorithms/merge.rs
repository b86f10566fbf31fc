//! # Payload Merge
//!
//! Combines two views of the same transaction. The rule set is chosen by the
//! primary payload's privacy mode. Both inputs must carry the same ciphertext
//! and sender; callers establish that by hash equality.

use std::collections::BTreeMap;

use shared_types::{EncodedPayload, PrivacyMode, SecurityHash, TxHash};
use tracing::trace;

/// Merge `secondary` into `primary`.
///
/// Returns one of the inputs unchanged when that side is already complete.
pub fn merge(primary: EncodedPayload, secondary: EncodedPayload) -> EncodedPayload {
    trace!(
        "[pr-01] merging {} payload ({} keys/{} boxes) with ({} keys/{} boxes)",
        primary.privacy_mode,
        primary.recipient_keys.len(),
        primary.recipient_boxes.len(),
        secondary.recipient_keys.len(),
        secondary.recipient_boxes.len(),
    );

    match primary.privacy_mode {
        PrivacyMode::PrivateStateValidation => merge_psv(primary, secondary),
        PrivacyMode::PartyProtection => merge_party_protection(primary, secondary),
        PrivacyMode::StandardPrivate | PrivacyMode::MandatoryRecipients => {
            merge_standard(primary, secondary)
        }
    }
}

/// Union of both affected-transaction maps. Secondary wins on collision.
pub fn combine_affected(
    primary: &EncodedPayload,
    secondary: &EncodedPayload,
) -> BTreeMap<TxHash, SecurityHash> {
    let mut combined = primary.affected_contract_transactions.clone();
    combined.extend(
        secondary
            .affected_contract_transactions
            .iter()
            .map(|(hash, security)| (hash.clone(), security.clone())),
    );
    combined
}

fn merge_psv(primary: EncodedPayload, secondary: EncodedPayload) -> EncodedPayload {
    if primary.has_complete_boxes() {
        return primary;
    }
    if secondary.has_complete_boxes() {
        return secondary;
    }

    let secondary_recipients = secondary.boxed_recipients().to_vec();

    let recipient_keys: Vec<_> = secondary_recipients
        .iter()
        .copied()
        .chain(
            primary
                .recipient_keys
                .iter()
                .copied()
                .filter(|key| !secondary_recipients.contains(key)),
        )
        .collect();

    let recipient_boxes: Vec<_> = secondary
        .recipient_boxes
        .iter()
        .chain(primary.recipient_boxes.iter())
        .cloned()
        .collect();

    let affected = combine_affected(&primary, &secondary);

    primary
        .with_affected_contract_transactions(affected)
        .with_recipient_keys(recipient_keys)
        .with_recipient_boxes(recipient_boxes)
}

fn merge_party_protection(primary: EncodedPayload, secondary: EncodedPayload) -> EncodedPayload {
    if primary.has_sender_as_recipient() {
        return primary;
    }
    if secondary.has_sender_as_recipient() {
        return secondary;
    }

    let affected = combine_affected(&primary, &secondary);
    append_recipients(primary, secondary).with_affected_contract_transactions(affected)
}

fn merge_standard(primary: EncodedPayload, secondary: EncodedPayload) -> EncodedPayload {
    if primary.has_sender_as_recipient() {
        return primary;
    }
    if secondary.has_sender_as_recipient() {
        return secondary;
    }

    match (
        primary.recipient_keys.is_empty(),
        secondary.recipient_keys.is_empty(),
    ) {
        // Duplicate (key, box) pairs are kept as-is.
        (true, true) | (false, false) => append_recipients(primary, secondary),
        // The legacy empty-recipient side is authoritative.
        (true, false) => primary,
        (false, true) => secondary,
    }
}

fn append_recipients(primary: EncodedPayload, secondary: EncodedPayload) -> EncodedPayload {
    let mut recipient_keys = primary.recipient_keys.clone();
    recipient_keys.extend(secondary.recipient_keys);

    let mut recipient_boxes = primary.recipient_boxes.clone();
    recipient_boxes.extend(secondary.recipient_boxes);

    primary
        .with_recipient_keys(recipient_keys)
        .with_recipient_boxes(recipient_boxes)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::testing::{sample_key, sample_payload};
    use shared_types::{PublicKey, RecipientBox};

    fn recipients() -> impl Strategy<Value = Vec<PublicKey>> {
        prop::collection::vec((2u8..20).prop_map(sample_key), 0..6)
    }

    fn with_boxes(mode: PrivacyMode, keys: Vec<PublicKey>) -> EncodedPayload {
        let boxes = keys
            .iter()
            .map(|k| RecipientBox(k.as_bytes().to_vec()))
            .collect();
        sample_payload(sample_key(1), b"cipher")
            .with_privacy_mode(mode)
            .with_recipient_keys(keys)
            .with_recipient_boxes(boxes)
    }

    fn contains_pair(payload: &EncodedPayload, key: &PublicKey, rbox: &RecipientBox) -> bool {
        payload
            .recipient_keys
            .iter()
            .zip(payload.recipient_boxes.iter())
            .any(|(k, b)| k == key && b == rbox)
    }

    proptest! {
        #[test]
        fn psv_complete_primary_is_idempotent(
            primary_keys in recipients(),
            secondary_keys in recipients(),
            boxed in 0usize..6,
        ) {
            let primary = with_boxes(PrivacyMode::PrivateStateValidation, primary_keys);
            let mut secondary = with_boxes(PrivacyMode::PrivateStateValidation, secondary_keys);
            secondary.recipient_boxes.truncate(boxed);

            prop_assert_eq!(merge(primary.clone(), secondary), primary);
        }

        #[test]
        fn party_protection_union_keeps_every_key(
            primary_keys in recipients(),
            secondary_keys in recipients(),
        ) {
            let primary = with_boxes(PrivacyMode::PartyProtection, primary_keys.clone());
            let secondary = with_boxes(PrivacyMode::PartyProtection, secondary_keys.clone());

            let merged = merge(primary.clone(), secondary.clone());

            prop_assert_eq!(
                merged.recipient_boxes.len(),
                primary.recipient_boxes.len() + secondary.recipient_boxes.len()
            );
            prop_assert_eq!(merged.recipient_boxes.len(), merged.recipient_keys.len());
            for key in primary_keys.iter().chain(secondary_keys.iter()) {
                prop_assert!(merged.recipient_keys.contains(key));
            }
        }

        #[test]
        fn standard_legacy_empty_primary_wins(
            enriched_keys in prop::collection::vec((2u8..20).prop_map(sample_key), 1..6),
        ) {
            let legacy = sample_payload(sample_key(1), b"cipher")
                .with_recipient_box(RecipientBox(b"legacy".to_vec()));
            let enriched = with_boxes(PrivacyMode::StandardPrivate, enriched_keys);

            prop_assert_eq!(merge(legacy.clone(), enriched), legacy);
        }

        #[test]
        fn merge_never_drops_existing_pairs(
            primary_keys in recipients(),
            secondary_keys in recipients(),
            mode in prop_oneof![
                Just(PrivacyMode::StandardPrivate),
                Just(PrivacyMode::PartyProtection),
                Just(PrivacyMode::MandatoryRecipients),
            ],
        ) {
            // A legacy empty side replaces the other.
            prop_assume!(primary_keys.is_empty() == secondary_keys.is_empty());

            let primary = with_boxes(mode, primary_keys);
            let secondary = with_boxes(mode, secondary_keys);

            let merged = merge(primary.clone(), secondary.clone());

            for source in [&primary, &secondary] {
                for (key, rbox) in source.recipient_keys.iter().zip(source.recipient_boxes.iter()) {
                    prop_assert!(contains_pair(&merged, key, rbox));
                }
            }
        }
    }
}
