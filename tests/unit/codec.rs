//! Binary record decoding tests: exact consumption, field fidelity,
//! determinism, and short-buffer failures.

use hmmlink::codec::{
    evalue_from_lnp, AlignmentRecord, DomainRecord, HitSummaryRecord, StatsRecord,
    ALI_HEADER_LEN, DOMAIN_LEN, HIT_LEN, STATS_LEN,
};
use hmmlink::error::ProtocolError;

use crate::helpers::{encode_alignment, encode_domain, encode_hit, encode_stats};

#[test]
fn test_stats_decode() {
    let buf = encode_stats(0.37, 45000.0, 3200.0, 12);
    let (stats, used) = StatsRecord::decode(&buf, 0).unwrap();
    assert_eq!(used, STATS_LEN);
    assert_eq!(stats.elapsed, 0.37);
    assert_eq!(stats.z, 45000.0);
    assert_eq!(stats.dom_z, 3200.0);
    assert_eq!(stats.z_setby, 1);
    assert_eq!(stats.nseqs, 45000);
    assert_eq!(stats.n_past_fwd, 40);
    assert_eq!(stats.nreported, 12);
}

#[test]
fn test_hit_summary_decode() {
    let buf = encode_hit(553220, 381.6, -266.1, 2);
    let (hit, used) = HitSummaryRecord::decode(&buf, 0).unwrap();
    assert_eq!(used, HIT_LEN);
    assert_eq!(hit.name, 553220);
    assert_eq!(hit.window_length, 100);
    assert_eq!(hit.sum_score, 381.6);
    assert_eq!(hit.lnp, -266.1);
    assert_eq!(hit.ndom, 2);
    assert_eq!(hit.nreported, 1);
    assert_eq!(hit.seqidx, 7);
}

#[test]
fn test_domain_decode() {
    let buf = encode_domain((5, 90), 179.6, -120.3, true, false);
    let (dom, used) = DomainRecord::decode(&buf, 0).unwrap();
    assert_eq!(used, DOMAIN_LEN);
    assert_eq!(dom.ienv, 5);
    assert_eq!(dom.jenv, 90);
    assert_eq!(dom.iali, 6);
    assert_eq!(dom.jali, 89);
    assert_eq!(dom.bitscore, 179.6);
    assert_eq!(dom.lnp, -120.3);
    assert_eq!(dom.is_reported, 1);
    assert_eq!(dom.is_included, 0);
}

#[test]
fn test_alignment_decode_consumes_header_plus_blob() {
    let blob = b"model/aseq/ppline packed strings".to_vec();
    let buf = encode_alignment((1, 253), (580, 830), &blob);
    let (ali, used) = AlignmentRecord::decode(&buf, 0).unwrap();
    assert_eq!(used, ALI_HEADER_LEN + blob.len());
    assert_eq!(ali.hmm_from, 1);
    assert_eq!(ali.hmm_to, 253);
    assert_eq!(ali.seq_from, 580);
    assert_eq!(ali.seq_to, 830);
    assert_eq!(ali.memsize as usize, blob.len());
    assert_eq!(ali.blob, blob);
}

#[test]
fn test_decode_at_offset_chains() {
    // Two records back to back; the second decode starts exactly where the
    // first one stopped.
    let mut buf = encode_domain((1, 10), 50.0, -5.0, true, true);
    buf.extend(encode_domain((11, 20), 60.0, -6.0, false, true));
    let (first, used) = DomainRecord::decode(&buf, 0).unwrap();
    let (second, used2) = DomainRecord::decode(&buf, used).unwrap();
    assert_eq!(used + used2, 2 * DOMAIN_LEN);
    assert_eq!(first.ienv, 1);
    assert_eq!(second.ienv, 11);
    assert_eq!(second.is_reported, 0);
}

#[test]
fn test_decoding_is_deterministic() {
    let buf = encode_hit(42, 100.0, -33.3, 1);
    let (a, _) = HitSummaryRecord::decode(&buf, 0).unwrap();
    let (b, _) = HitSummaryRecord::decode(&buf, 0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_truncated_record_is_short_record() {
    let buf = encode_hit(1, 10.0, -1.0, 0);
    let err = HitSummaryRecord::decode(&buf[..HIT_LEN - 1], 0).unwrap_err();
    assert!(matches!(err, ProtocolError::ShortRecord { record: "hit summary", .. }));
}

#[test]
fn test_alignment_blob_overrun_is_short_record() {
    let blob = vec![0u8; 64];
    let buf = encode_alignment((1, 8), (1, 8), &blob);
    // Cut into the blob: the header decodes, the declared memsize does not
    // fit, and the error names the alignment record.
    let err = AlignmentRecord::decode(&buf[..ALI_HEADER_LEN + 10], 0).unwrap_err();
    assert!(matches!(err, ProtocolError::ShortRecord { record: "alignment", .. }));
}

#[test]
fn test_domain_evalue_variants() {
    let buf = encode_domain((5, 90), 179.6, -12.0, true, true);
    let (dom, _) = DomainRecord::decode(&buf, 0).unwrap();
    // Independent vs conditional e-values differ only in the effective
    // count used for normalization.
    let z = 45000.0;
    let dom_z = 18.0;
    assert_eq!(dom.ievalue(z), (-12.0f64).exp() * z);
    assert_eq!(dom.cevalue(dom_z), (-12.0f64).exp() * dom_z);
    assert!(dom.cevalue(dom_z) < dom.ievalue(z));
}

#[test]
fn test_evalue_conversion_reference_points() {
    let z = 45000.0;
    assert_eq!(evalue_from_lnp(0.0, z), z);
    assert!(evalue_from_lnp(-2.0, z) < z);
    let expected = (-266.1f64).exp() * z;
    assert_eq!(evalue_from_lnp(-266.1, z), expected);
}
