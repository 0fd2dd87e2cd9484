/*!
 * Best-policy reducer - local reduction lives on `Region`
 * (`reduce_best_policies`); this module owns the cross-rank half:
 * packing a rank's best policies into the wire format, exchanging
 * them via a `CollectiveTransport`, and reducing again across ranks.
 *
 * Wire format per record (little-endian):
 *
 * | field         | type      | size |
 * |---------------|-----------|------|
 * | rank          | i32       | 4    |
 * | features      | f32 * F   | 4F   |
 * | policy_index  | i32       | 4    |
 * | region_name   | u8 * 64   | 64 (NUL-padded) |
 * | avg_time      | f64       | 8    |
 *
 * Buffers are self-describing with an 8-byte envelope
 * (`record_count: u32`, `feature_count: u32`) ahead of the records,
 * so a receiver can decode without out-of-band knowledge of F.
 */

use std::collections::HashMap;
use std::convert::TryInto;

use crate::error::ApolloError;
use crate::measure::FeatureVec;
use crate::transport::CollectiveTransport;

const RANK_SIZE: usize = 4;
const POLICY_SIZE: usize = 4;
const REGION_NAME_SIZE: usize = 64;
const AVG_TIME_SIZE: usize = 8;
const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct PackedRecord {
    pub rank: i32,
    pub features: Vec<f32>,
    pub policy_index: i32,
    pub region_name: String,
    pub avg_time: f64,
}

fn record_size(feature_count: usize) -> usize {
    RANK_SIZE + 4 * feature_count + POLICY_SIZE + REGION_NAME_SIZE + AVG_TIME_SIZE
}

/// Pack one rank's best-policy tables (one per region) into the wire
/// format. Fails if two records carry feature vectors of different
/// lengths, or a region name doesn't fit the 64-byte field.
pub fn pack_best_policies(
    rank: i32,
    per_region: &[(String, HashMap<FeatureVec, (usize, f64)>)],
) -> Result<Vec<u8>, ApolloError> {
    let mut feature_count: Option<usize> = None;
    let mut body = Vec::new();
    let mut record_count: u32 = 0;

    for (region_name, best) in per_region {
        if region_name.as_bytes().len() >= REGION_NAME_SIZE {
            return Err(ApolloError::Collective {
                detail: format!("region name '{region_name}' does not fit the wire format"),
            });
        }
        for (fv, (policy, avg)) in best {
            let f = fv.0.len();
            match feature_count {
                None => feature_count = Some(f),
                Some(expected) if expected != f => {
                    return Err(ApolloError::Collective {
                        detail: format!(
                            "feature count mismatch within rank {rank}: {expected} vs {f}"
                        ),
                    });
                }
                _ => {}
            }

            body.extend_from_slice(&rank.to_le_bytes());
            for value in &fv.0 {
                body.extend_from_slice(&(*value as f32).to_le_bytes());
            }
            body.extend_from_slice(&(*policy as i32).to_le_bytes());

            let mut name_bytes = [0u8; REGION_NAME_SIZE];
            let bytes = region_name.as_bytes();
            name_bytes[..bytes.len()].copy_from_slice(bytes);
            body.extend_from_slice(&name_bytes);

            body.extend_from_slice(&avg.to_le_bytes());
            record_count += 1;
        }
    }

    let feature_count = feature_count.unwrap_or(0) as u32;
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&record_count.to_le_bytes());
    buf.extend_from_slice(&feature_count.to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Unpack a buffer produced by [`pack_best_policies`].
pub fn unpack_best_policies(bytes: &[u8]) -> Result<Vec<PackedRecord>, ApolloError> {
    let malformed = |detail: String| ApolloError::Collective { detail };
    if bytes.len() < HEADER_SIZE {
        return Err(malformed("buffer shorter than the wire header".to_string()));
    }
    let record_count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let feature_count = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let size = record_size(feature_count);
    let expected_len = HEADER_SIZE + record_count * size;
    if bytes.len() != expected_len {
        return Err(malformed(format!(
            "buffer length {} does not match header (expected {expected_len})",
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(record_count);
    let mut offset = HEADER_SIZE;
    for _ in 0..record_count {
        let rank = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;

        let mut features = Vec::with_capacity(feature_count);
        for _ in 0..feature_count {
            let value = f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            features.push(value);
            offset += 4;
        }

        let policy_index = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;

        let name_bytes = &bytes[offset..offset + REGION_NAME_SIZE];
        offset += REGION_NAME_SIZE;
        let nul_at = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let region_name = String::from_utf8_lossy(&name_bytes[..nul_at]).into_owned();

        let avg_time = f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        out.push(PackedRecord {
            rank,
            features,
            policy_index,
            region_name,
            avg_time,
        });
    }
    Ok(out)
}

/// Run the collective exchange for one rank's per-region best-policy
/// tables and reduce across ranks: for each (region, feature-vector),
/// keep the smallest avg; tie-break by smallest policy index, then
/// smallest rank.
pub fn collective_reduce(
    transport: &dyn CollectiveTransport,
    per_region: &[(String, HashMap<FeatureVec, (usize, f64)>)],
) -> Result<HashMap<(String, FeatureVec), (usize, f64)>, ApolloError> {
    let packed = pack_best_policies(transport.rank(), per_region)?;
    let gathered = transport.all_gather(packed)?;

    let mut global: HashMap<(String, FeatureVec), (usize, f64, i32)> = HashMap::new();
    for buf in gathered {
        for rec in unpack_best_policies(&buf)? {
            let feature_vec = FeatureVec(rec.features.iter().map(|v| *v as f64).collect());
            let key = (rec.region_name, feature_vec);
            let policy = rec.policy_index as usize;
            let candidate = (policy, rec.avg_time, rec.rank);

            global
                .entry(key)
                .and_modify(|current| {
                    let better = candidate.1 < current.1
                        || (candidate.1 == current.1 && candidate.0 < current.0)
                        || (candidate.1 == current.1
                            && candidate.0 == current.0
                            && candidate.2 < current.2);
                    if better {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }

    Ok(global
        .into_iter()
        .map(|(key, (policy, avg, _rank))| (key, (policy, avg)))
        .collect())
}
