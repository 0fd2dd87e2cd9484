/*!
 * Model-ingest dispatcher - turns a JSON byte buffer from an external
 * controller into per-region model swaps.
 *
 * Parsing happens once; the parsed package is then offered to every
 * registered region, wildcard or by exact name. A region's own
 * configuration failure is reported and skipped - one bad region in a
 * wildcard package must not block the rest.
 */

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ApolloError;
use crate::package::ModelPackage;
use crate::region::Region;

/// Parse `bytes` as a model package and dispatch it to every region in
/// `regions` it targets. A JSON parse failure is reported and no
/// region is touched. Per-region `configure` failures are reported
/// individually; dispatch continues to the remaining regions.
pub fn dispatch_model_package(
    bytes: &[u8],
    regions: &HashMap<String, Arc<Region>>,
) -> Result<(), ApolloError> {
    let package: ModelPackage = serde_json::from_slice(bytes).map_err(|e| {
        let err = ApolloError::Package {
            detail: format!("model package JSON parse failure: {e}"),
        };
        eprintln!("[Apollo] {err}");
        err
    })?;

    for (name, region) in regions {
        if !package.applies_to(name) {
            continue;
        }
        match region.model().configure(&package, name) {
            Ok(true) => {}
            Ok(false) => {}
            Err(e) => {
                eprintln!("[Apollo] model package for region '{name}' failed: {e}");
            }
        }
    }

    Ok(())
}
