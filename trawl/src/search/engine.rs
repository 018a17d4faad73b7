use std::ops::ControlFlow;
use tracing::{debug, info};

use super::blame::Blamer;
use super::grepper::Grepper;
use super::GrepRequest;
use crate::errors::SearchResult;
use crate::options::ScanOptions;
use crate::policy::PolicyView;
use crate::results::SearchOutput;
use crate::walk::Traversal;

/// Searches file content under the request's roots.
///
/// Candidates are streamed from the traversal one at a time, so at most one
/// file is open. Accumulation stops once the policy's `max_matches` is reached.
pub fn grep(
    request: &GrepRequest,
    policy: &dyn PolicyView,
    options: &ScanOptions,
    blamer: &dyn Blamer,
) -> SearchResult<SearchOutput> {
    info!(
        "Starting search for '{}' ({}) in {} root(s)",
        request.pattern,
        request.pattern.kind(),
        request.roots.len()
    );

    let cap = policy.max_matches();
    let mut output = SearchOutput::new(request.mode);
    let mut grepper = Grepper::new(request, options, blamer);
    let mut traversal = Traversal::new(policy, options).include_dirs(false);

    traversal.visit(&request.roots, |candidate| {
        let Some(mut result) = grepper.scan_file(&candidate)? else {
            return Ok(ControlFlow::Continue(()));
        };
        if result.matches.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }

        if let Some(cap) = cap {
            let remaining = cap.saturating_sub(output.total_matches);
            if result.matches.len() > remaining {
                result.matches.truncate(remaining);
                output.add_file_result(result);
                output.truncated = true;
                debug!("Reached match limit of {}", cap);
                return Ok(ControlFlow::Break(()));
            }
        }

        output.add_file_result(result);
        Ok(ControlFlow::Continue(()))
    })?;

    let mut stats = traversal.stats().clone();
    stats.merge(grepper.stats());
    stats.log_stats();

    output.files_searched = stats.files_scanned as usize;
    output.stats = stats;
    output.sort();

    info!(
        "Search complete. Found {} matches in {} files",
        output.total_matches, output.files_with_matches
    );

    Ok(output)
}
