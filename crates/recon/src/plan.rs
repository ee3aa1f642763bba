use crate::model::{ClassificationResult, Priority, RemediationPlan};

/// Group results into a remediation plan.
///
/// ECUs behind on part or software (older, or not found) go to the bucket of
/// their reference priority. An unknown priority is escalated to priority 1.
/// Priority 0 ECUs are never escalated: current ones are listed as needing no
/// update, stale ones as deferred. Every ECU with a `NotFound` status is also
/// named in `missing`.
pub fn plan(results: &[ClassificationResult]) -> RemediationPlan {
    let mut plan = RemediationPlan::default();

    for r in results {
        if r.needs_update() {
            match r.priority {
                Priority::P1 | Priority::Unknown => plan.priority_1.push(r.clone()),
                Priority::P2 => plan.priority_2.push(r.clone()),
                Priority::P3 => plan.priority_3.push(r.clone()),
                Priority::P0 => plan.deferred.push(r.ecu.clone()),
            }
        } else if r.priority == Priority::P0 {
            plan.other_no_update.push(r.ecu.clone());
        }

        if r.has_not_found() {
            plan.missing.push(r.ecu.clone());
        }
    }

    plan
}
