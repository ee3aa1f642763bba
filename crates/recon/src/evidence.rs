use crate::model::{ClassificationResult, ReconSummary};

/// Compute summary statistics from classified results.
pub fn compute_summary(results: &[ClassificationResult]) -> ReconSummary {
    let mut summary = ReconSummary {
        total_ecus: results.len(),
        ..Default::default()
    };

    for r in results {
        summary.part.add(r.part_status);
        summary.sw.add(r.sw_status);
        if r.reported_part.is_none() && r.reported_sw.is_none() {
            summary.no_response += 1;
        }
        if r.needs_update() {
            summary.needs_update += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status};

    fn result(part: Status, sw: Status, responded: bool) -> ClassificationResult {
        let reported = responded.then(|| "x".to_string());
        ClassificationResult {
            ecu: "k".into(),
            reported_part: reported.clone(),
            expected_part: None,
            part_status: part,
            reported_sw: reported,
            expected_sw: None,
            sw_status: sw,
            priority: Priority::Unknown,
            owner_fields: Default::default(),
        }
    }

    #[test]
    fn summary_counts() {
        let results = vec![
            result(Status::Match, Status::Match, true),
            result(Status::Match, Status::Newer, true),
            result(Status::Older, Status::Match, true),
            result(Status::NotFound, Status::NotFound, false),
        ];
        let summary = compute_summary(&results);
        assert_eq!(summary.total_ecus, 4);
        assert_eq!(summary.part.matched, 2);
        assert_eq!(summary.part.older, 1);
        assert_eq!(summary.part.not_found, 1);
        assert_eq!(summary.sw.newer, 1);
        assert_eq!(summary.no_response, 1);
        assert_eq!(summary.needs_update, 2);
        assert!(summary.has_mismatches());
    }

    #[test]
    fn all_matched_has_no_mismatches() {
        let summary = compute_summary(&[result(Status::Match, Status::Match, true)]);
        assert!(!summary.has_mismatches());
    }
}
