use std::collections::BTreeSet;

use crate::model::{ClassificationResult, Status};

/// View selection applied to a result set before planning.
///
/// Passed explicitly into every run; the engine keeps no filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    pub part_status: Option<Status>,
    pub sw_status: Option<Status>,
    /// ECU names excluded from the view (exact match).
    pub hidden_ecus: BTreeSet<String>,
}

impl ResultFilter {
    pub fn part(mut self, status: Status) -> Self {
        self.part_status = Some(status);
        self
    }

    pub fn sw(mut self, status: Status) -> Self {
        self.sw_status = Some(status);
        self
    }

    pub fn hide(mut self, ecu: impl Into<String>) -> Self {
        self.hidden_ecus.insert(ecu.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.part_status.is_none() && self.sw_status.is_none() && self.hidden_ecus.is_empty()
    }

    pub fn matches(&self, result: &ClassificationResult) -> bool {
        self.part_status.map_or(true, |s| result.part_status == s)
            && self.sw_status.map_or(true, |s| result.sw_status == s)
            && !self.hidden_ecus.contains(&result.ecu)
    }

    /// Keep matching results, preserving order.
    pub fn apply(&self, results: Vec<ClassificationResult>) -> Vec<ClassificationResult> {
        if self.is_empty() {
            return results;
        }
        results.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;

    fn result(ecu: &str, part: Status, sw: Status) -> ClassificationResult {
        ClassificationResult {
            ecu: ecu.into(),
            reported_part: None,
            expected_part: None,
            part_status: part,
            reported_sw: None,
            expected_sw: None,
            sw_status: sw,
            priority: Priority::P1,
            owner_fields: Default::default(),
        }
    }

    fn sample() -> Vec<ClassificationResult> {
        vec![
            result("BCM", Status::Match, Status::Match),
            result("IPC", Status::Older, Status::Match),
            result("RFH", Status::Older, Status::Newer),
            result("TPMS", Status::NotFound, Status::NotFound),
        ]
    }

    fn names(results: &[ClassificationResult]) -> Vec<&str> {
        results.iter().map(|r| r.ecu.as_str()).collect()
    }

    #[test]
    fn default_keeps_everything() {
        assert_eq!(ResultFilter::default().apply(sample()).len(), 4);
    }

    #[test]
    fn status_filters_combine() {
        let filtered = ResultFilter::default().part(Status::Older).apply(sample());
        assert_eq!(names(&filtered), ["IPC", "RFH"]);

        let filtered = ResultFilter::default()
            .part(Status::Older)
            .sw(Status::Newer)
            .apply(sample());
        assert_eq!(names(&filtered), ["RFH"]);
    }

    #[test]
    fn hidden_ecus_are_dropped() {
        let filtered = ResultFilter::default().hide("TPMS").hide("BCM").apply(sample());
        assert_eq!(names(&filtered), ["IPC", "RFH"]);
    }
}
