use crate::compare::{compare_parts, compare_versions};
use crate::config::{ComparePolicy, ReconConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::extract::extract;
use crate::filter::ResultFilter;
use crate::model::{
    is_missing, ClassificationResult, EcuRecord, Priority, ReconMeta, ReconResult,
    ReferenceTable, Status,
};
use crate::plan::plan;

/// Run a full check: extract → reconcile → filter → plan.
///
/// `report_name` is only carried into the result metadata.
pub fn run(
    config: &ReconConfig,
    report_name: &str,
    document: &str,
    reference: &ReferenceTable,
    filter: &ResultFilter,
) -> Result<ReconResult, ReconError> {
    let records = extract(document, &config.extract);
    if records.is_empty() {
        return Err(ReconError::NoEcuData {
            report: report_name.to_string(),
        });
    }
    tracing::info!(ecus = records.len(), report = report_name, "extracted ECU records");

    let results = filter.apply(reconcile(&records, reference, &config.compare));
    let summary = compute_summary(&results);
    let plan = plan(&results);

    Ok(ReconResult {
        meta: ReconMeta {
            report: report_name.to_string(),
            reference_entries: reference.len(),
            extracted_ecus: records.len(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        results,
        plan,
    })
}

/// Classify every record against the reference table. One result per record,
/// in input order.
pub fn reconcile(
    records: &[EcuRecord],
    reference: &ReferenceTable,
    policy: &ComparePolicy,
) -> Vec<ClassificationResult> {
    records
        .iter()
        .map(|record| classify_record(record, reference, policy))
        .collect()
}

fn classify_record(
    record: &EcuRecord,
    reference: &ReferenceTable,
    policy: &ComparePolicy,
) -> ClassificationResult {
    let Some(entry) = reference.get(&record.name) else {
        tracing::debug!(ecu = %record.name, "not in reference table");
        return ClassificationResult {
            ecu: record.name.clone(),
            reported_part: record.part_number.clone(),
            expected_part: None,
            part_status: Status::NotFound,
            reported_sw: record.sw_version.clone(),
            expected_sw: None,
            sw_status: Status::NotFound,
            priority: Priority::Unknown,
            owner_fields: Default::default(),
        };
    };

    // A value the scan did not return is absent, not different.
    let part_status = if is_missing(record.part_number.as_deref()) {
        Status::NotFound
    } else {
        compare_parts(
            record.part_number.as_deref(),
            Some(&entry.part_number),
            policy.short_part,
        )
    };
    let sw_status = if is_missing(record.sw_version.as_deref()) {
        Status::NotFound
    } else {
        compare_versions(
            record.sw_version.as_deref(),
            Some(&entry.sw_version),
            policy.unparseable_version,
        )
    };

    ClassificationResult {
        ecu: record.name.clone(),
        reported_part: record.part_number.clone(),
        expected_part: Some(entry.part_number.clone()),
        part_status,
        reported_sw: record.sw_version.clone(),
        expected_sw: Some(entry.sw_version.clone()),
        sw_status,
        priority: entry.priority,
        owner_fields: entry.owner_fields.clone(),
    }
}
