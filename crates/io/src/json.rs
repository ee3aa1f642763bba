// JSON export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use vsrcheck_recon::ReconResult;

use crate::error::{IoError, IoResult};

/// Write a run as pretty-printed JSON. Missing values serialize as `"N/A"`.
pub fn write_result<W: Write>(mut out: W, result: &ReconResult) -> IoResult<()> {
    serde_json::to_writer_pretty(&mut out, result)?;
    writeln!(out)
        .and_then(|_| out.flush())
        .map_err(|e| IoError::Json(serde_json::Error::io(e)))
}

pub fn export(result: &ReconResult, path: &Path) -> IoResult<()> {
    let file = File::create(path).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_result(BufWriter::new(file), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use vsrcheck_recon::model::{Priority, ReferenceEntry, ReferenceTable};
    use vsrcheck_recon::{ReconConfig, ResultFilter};

    const DOC: &str = "<table id=\"ecuInformation\"><tr><th>h</th></tr>\
        <tr><td>BCM</td><td></td><td></td><td>68400001AB</td><td></td><td></td><td></td><td>20.05.01</td></tr>\
        <tr><td>TPMS</td><td>No Positive Response</td></tr></table>";

    #[test]
    fn test_json_export() {
        let reference = ReferenceTable::from_entries(vec![ReferenceEntry::new(
            "BCM",
            "68400001AB",
            "20.05.01",
            Priority::P1,
        )]);
        let result = vsrcheck_recon::run(&ReconConfig::default(), "scan.htm", DOC, &reference, &ResultFilter::default())
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("result.json");
        export(&result, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["meta"]["report"], "scan.htm");
        assert_eq!(value["summary"]["total_ecus"], 2);
        assert_eq!(value["results"][0]["part_status"], "match");
        assert_eq!(value["results"][1]["reported_part"], "N/A");
        assert_eq!(value["plan"]["missing"][0], "TPMS");
    }
}
