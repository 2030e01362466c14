use crate::config::MergeConfig;
use crate::merge::MergeOutcome;
use crate::model::{NamedOutput, Sheet, Table, Value, Workbook};
use crate::naming::NameRegistry;

/// Output file extension. Outputs are always written as xlsx.
pub const OUTPUT_EXTENSION: &str = "xlsx";

/// Hidden sheet appended to every output. Its presence is the processed marker.
pub fn marker_sheet(config: &MergeConfig) -> Sheet {
    let table = Table::new(
        vec!["processed_by".into(), "version".into()],
        vec![vec![Value::text("markmerge"), Value::text(env!("CARGO_PKG_VERSION"))]],
    );
    Sheet { name: config.guard.marker_sheet.clone(), table, hidden: true }
}

/// Name a merged table and wrap it as a marked workbook.
pub fn emit(
    code: &str,
    source: &str,
    outcome: MergeOutcome,
    registry: &NameRegistry,
    config: &MergeConfig,
) -> NamedOutput {
    let file_name = registry.claim(code);
    let rows = outcome.table.row_count();
    let data = Sheet::new(config.output.data_sheet.clone(), outcome.table);
    let workbook = Workbook::new(file_name.clone(), vec![data, marker_sheet(config)]);
    log::info!("created {file_name} from {source} ({rows} rows, {} matched)", outcome.matched);

    NamedOutput {
        file_name,
        code: code.to_string(),
        source: source.to_string(),
        rows,
        matched: outcome.matched,
        workbook,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard;
    use crate::model::SourceFile;

    fn outcome() -> MergeOutcome {
        MergeOutcome { table: Table::new(vec!["Class".into()], vec![vec![Value::Empty]]), matched: 0 }
    }

    #[test]
    fn output_carries_hidden_marker() {
        let config = MergeConfig::default();
        let reg = NameRegistry::new(&config.output.suffix, OUTPUT_EXTENSION);
        let out = emit("CS101", "CS101_tpl.xlsx", outcome(), &reg, &config);
        assert_eq!(out.file_name, "CS101_filled.xlsx");
        assert_eq!(out.workbook.sheets.len(), 2);
        assert_eq!(out.workbook.sheets[0].name, "Sheet1");
        assert!(!out.workbook.sheets[0].hidden);
        assert!(out.workbook.sheets[1].hidden);
        assert_eq!(out.workbook.sheets[1].name, config.guard.marker_sheet);
    }

    #[test]
    fn emitted_workbook_fails_both_guards() {
        let config = MergeConfig::default();
        let reg = NameRegistry::new(&config.output.suffix, OUTPUT_EXTENSION);
        let out = emit("CS101", "CS101_tpl.xlsx", outcome(), &reg, &config);

        assert!(guard::check_file_name(&out.file_name, &config.guard).is_some());
        assert!(guard::check_marker_sheet(&out.workbook, &config.guard).is_some());

        // marker alone, under an innocent name
        let mut renamed = out.workbook.clone();
        renamed.name = "CS101_template.xlsx".into();
        assert!(guard::inspect(&SourceFile::decoded(renamed), &config.guard).is_some());
    }
}
