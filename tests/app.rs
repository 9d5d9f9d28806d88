use std::cell::RefCell;
use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use kira_count_matrix::app::{self, App, BuildOptions, ProgressEvent, ProgressSink};
use kira_count_matrix::config::{Config, ConfigLoader, GroupEntry, GroupEntryObject};
use kira_count_matrix::domain::{InputFormat, JoinStrategy};
use kira_count_matrix::error::CountMatrixError;
use kira_count_matrix::output::JsonOutput;

#[derive(Default)]
struct RecordingSink {
    messages: RefCell<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.borrow_mut().push(event.message);
    }
}

fn star(rows: &[(&str, &str, u64)]) -> String {
    let mut out = String::from(
        "# gene-model: GENCODE v36\n\
gene_id\tgene_name\tgene_type\tunstranded\tstranded_first\tstranded_second\n\
N_unmapped\t\t\t1000\t1000\t1000\n",
    );
    for (id, gene_type, count) in rows {
        out.push_str(&format!("{id}\tNAME\t{gene_type}\t{count}\t0\t0\n"));
    }
    out
}

fn group(label: &str, format: InputFormat, files: &[&str], limit: Option<usize>) -> GroupEntry {
    GroupEntry::Detailed(GroupEntryObject {
        label: label.to_string(),
        format: Some(format),
        files: files.iter().map(|file| file.to_string()).collect(),
        count_column: None,
        sample_limit: limit,
    })
}

struct Fixture {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let fixture = Self { _temp: temp, root };

        fixture.write(
            "asc_dat/asc1.tsv",
            &star(&[
                ("ENSG01.1", "protein_coding", 10),
                ("ENSG02.4", "protein_coding", 20),
                ("ENSG03.2", "protein_coding", 30),
                ("ENSG09.1", "lncRNA", 90),
            ]),
        );
        fixture.write(
            "asc_dat/asc2.tsv",
            &star(&[
                ("ENSG01.1", "protein_coding", 11),
                ("ENSG02.4", "protein_coding", 21),
                ("ENSG03.2", "protein_coding", 31),
            ]),
        );
        fixture.write(
            "idc_dat/idc1.tsv",
            &star(&[
                ("ENSG01.1", "protein_coding", 12),
                ("ENSG02.4", "protein_coding", 22),
                ("ENSG03.2", "protein_coding", 32),
                ("ENSG09.1", "lncRNA", 92),
            ]),
        );
        // ENSG01 is missing from this sample only.
        fixture.write(
            "idc_dat/idc2.tsv",
            &star(&[
                ("ENSG02.4", "protein_coding", 23),
                ("ENSG03.2", "protein_coding", 33),
            ]),
        );
        fixture.write(
            "gtex/healthy.gct",
            "#1.2\n4\t3\n\
Name\tDescription\tGTEX-A\tGTEX-B\tGTEX-C\n\
ENSG01.9\tA\t1\t2\t3\n\
ENSG02.9\tB\t4\t5\t6\n\
ENSG03.9\tC\t7\t8\t9\n\
ENSG09.9\tD\t0\t0\t0\n",
        );
        fixture
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
        fs::write(path.as_std_path(), content).unwrap();
    }

    fn config(&self) -> Config {
        Config {
            groups: vec![
                group(
                    "asc",
                    InputFormat::StarCounts,
                    &["asc_dat/asc1.tsv", "asc_dat/asc2.tsv"],
                    None,
                ),
                group(
                    "idc",
                    InputFormat::StarCounts,
                    &["idc_dat/idc1.tsv", "idc_dat/idc2.tsv"],
                    None,
                ),
                group("healthy", InputFormat::Gct, &["gtex/healthy.gct"], Some(2)),
            ],
            ..Config::default()
        }
    }

    fn app(&self) -> App {
        App::new(ConfigLoader::resolve_config(self.config(), &self.root).unwrap())
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative).as_std_path()).unwrap()
    }
}

#[test]
fn gene_missing_from_one_sample_is_dropped() {
    let fixture = Fixture::new();
    let result = fixture
        .app()
        .build(BuildOptions::default(), &JsonOutput)
        .unwrap();

    let matrix = fixture.read("deseq_inputs/count_matrix.csv");
    assert_eq!(
        matrix,
        "gene_id\tasc_0\tasc_1\tidc_0\tidc_1\thealthy_0\thealthy_1\n\
ENSG02\t20\t21\t22\t23\t4\t5\n\
ENSG03\t30\t31\t32\t33\t7\t8\n"
    );
    assert!(!matrix.contains("ENSG01"));
    assert!(!matrix.contains("ENSG09"));
    assert_eq!(result.assembly.genes, 2);
    assert_eq!(result.assembly.incomplete_rows_dropped, 1);
}

#[test]
fn coldata_matches_matrix_columns() {
    let fixture = Fixture::new();
    let result = fixture
        .app()
        .build(BuildOptions::default(), &JsonOutput)
        .unwrap();

    let coldata = fixture.read("deseq_inputs/coldata.csv");
    assert_eq!(
        coldata,
        "idx\tcondition\n\
asc_0\tasc\nasc_1\tasc\n\
idc_0\tidc\nidc_1\tidc\n\
healthy_0\thealthy\nhealthy_1\thealthy\n"
    );
    let check = app::check(
        Utf8Path::new(&result.outputs.count_matrix),
        Utf8Path::new(&result.outputs.coldata),
        &JsonOutput,
    )
    .unwrap();
    assert!(check.consistent);
    assert_eq!(check.samples, 6);
}

#[test]
fn group_stats_report_union_per_group() {
    let fixture = Fixture::new();
    let result = fixture
        .app()
        .build(BuildOptions::default(), &JsonOutput)
        .unwrap();

    let idc = result.groups.iter().find(|group| group.label == "idc").unwrap();
    assert_eq!(idc.samples, 2);
    assert_eq!(idc.genes, 3);
    assert_eq!(result.inputs.len(), 5);
    assert!(result.inputs.iter().take(4).all(|input| input.rows_kept <= input.rows_read));
}

#[test]
fn outer_cross_join_keeps_same_genes() {
    let fixture = Fixture::new();
    let app = App::new(
        ConfigLoader::resolve_config(fixture.config(), &fixture.root)
            .unwrap()
            .with_overrides(None, Some(JoinStrategy::Outer)),
    );
    let result = app.build(BuildOptions::default(), &JsonOutput).unwrap();

    assert_eq!(result.assembly.join, JoinStrategy::Outer);
    assert_eq!(result.assembly.genes, 2);
    // ENSG09 reaches the outer join through healthy and is removed as incomplete.
    assert_eq!(result.assembly.genes_after_join, 4);
}

#[test]
fn summary_and_manifest_are_written() {
    let fixture = Fixture::new();
    let sink = RecordingSink::default();
    fixture
        .app()
        .build(
            BuildOptions {
                summary: true,
                dry_run: false,
            },
            &sink,
        )
        .unwrap();

    let medians = fixture.read("deseq_inputs/group_medians.tsv");
    assert_eq!(
        medians,
        "gene_id\tasc\tidc\thealthy\nENSG02\t20.5\t22.5\t4.5\nENSG03\t30.5\t32.5\t7.5\n"
    );
    let manifest: serde_json::Value =
        serde_json::from_str(&fixture.read("deseq_inputs/manifest.json")).unwrap();
    assert_eq!(manifest["assembly"]["genes"], 2);
    assert_eq!(manifest["samples"].as_array().unwrap().len(), 6);
    assert!(
        sink.messages
            .borrow()
            .iter()
            .any(|message| message.starts_with("phase=Assemble"))
    );
}

#[test]
fn dry_run_writes_nothing() {
    let fixture = Fixture::new();
    let result = fixture
        .app()
        .build(
            BuildOptions {
                summary: false,
                dry_run: true,
            },
            &JsonOutput,
        )
        .unwrap();

    assert!(result.dry_run);
    assert!(!fixture.root.join("deseq_inputs").as_std_path().exists());
}

#[test]
fn missing_input_aborts_the_run() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.root.join("idc_dat/idc2.tsv").as_std_path()).unwrap();
    let err = fixture
        .app()
        .build(BuildOptions::default(), &JsonOutput)
        .unwrap_err();

    assert_matches!(err, CountMatrixError::InputOpen { path, .. } if path.ends_with("idc2.tsv"));
    assert!(!fixture.root.join("deseq_inputs").as_std_path().exists());
}

#[test]
fn coldata_command_uses_planned_layout() {
    let fixture = Fixture::new();
    let result = fixture.app().coldata(false, &JsonOutput).unwrap();

    assert_eq!(result.rows, 6);
    let coldata = fixture.read("deseq_inputs/coldata.csv");
    assert!(coldata.ends_with("healthy_1\thealthy\n"));
}

#[test]
fn coldata_command_follows_short_gct_file() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.groups[2] = group("healthy", InputFormat::Gct, &["gtex/healthy.gct"], Some(7));
    let app = App::new(ConfigLoader::resolve_config(config, &fixture.root).unwrap());

    let build = app.build(BuildOptions::default(), &JsonOutput).unwrap();
    assert_eq!(build.samples.len(), 7);
    let result = app.coldata(false, &JsonOutput).unwrap();
    assert_eq!(result.rows, 7);

    let check = app::check(
        &fixture.root.join("deseq_inputs/count_matrix.csv"),
        &fixture.root.join("deseq_inputs/coldata.csv"),
        &JsonOutput,
    )
    .unwrap();
    assert!(check.consistent);
}

#[test]
fn check_detects_renamed_column() {
    let fixture = Fixture::new();
    fixture.write("m.tsv", "gene_id\tasc_0\tidc_0\nG1\t1\t2\n");
    fixture.write("c.tsv", "idx\tcondition\nasc_0\tasc\nidc_1\tidc\n");

    let err = app::check(
        &fixture.root.join("m.tsv"),
        &fixture.root.join("c.tsv"),
        &JsonOutput,
    )
    .unwrap_err();
    assert_matches!(err, CountMatrixError::ColdataMismatch(_));
}

#[test]
fn init_refuses_to_overwrite() {
    let fixture = Fixture::new();
    let path = fixture.root.join("kira-cm.json");
    let result = app::init_config(&path, false, &JsonOutput).unwrap();
    assert_eq!(result.groups, 3);

    let err = app::init_config(&path, false, &JsonOutput).unwrap_err();
    assert_matches!(err, CountMatrixError::ConfigExists(_));
    assert!(app::init_config(&path, true, &JsonOutput).is_ok());

    let resolved = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(resolved.groups[0].files.len(), 7);
    assert_eq!(App::new(resolved).planned_coldata().len(), 21);
}
