use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_count_matrix::domain::{
    CountColumn, GeneId, GroupLabel, GroupSpecifier, InputFormat, JoinStrategy,
};
use kira_count_matrix::error::CountMatrixError;

#[test]
fn gene_id_without_version_is_unchanged() {
    let id = GeneId::from_versioned("ENSG00000141510").unwrap();
    assert_eq!(id.as_str(), "ENSG00000141510");
}

#[test]
fn gene_id_keeps_text_before_first_dot() {
    let id = GeneId::from_versioned("ENSG00000141510.17.2").unwrap();
    assert_eq!(id.as_str(), "ENSG00000141510");
}

#[test]
fn group_label_is_lowercased() {
    let label: GroupLabel = "Healthy".parse().unwrap();
    assert_eq!(label.as_str(), "healthy");
    assert_eq!(label.sample_name(0).as_str(), "healthy_0");
}

#[test]
fn group_specifier_defaults_to_star_counts() {
    let spec: GroupSpecifier = "idc: idc1.tsv, idc2.tsv".parse().unwrap();
    assert_eq!(spec.format, InputFormat::StarCounts);
    assert_eq!(
        spec.files,
        vec![Utf8PathBuf::from("idc1.tsv"), Utf8PathBuf::from("idc2.tsv")]
    );
}

#[test]
fn group_specifier_rejects_unknown_format() {
    let err = "idc@bam:x.bam".parse::<GroupSpecifier>().unwrap_err();
    assert_matches!(err, CountMatrixError::InvalidGroupSpecifier(_));
}

#[test]
fn group_specifier_requires_files() {
    let err = "idc:".parse::<GroupSpecifier>().unwrap_err();
    assert_matches!(err, CountMatrixError::InvalidGroupSpecifier(_));
}

#[test]
fn defaults_match_existing_behaviour() {
    assert_eq!(JoinStrategy::default(), JoinStrategy::Inner);
    assert_eq!(CountColumn::default().header(), "unstranded");
}
