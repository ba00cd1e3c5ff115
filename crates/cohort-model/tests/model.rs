//! Tests for cohort-model types.

use cohort_model::{
    CohortConfig, JoinKind, LinkOptions, MatchDirection, ModelError, PetAnchor, RegionCatalog,
    RegionCatalogEntry, ScanState, region_output_column,
};

#[test]
fn default_options_describe_tau_and_amyloid() {
    let options = LinkOptions::default();
    assert_eq!(options.primary.name, "TAU");
    assert_eq!(options.primary.qc.excluded_categories, vec!["MK6240"]);
    assert_eq!(options.primary.pet_anchor, PetAnchor::Scan);
    assert_eq!(options.secondary.pet_join, JoinKind::Inner);
    assert!(options.secondary.dedupe_metadata);
    assert_eq!(options.tolerance_days, 365);
    assert_eq!(options.direction, MatchDirection::Nearest);
    assert_eq!(options.modality_tags(), vec!["", "_TAU", "_AMY"]);
    assert_eq!(options.primary.scan_date_column(), "SCANDATE_TAU");
    options.validate().expect("defaults are valid");
}

#[test]
fn validate_rejects_non_positive_tolerance() {
    let options = LinkOptions {
        tolerance_days: 0,
        ..LinkOptions::default()
    };
    let err = options.validate().unwrap_err();
    assert!(matches!(err, ModelError::InvalidOption { ref option, .. } if option == "tolerance_days"));
}

#[test]
fn validate_rejects_shared_tags() {
    let mut options = LinkOptions::default();
    options.secondary.tag = options.primary.tag.clone();
    assert!(options.validate().is_err());
}

#[test]
fn partial_toml_config_keeps_defaults() {
    let config: CohortConfig = toml::from_str(
        r#"
[sources]
registry = "REGISTRY_2024.csv"

[options]
tolerance_days = 180
direction = "backward"
"#,
    )
    .expect("parse config");
    assert_eq!(config.sources.registry.to_str(), Some("REGISTRY_2024.csv"));
    assert_eq!(config.sources.tau_pet.to_str(), Some("taupet.csv"));
    assert_eq!(config.options.tolerance_days, 180);
    assert_eq!(config.options.direction, MatchDirection::Backward);
    assert_eq!(config.options.primary.name, "TAU");
}

#[test]
fn validate_rejects_empty_suffixes() {
    let options = LinkOptions {
        registry_suffix: String::new(),
        ..LinkOptions::default()
    };
    let err = options.validate().unwrap_err();
    assert!(matches!(err, ModelError::InvalidOption { ref option, .. } if option == "registry_suffix"));

    let mut options = LinkOptions::default();
    options.secondary.pet_suffix = String::new();
    let err = options.validate().unwrap_err();
    assert!(
        matches!(err, ModelError::InvalidOption { ref option, .. } if option == "AMY.pet_suffix")
    );

    let mut options = LinkOptions::default();
    options.primary.tag = String::new();
    assert!(options.validate().is_err());
}

#[test]
fn partial_modality_table_keeps_modality_defaults() {
    let config: CohortConfig = toml::from_str(
        r#"
[options.primary.qc]
excluded_categories = []

[options.secondary]
dedupe_metadata = false
"#,
    )
    .expect("parse config");
    let primary = &config.options.primary;
    assert_eq!(primary.name, "TAU");
    assert_eq!(primary.tag, "_TAU");
    assert_eq!(primary.qc.pass_value, "2");
    assert!(primary.qc.excluded_categories.is_empty());
    assert_eq!(primary.pet_suffix, "_TAUINFO");

    let secondary = &config.options.secondary;
    assert_eq!(secondary.name, "AMY");
    assert!(!secondary.dedupe_metadata);
    assert_eq!(secondary.pet_anchor, PetAnchor::Metadata);
    assert_eq!(secondary.pet_suffix, "_AMYPET");
    config.options.validate().expect("patched options are valid");
}

#[test]
fn full_options_round_trip_through_toml() {
    let options = LinkOptions::default();
    let text = toml::to_string(&options).expect("serialize options");
    let parsed: LinkOptions = toml::from_str(&text).expect("parse options");
    assert_eq!(parsed, options);
}

#[test]
fn join_kind_accepts_outer_alias() {
    let kind: JoinKind = serde_json::from_str("\"outer\"").expect("parse alias");
    assert_eq!(kind, JoinKind::Left);
}

#[test]
fn catalog_orders_by_position_and_flags_subcortical() {
    let catalog = RegionCatalog::new(vec![
        RegionCatalogEntry::new("Left-Amygdala", 1, true),
        RegionCatalogEntry::new("ctx-lh-bankssts", 0, false),
    ]);
    let columns: Vec<&str> = catalog
        .entries()
        .iter()
        .map(|entry| entry.output_column.as_str())
        .collect();
    assert_eq!(columns, vec!["CTX_LH_BANKSSTS_SUVR", "LEFT_AMYGDALA_SUVR"]);
    let cortical: Vec<&str> = catalog.cortical().map(|e| e.region_label.as_str()).collect();
    assert_eq!(cortical, vec!["ctx-lh-bankssts"]);
    assert!(catalog.by_output_column("LEFT_AMYGDALA_SUVR").is_some());
}

#[test]
fn from_labels_applies_positions_once() {
    let labels = ["a", "b", "c"];
    let catalog = RegionCatalog::from_labels(&labels, &[1]);
    let flags: Vec<bool> = catalog.entries().iter().map(|e| e.is_subcortical).collect();
    assert_eq!(flags, vec![false, true, false]);
    assert_eq!(region_output_column("a"), "A_SUVR");
}

#[test]
fn terminal_states() {
    assert!(ScanState::Accepted.is_terminal());
    assert!(ScanState::RejectedByGap.is_terminal());
    assert!(!ScanState::VisitMatched.is_terminal());
}
