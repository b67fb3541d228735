//! CLI command tests

use std::io::Write;

use clap::CommandFactory;

use crate::cli::Cli;
use crate::commands::{self, truncate};

#[test]
fn test_cli_definition() {
    Cli::command().debug_assert();
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a rather long label", 10), "a rathe...");
}

#[test]
fn test_truncate_cuts_on_character_boundary() {
    // Accented labels must not be sliced mid-character.
    assert_eq!(truncate("élégance décontractée", 10), "éléganc...");
    assert_eq!(truncate("été", 10), "été");
}

fn write_sample_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("catalog.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "name,reference,condition,weight,quantity,price,manufacturer,categories,attributes,features"
    )
    .unwrap();
    writeln!(
        file,
        "Shirt,SH-01,new,0.2,5,10.50,Acme,Tops,Color:Red,Composition:Cotton"
    )
    .unwrap();
    writeln!(file, "Robe,RB-02,used,0.5,2,30,,Robes,Color:Blue,").unwrap();
    path
}

#[test]
fn test_init_import_and_browse_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let csv = write_sample_csv(dir.path());

    commands::cmd_init(&db_path).unwrap();
    commands::cmd_import(&db_path, &csv, "EUR").unwrap();

    commands::cmd_count(&db_path, "", None).unwrap();
    commands::cmd_facets(&db_path, "Categories-Tops", None, false).unwrap();
    commands::cmd_facets(&db_path, "", None, true).unwrap();
    commands::cmd_products(&db_path, "Color-Red", None, 10, 0, false).unwrap();
    commands::cmd_products(&db_path, "", None, 10, 0, true).unwrap();
}

#[test]
fn test_reindex_after_import() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let csv = write_sample_csv(dir.path());

    commands::cmd_import(&db_path, &csv, "EUR").unwrap();
    commands::cmd_reindex(&db_path, "USD").unwrap();
}

#[test]
fn test_facets_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let csv = write_sample_csv(dir.path());
    commands::cmd_import(&db_path, &csv, "EUR").unwrap();

    let config = dir.path().join("facets.toml");
    std::fs::write(
        &config,
        r#"
        [[facet]]
        label = "Categories"
        type = "category"

        [[facet]]
        label = "Price"
        type = "price"
        unit = "€"
        "#,
    )
    .unwrap();

    commands::cmd_facets(&db_path, "", Some(&config), false).unwrap();
}

#[test]
fn test_import_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let result = commands::cmd_import(&db_path, &dir.path().join("nope.csv"), "EUR");
    assert!(result.is_err());
}
