use std::fs;
use tempfile::TempDir;

use bfsi_core::data_processor::DataProcessor;

const LONG_A: &str = "Prepayment charges on floating-rate home loans are waived for individual borrowers.";
const LONG_B: &str = "Late payment of an EMI attracts a penal charge of 2% per month on the overdue amount.";

#[test]
fn process_directory_keeps_only_long_paragraphs() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("loans.txt"), format!("{LONG_A}\n\nShort line.\n\n{LONG_B}\n")).unwrap();

    let chunks = DataProcessor::new().process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 2, "the short paragraph is dropped");
    assert_eq!(chunks[0].id, "loans.txt_0");
    // fragment 1 was dropped, so the next kept chunk keeps index 2
    assert_eq!(chunks[1].id, "loans.txt_2");
    assert_eq!(chunks[1].text, LONG_B);
    assert!(chunks.iter().all(|c| c.source == "loans.txt"));
}

#[test]
fn process_directory_ignores_non_txt_and_nested_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), LONG_A).unwrap();
    fs::write(dir.join("notes.md"), LONG_B).unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("b.txt"), LONG_B).unwrap();

    let chunks = DataProcessor::new().process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].source, "a.txt");
}

#[test]
fn exactly_fifty_characters_is_dropped() {
    let fifty = "x".repeat(50);
    let fifty_one = "y".repeat(51);
    let chunks = DataProcessor::new().chunk_content(&format!("  {fifty}  \n\n{fifty_one}"), "f.txt");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, fifty_one);
    assert_eq!(chunks[0].id, "f.txt_1");
}

#[test]
fn missing_directory_yields_no_chunks() {
    let tmp = TempDir::new().unwrap();
    let chunks = DataProcessor::new().process_directory(&tmp.path().join("absent")).expect("process");
    assert!(chunks.is_empty());
}
