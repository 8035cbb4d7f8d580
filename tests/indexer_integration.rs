use chrono::NaiveDate;
use indicatif::ProgressBar;
use nikki::{DateExtractor, TextIndex};

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::TestFixture;

fn build_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    fixture.create_diary_file("texts/2023/10/20231015_1749.md", "朝の散歩");
    fixture.create_diary_file(
        "texts/2023/10/walk.md",
        "---\nhappiness score: 9\n---\n2023-10-20 evening walk",
    );
    fixture.create_diary_file("texts/2024/01/new-year.md", "2024年1月1日 元日");
    fixture.create_diary_file("texts/undated.md", "no date");
    fixture.create_raw_file("texts/broken.md", &[0xFF, 0xFE, 0xFD]);
    fixture.create_diary_file("texts/notes.txt", "2022-01-01 not indexed");
    fixture
}

#[tokio::test]
async fn test_index_folder_and_query() {
    let fixture = build_fixture();
    let extractor = DateExtractor::new().unwrap();
    let db_path = fixture.path("texts.db");

    let mut index = TextIndex::open(&db_path).unwrap();
    let summary = index
        .index_folder(&extractor, &fixture.path("texts"), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(summary.indexed, 4);
    assert_eq!(summary.undated, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].0.ends_with("broken.md"));

    // Reopen from disk, as the browse command does
    drop(index);
    let index = TextIndex::open(&db_path).unwrap();

    assert_eq!(index.count().unwrap(), 4);
    assert_eq!(index.years().unwrap(), vec![2024, 2023]);
    assert_eq!(index.months_in_year(2023).unwrap(), vec![10]);

    let october = index.entries_in_month(2023, 10).unwrap();
    assert_eq!(october.len(), 2);
    assert_eq!(october[0].title, "walk");
    assert_eq!(october[0].happiness_score, Some(9));
    assert_eq!(october[1].date, NaiveDate::from_ymd_opt(2023, 10, 15));
    assert_eq!(october[1].char_count, 4);
}

#[tokio::test]
async fn test_rebuild_replaces_previous_index() {
    let fixture = build_fixture();
    let extractor = DateExtractor::new().unwrap();
    let db_path = fixture.path("texts.db");

    let mut index = TextIndex::open(&db_path).unwrap();
    index
        .index_folder(&extractor, &fixture.path("texts"), &ProgressBar::hidden())
        .await
        .unwrap();
    index
        .index_folder(&extractor, &fixture.path("texts/2024"), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(index.count().unwrap(), 1);
    assert_eq!(index.years().unwrap(), vec![2024]);
}
