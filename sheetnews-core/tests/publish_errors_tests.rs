use sheetnews_core::sheets::{FormatRequest, SheetsBackend, SheetsError, TabHandle};
use sheetnews_core::table::Grid;
use sheetnews_core::{MemoryBackend, NewsConfig, Pipeline};

const SOURCE_TAB: &str = "Архив новостей (исходный формат)";

#[derive(Clone, Copy)]
enum Failure {
    EmptyBatch,
    ServerError,
}

impl Failure {
    fn error(self) -> SheetsError {
        match self {
            Failure::EmptyBatch => SheetsError::EmptyBatch,
            Failure::ServerError => SheetsError::Api {
                status: 500,
                message: "Internal error encountered.".to_string(),
            },
        }
    }
}

/// Memory spreadsheet whose formatting calls fail for one tab
struct FailingBackend {
    inner: MemoryBackend,
    tab: String,
    failure: Failure,
    written: Vec<String>,
}

impl FailingBackend {
    fn new(tab: &str, failure: Failure) -> Self {
        Self {
            inner: MemoryBackend::new().with_tab(SOURCE_TAB, submissions()),
            tab: tab.to_string(),
            failure,
            written: Vec::new(),
        }
    }
}

impl SheetsBackend for FailingBackend {
    fn find_tab(&mut self, title: &str) -> Result<Option<TabHandle>, SheetsError> {
        self.inner.find_tab(title)
    }

    fn add_tab(&mut self, title: &str, rows: u32, columns: u32) -> Result<TabHandle, SheetsError> {
        self.inner.add_tab(title, rows, columns)
    }

    fn read_values(&mut self, tab: &TabHandle) -> Result<Vec<Vec<String>>, SheetsError> {
        self.inner.read_values(tab)
    }

    fn replace_contents(&mut self, tab: &TabHandle, grid: &Grid) -> Result<(), SheetsError> {
        self.inner.replace_contents(tab, grid)?;
        self.written.push(tab.title.clone());
        Ok(())
    }

    fn apply_formatting(
        &mut self,
        tab: &TabHandle,
        requests: &[FormatRequest],
    ) -> Result<(), SheetsError> {
        if tab.title == self.tab {
            return Err(self.failure.error());
        }
        self.inner.apply_formatting(tab, requests)
    }
}

fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn submissions() -> Vec<Vec<String>> {
    strings(&[
        &["Отметка времени", "Направление", "Новость - Запущено"],
        &["01.03.2024 10:00:00", "M2M", "Датчики"],
        &["04.03.2024 11:00:00", "UC", "ВКС"],
    ])
}

#[test]
fn test_empty_batch_is_ignored() -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(
        NewsConfig::default(),
        FailingBackend::new("UC", Failure::EmptyBatch),
    );
    let report = pipeline.run()?;
    assert_eq!(report.categories.len(), 4);

    let backend = pipeline.into_backend();
    assert_eq!(
        backend.written,
        vec![
            "M2M",
            "UC",
            "Связь для бизнеса",
            "Конвергентные продукты для бизнеса"
        ]
    );
    let uc = backend.inner.tab("UC").expect("UC tab");
    assert_eq!(uc.value(1, 1), "ВКС");
    assert_eq!(uc.frozen_rows, 0);
    assert_eq!(backend.inner.tab("M2M").expect("M2M tab").frozen_rows, 1);

    Ok(())
}

#[test]
fn test_remote_error_stops_the_run() {
    let mut pipeline = Pipeline::new(
        NewsConfig::default(),
        FailingBackend::new("M2M", Failure::ServerError),
    );
    let err = pipeline.run().unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("M2M"));
    assert!(message.contains("500"));
    assert!(matches!(
        err.root_cause().downcast_ref::<SheetsError>(),
        Some(SheetsError::Api { status: 500, .. })
    ));

    let backend = pipeline.into_backend();
    assert_eq!(backend.written, vec!["M2M"]);
    assert!(backend.inner.tab("UC").is_none());
}
