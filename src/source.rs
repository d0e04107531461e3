use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::domain::CvaError;
use crate::records::{FieldCatalog, Record, Value};

/// Query parameters forwarded to the backend data set. Month and year
/// always apply; day, office and user narrow further when present.
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    pub day: Option<u32>,
    pub month: u32,
    pub year: i32,
    pub office_id: Option<u64>,
    pub user_id: Option<u64>,
}

impl FetchQuery {
    fn date_prefix(&self) -> String {
        match self.day {
            Some(day) => format!("{:04}-{:02}-{:02}", self.year, self.month, day),
            None => format!("{:04}-{:02}", self.year, self.month),
        }
    }
}

/// Error shape surfaced by a failed fetch: a message, optionally with
/// field-level validation details. The table layer never interprets
/// this beyond its presence.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub message: String,
    pub field_errors: HashMap<String, Vec<String>>,
}

impl FetchError {
    pub fn message(message: impl Into<String>) -> Self {
        FetchError {
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct FetchResponse {
    pub generation: u64,
    pub result: Result<Vec<Record>, FetchError>,
}

/// Loads record lists off the UI thread. Every fetch carries a
/// generation number; responses from superseded fetches are identified
/// by a stale generation and must be dropped by the receiver, so an
/// old in-flight load can never overwrite newer state.
pub struct DataSource {
    path: PathBuf,
    catalog: FieldCatalog,
    query: FetchQuery,
    generation: u64,
    sender: Sender<FetchResponse>,
    receiver: Receiver<FetchResponse>,
}

impl DataSource {
    pub fn new(path: PathBuf, catalog: FieldCatalog, query: FetchQuery) -> Self {
        let (sender, receiver) = channel();
        DataSource {
            path,
            catalog,
            query,
            generation: 0,
            sender,
            receiver,
        }
    }

    pub fn query(&self) -> &FetchQuery {
        &self.query
    }

    /// Change the query parameters; the caller follows up with a
    /// fetch, which supersedes anything still in flight.
    pub fn set_query(&mut self, query: FetchQuery) {
        self.query = query;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Kick off a load on a worker thread. Returns the new generation.
    pub fn fetch(&mut self) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let sender = self.sender.clone();
        let path = self.path.clone();
        let catalog = self.catalog.clone();
        let query = self.query.clone();

        thread::spawn(move || {
            let result = load_records(&path, &catalog, &query)
                .map_err(|e| FetchError::message(format!("{e:?}")));
            // Receiver may be gone during shutdown.
            let _ = sender.send(FetchResponse { generation, result });
        });
        generation
    }

    /// Re-run the current query. User-triggered only.
    pub fn refetch(&mut self) -> u64 {
        self.fetch()
    }

    /// Non-blocking poll for a finished load.
    pub fn try_recv(&self) -> Option<FetchResponse> {
        self.receiver.try_recv().ok()
    }
}

fn check_file(path: &Path) -> Result<(), CvaError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CvaError::FileNotFound,
        ErrorKind::PermissionDenied => CvaError::PermissionDenied,
        _ => CvaError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(CvaError::LoadingFailed("Not a file!".into()));
    }
    Ok(())
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

// Columns the query filters on even when the catalog does not show them.
const ID_COLUMN: &str = "id";
const OFFICE_COLUMN: &str = "office_id";
const USER_COLUMN: &str = "user_id";

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PolarsError> {
    let col = df.column(name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

fn field_value(field: &str, raw: Option<&str>) -> Value {
    let Some(s) = raw else { return Value::Null };
    let s = s.trim();
    if s.is_empty() {
        return Value::Null;
    }
    match field {
        // Multiple phone numbers arrive joined with semicolons.
        "phones" => Value::List(s.split(';').map(|p| p.trim().to_string()).collect()),
        "value" => match s.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(s.to_string()),
        },
        "startDate" | "endDate" => Value::Date(s.to_string()),
        _ => Value::Text(s.to_string()),
    }
}

/// Load the data file, project the catalog's fields and apply the
/// query constraints. Row order of the file is preserved.
pub fn load_records(
    path: &Path,
    catalog: &FieldCatalog,
    query: &FetchQuery,
) -> Result<Vec<Record>, CvaError> {
    check_file(path)?;
    let start_time = Instant::now();

    let df = load_csv(path)?.collect()?;
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Pull each catalog column as strings, one column per thread.
    let wanted: Vec<&str> = catalog
        .names()
        .filter(|name| present.iter().any(|p| p == name))
        .collect();
    let loaded: Result<Vec<(String, Vec<Option<String>>)>, PolarsError> = wanted
        .par_iter()
        .map(|name| string_column(&df, name).map(|data| (name.to_string(), data)))
        .collect();
    let columns = loaded?;
    for (name, data) in columns.iter() {
        debug!("Column \"{}\": {} rows", name, data.len());
    }

    let aux = |name: &str| -> Option<Vec<Option<String>>> {
        if present.iter().any(|p| p == name) {
            string_column(&df, name).ok()
        } else {
            None
        }
    };
    let ids = aux(ID_COLUMN);
    let offices = aux(OFFICE_COLUMN);
    let users = aux(USER_COLUMN);

    let nrows = df.height();
    let date_field = if catalog.contains("endDate") {
        "endDate"
    } else {
        "startDate"
    };
    let date_prefix = query.date_prefix();

    let mut records = Vec::with_capacity(nrows);
    for row in 0..nrows {
        let lookup = |col: &Option<Vec<Option<String>>>| -> Option<String> {
            col.as_ref().and_then(|c| c.get(row).cloned().flatten())
        };

        if let Some(office_id) = query.office_id
            && lookup(&offices) != Some(office_id.to_string())
        {
            continue;
        }
        if let Some(user_id) = query.user_id
            && lookup(&users) != Some(user_id.to_string())
        {
            continue;
        }

        let id = lookup(&ids)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(row as u64 + 1);
        let mut record = Record::new(id);
        for (name, data) in columns.iter() {
            record.set(name, field_value(name, data[row].as_deref()));
        }

        if query.month != 0 {
            let in_range = match record.get(date_field) {
                Value::Date(d) => d.starts_with(&date_prefix),
                _ => false,
            };
            if !in_range {
                continue;
            }
        }

        records.push(record);
    }

    let elapsed = start_time.elapsed().as_millis();
    info!(
        "Loaded {} of {} rows from {:?} in {}ms",
        records.len(),
        nrows,
        path,
        elapsed
    );
    trace!("Query: {:?}, date prefix \"{}\"", query, date_prefix);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{affiliation_catalog, unsubscription_catalog};
    use std::io::Write;

    fn write_fixture(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cva-test-{}-{}.csv", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const AFFILIATIONS: &str = "\
id,fullName,document,phones,office,plan,value,startDate,status,office_id
1,Ana Gomez,1020304050,3001112222;3015556666,Centro,Familiar,150000,2026-08-02,activo,10
2,Luis Ruiz,1122334455,3003334444,Norte,Individual,200000,2026-08-15,activo,20
3,Marta Diaz,9988776655,,Centro,Familiar,99000,2026-07-30,retirado,10
";

    #[test]
    fn loads_and_filters_by_month() {
        let path = write_fixture("month", AFFILIATIONS);
        let query = FetchQuery {
            month: 8,
            year: 2026,
            ..Default::default()
        };
        let records = load_records(&path, &affiliation_catalog(), &query).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("fullName").display(), "Ana Gomez");
        assert_eq!(
            records[0].get("phones"),
            &Value::List(vec!["3001112222".into(), "3015556666".into()])
        );
        assert_eq!(records[1].get("value"), &Value::Number(200000.0));
        assert_eq!(
            records[1].get("phones"),
            &Value::List(vec!["3003334444".into()])
        );
    }

    #[test]
    fn office_filter_narrows_rows() {
        let path = write_fixture("office", AFFILIATIONS);
        let query = FetchQuery {
            month: 8,
            year: 2026,
            office_id: Some(10),
            ..Default::default()
        };
        let records = load_records(&path, &affiliation_catalog(), &query).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), 1);
    }

    #[test]
    fn day_filter_matches_exact_date() {
        let path = write_fixture("day", AFFILIATIONS);
        let query = FetchQuery {
            day: Some(15),
            month: 8,
            year: 2026,
            ..Default::default()
        };
        let records = load_records(&path, &affiliation_catalog(), &query).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("fullName").display(), "Luis Ruiz");
    }

    #[test]
    fn missing_file_reports_not_found() {
        let query = FetchQuery::default();
        let err = load_records(
            Path::new("/definitely/not/here.csv"),
            &affiliation_catalog(),
            &query,
        )
        .unwrap_err();
        assert!(matches!(err, CvaError::FileNotFound));
    }

    #[test]
    fn unsubscriptions_use_end_date() {
        let content = "\
id,fullName,document,endDate,value,paymentStatus
1,Ana Gomez,1020304050,2026-08-10,150000,pendiente
2,Luis Ruiz,1122334455,2026-06-01,200000,pagado
";
        let path = write_fixture("unsub", content);
        let query = FetchQuery {
            month: 8,
            year: 2026,
            ..Default::default()
        };
        let records = load_records(&path, &unsubscription_catalog(), &query).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("paymentStatus").display(), "pendiente");
    }

    #[test]
    fn fetch_bumps_generation_and_delivers() {
        let path = write_fixture("gen", AFFILIATIONS);
        let query = FetchQuery {
            month: 8,
            year: 2026,
            ..Default::default()
        };
        let mut source = DataSource::new(path.clone(), affiliation_catalog(), query);
        assert_eq!(source.generation(), 0);
        let generation = source.fetch();
        assert_eq!(generation, 1);
        assert!(source.is_current(generation));

        // Worker delivers on the channel; block briefly for it.
        let response = source
            .receiver
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(response.generation, 1);
        assert_eq!(response.result.unwrap().len(), 2);
    }

    #[test]
    fn newer_fetch_makes_older_generation_stale() {
        let path = write_fixture("stale", AFFILIATIONS);
        let query = FetchQuery {
            month: 8,
            year: 2026,
            ..Default::default()
        };
        let mut source = DataSource::new(path.clone(), affiliation_catalog(), query);
        let first = source.fetch();
        let second = source.refetch();
        fs::remove_file(&path).ok();
        assert!(!source.is_current(first));
        assert!(source.is_current(second));
    }
}
