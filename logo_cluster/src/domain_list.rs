// THEORY:
// The domain list is the batch input and is read once, before any logo is
// fetched. Two formats are understood: the original Parquet export
// (`logos.snappy.parquet`) and a plain comma-separated table. Both must carry a
// `domain` column; a list without it aborts the run. Empty or null cells and
// repeated domains are skipped, so the returned list is unique and keeps file
// order.

use crate::core_modules::domain::Domain;
use crate::error::{Error, Result};
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef};
use indexmap::IndexSet;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::{Path, PathBuf};

/// Name of the required column.
pub const DOMAIN_COLUMN: &str = "domain";

const PARQUET_EXTENSION: &str = "parquet";

/// Produces the deduplicated set of domains to process.
pub trait DomainListSource {
    fn list_domains(&self) -> Result<Vec<Domain>>;
}

/// Picks the reader by file extension: `.parquet` files are read as Parquet,
/// anything else as a comma-separated table.
pub fn from_path(path: impl Into<PathBuf>) -> Box<dyn DomainListSource> {
    let path = path.into();
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PARQUET_EXTENSION));
    if is_parquet {
        Box::new(ParquetFile::new(path))
    } else {
        Box::new(TableFile::new(path))
    }
}

/// A comma-separated text table with a header line.
pub struct TableFile {
    path: PathBuf,
}

impl TableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DomainListSource for TableFile {
    fn list_domains(&self) -> Result<Vec<Domain>> {
        read_table(std::fs::File::open(&self.path)?)
    }
}

/// Extracts the unique, non-empty values of the `domain` column.
pub fn parse_table(contents: &str) -> Result<Vec<Domain>> {
    read_table(contents.as_bytes())
}

fn read_table<R: std::io::Read>(input: R) -> Result<Vec<Domain>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?;
    if headers.is_empty() {
        return Err(Error::EmptyTable);
    }
    let column = headers
        .iter()
        .position(|name| name == DOMAIN_COLUMN)
        .ok_or(Error::MissingColumn { column: DOMAIN_COLUMN })?;

    let mut domains = IndexSet::new();
    for record in reader.records() {
        let record = record?;
        insert_cell(&mut domains, record.get(column));
    }
    Ok(domains.into_iter().collect())
}

/// A Parquet file, as exported by the original pipeline.
pub struct ParquetFile {
    path: PathBuf,
}

impl ParquetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DomainListSource for ParquetFile {
    fn list_domains(&self) -> Result<Vec<Domain>> {
        let file = std::fs::File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let column = builder
            .schema()
            .index_of(DOMAIN_COLUMN)
            .map_err(|_| Error::MissingColumn { column: DOMAIN_COLUMN })?;

        let mut domains = IndexSet::new();
        for batch in builder.build()? {
            let batch = batch?;
            insert_string_column(&mut domains, batch.column(column))?;
        }
        Ok(domains.into_iter().collect())
    }
}

fn insert_string_column(domains: &mut IndexSet<Domain>, column: &ArrayRef) -> Result<()> {
    if let Some(values) = column.as_string_opt::<i32>() {
        values.iter().for_each(|cell| insert_cell(domains, cell));
    } else if let Some(values) = column.as_string_opt::<i64>() {
        values.iter().for_each(|cell| insert_cell(domains, cell));
    } else {
        return Err(Error::ColumnType {
            column: DOMAIN_COLUMN,
            found: column.data_type().to_string(),
        });
    }
    Ok(())
}

fn insert_cell(domains: &mut IndexSet<Domain>, cell: Option<&str>) {
    if let Some(value) = cell.map(str::trim).filter(|v| !v.is_empty()) {
        domains.insert(Domain::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(domains: &[Domain]) -> Vec<&str> {
        domains.iter().map(Domain::as_str).collect()
    }

    #[test]
    fn reads_domain_column_in_file_order() {
        let table = "id,domain,country\n1,zeta.com,RO\n2,alpha.org,DE\n";
        assert_eq!(names(&parse_table(table).unwrap()), ["zeta.com", "alpha.org"]);
    }

    #[test]
    fn drops_blanks_and_duplicates() {
        let table = "domain\nacme.com\n\n\"\"\nacme.com\n  beta.io  \n";
        assert_eq!(names(&parse_table(table).unwrap()), ["acme.com", "beta.io"]);
    }

    #[test]
    fn short_rows_are_skipped() {
        let table = "id,domain\n1\n2,ok.com\n";
        assert_eq!(names(&parse_table(table).unwrap()), ["ok.com"]);
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = parse_table("id,site\n1,acme.com\n").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column: "domain" }));
    }

    #[test]
    fn header_only_is_an_empty_list() {
        assert!(parse_table("domain\n").unwrap().is_empty());
    }

    #[test]
    fn no_header_is_fatal() {
        assert!(matches!(parse_table("").unwrap_err(), Error::EmptyTable));
    }

    #[test]
    fn quoted_cell_with_comma_keeps_columns_aligned() {
        let table = "name,domain\n\"Acme, Inc\",acme.com\n\"Beta\",beta.io\n";
        assert_eq!(names(&parse_table(table).unwrap()), ["acme.com", "beta.io"]);
    }

    #[test]
    fn quoted_header_is_recognised() {
        let table = "\"domain\",\"n\"\n\"acme.com\",1\n";
        assert_eq!(names(&parse_table(table).unwrap()), ["acme.com"]);
    }

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("logo_cluster_{}_{}", std::process::id(), name))
    }

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        use arrow_array::RecordBatch;
        use parquet::arrow::ArrowWriter;
        use parquet::basic::Compression;
        use parquet::file::properties::WriterProperties;

        let batch = RecordBatch::try_from_iter(columns).expect("valid batch");
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = std::fs::File::create(path).expect("create parquet file");
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).expect("writer");
        writer.write(&batch).expect("write batch");
        writer.close().expect("close writer");
    }

    #[test]
    fn parquet_domains_skip_nulls_and_duplicates() {
        use arrow_array::{Int64Array, StringArray};
        use std::sync::Arc;

        let path = scratch_file("logos.snappy.parquet");
        write_parquet(
            &path,
            vec![
                ("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef),
                (
                    "domain",
                    Arc::new(StringArray::from(vec![
                        Some("zeta.com"),
                        None,
                        Some("alpha.org"),
                        Some("zeta.com"),
                        Some(" "),
                    ])) as ArrayRef,
                ),
            ],
        );

        let domains = from_path(&path).list_domains().unwrap();
        assert_eq!(names(&domains), ["zeta.com", "alpha.org"]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parquet_without_domain_column_is_fatal() {
        use arrow_array::StringArray;
        use std::sync::Arc;

        let path = scratch_file("no_domain.parquet");
        write_parquet(
            &path,
            vec![("site", Arc::new(StringArray::from(vec!["acme.com"])) as ArrayRef)],
        );

        let err = ParquetFile::new(&path).list_domains().unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column: "domain" }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parquet_domain_column_must_hold_text() {
        use arrow_array::Int64Array;
        use std::sync::Arc;

        let path = scratch_file("numeric_domain.parquet");
        write_parquet(
            &path,
            vec![("domain", Arc::new(Int64Array::from(vec![7])) as ArrayRef)],
        );

        let err = ParquetFile::new(&path).list_domains().unwrap_err();
        assert!(matches!(err, Error::ColumnType { column: "domain", .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn extension_selects_the_reader() {
        let path = scratch_file("domains.csv");
        std::fs::write(&path, "domain\nacme.com\n").unwrap();
        assert_eq!(names(&from_path(&path).list_domains().unwrap()), ["acme.com"]);
        let _ = std::fs::remove_file(&path);
    }
}
