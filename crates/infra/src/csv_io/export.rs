//! Bulk CSV export of person records.

use csv::Writer;
use tracing::debug;

use roster_core::JobId;
use roster_persons::Person;

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::jobs::ExportArtifact;
use crate::store::{PersonStore, StoreError};

/// Export columns. A superset of the import columns, so an export re-imports
/// as-is.
pub const EXPORT_COLUMNS: [&str; 7] = [
    "name",
    "date_of_birth",
    "cpf",
    "sex",
    "height",
    "weight",
    "ideal_weight",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Artifact name for the export produced by `job_id`.
pub fn export_file_name(job_id: JobId) -> String {
    format!("persons_export_{job_id}.csv")
}

/// Render `persons` (in the given order) as CSV bytes with a header row.
pub fn render_csv(persons: &[Person]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;

    for person in persons {
        writer.write_record([
            person.name.clone(),
            person.date_of_birth.to_string(),
            person.cpf.to_string(),
            person.sex.label().to_string(),
            person.height.to_string(),
            person.weight.to_string(),
            person.ideal_weight().to_string(),
        ])?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Snapshot every record in creation order and store it as an artifact.
pub fn export_csv<P, A>(job_id: JobId, store: &P, artifacts: &A) -> Result<ExportArtifact, ExportError>
where
    P: PersonStore + ?Sized,
    A: ArtifactStore + ?Sized,
{
    let persons = store.list()?;
    let bytes = render_csv(&persons)?;
    let file_name = export_file_name(job_id);
    artifacts.put(&file_name, &bytes)?;

    debug!(%job_id, rows = persons.len(), file = %file_name, "csv export written");
    Ok(ExportArtifact {
        file_name,
        rows: persons.len(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::artifacts::InMemoryArtifactStore;
    use crate::csv_io::import::import_csv;
    use crate::store::InMemoryPersonStore;
    use roster_persons::{Centi, Cpf, PersonFields, Sex};

    fn fields(name: &str, cpf: &str, sex: Sex, height: i64) -> PersonFields {
        PersonFields {
            name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 2).unwrap(),
            cpf: Cpf::parse(cpf).unwrap(),
            sex,
            height: Centi::from_hundredths(height),
            weight: Centi::from_hundredths(8_500),
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let store = InMemoryPersonStore::new();
        store.insert(fields("Bruno", "52998224725", Sex::Male, 180)).unwrap();

        let text = String::from_utf8(render_csv(&store.list().unwrap()).unwrap()).unwrap();
        assert_eq!(
            text,
            "name,date_of_birth,cpf,sex,height,weight,ideal_weight\n\
             Bruno,1990-01-02,52998224725,Male,1.80,85.00,72.86\n"
        );
    }

    #[test]
    fn empty_store_exports_header_only() {
        let store = InMemoryPersonStore::new();
        let artifacts = InMemoryArtifactStore::new();
        let job_id = JobId::new();

        let artifact = export_csv(job_id, &store, &artifacts).unwrap();
        assert_eq!(artifact.rows, 0);
        assert_eq!(artifact.file_name, format!("persons_export_{job_id}.csv"));

        let bytes = artifacts.get(&artifact.file_name).unwrap().unwrap();
        assert_eq!(bytes, b"name,date_of_birth,cpf,sex,height,weight,ideal_weight\n");
    }

    #[test]
    fn export_reimports_cleanly() {
        let source = InMemoryPersonStore::new();
        source.insert(fields("Ana, a primeira", "11144477735", Sex::Female, 160)).unwrap();
        source.insert(fields("Bruno", "52998224725", Sex::Male, 180)).unwrap();

        let artifacts = InMemoryArtifactStore::new();
        let artifact = export_csv(JobId::new(), &source, &artifacts).unwrap();
        let text = String::from_utf8(artifacts.get(&artifact.file_name).unwrap().unwrap()).unwrap();

        let target = InMemoryPersonStore::new();
        let report = import_csv(&text, &target).unwrap();
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.created, 2);

        let before: Vec<PersonFields> = source.list().unwrap().iter().map(Person::fields).collect();
        let after: Vec<PersonFields> = target.list().unwrap().iter().map(Person::fields).collect();
        assert_eq!(before, after);
    }
}
