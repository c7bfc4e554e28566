use std::{collections::HashSet, io::Read};

use serde::Deserialize;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::MAX_CHAR_LENGTH,
    error::{Error, QueryError, TypeError},
    validation::validate_tag,
};

const IMPORT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Reads headerless `name,measurement_unit` rows. Fields are trimmed and blank rows skipped.
pub fn parse_ingredients_csv<R: Read>(reader: R) -> Result<Vec<IngredientRecord>, Error> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in csv.records() {
        let record = result.map_err(|e| invalid_row(error_line(&e), &e.to_string()))?;
        let line = record.position().map_or(0, |p| p.line());

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() != 2 {
            return Err(invalid_row(
                line,
                &format!("expected 2 columns, found {}", record.len()),
            ));
        }

        let (name, unit) = (&record[0], &record[1]);
        if name.is_empty() || unit.is_empty() {
            return Err(invalid_row(line, "name and measurement unit are required"));
        }
        if name.chars().count() > MAX_CHAR_LENGTH || unit.chars().count() > MAX_CHAR_LENGTH {
            return Err(invalid_row(
                line,
                &format!("values can't be longer than {MAX_CHAR_LENGTH} characters"),
            ));
        }

        records.push(IngredientRecord {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        });
    }

    Ok(records)
}

/// Reads `name,color,slug` rows below a header line.
pub fn parse_tags_csv<R: Read>(reader: R) -> Result<Vec<TagRecord>, Error> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| invalid_row(error_line(&e), &e.to_string()))?
        .clone();

    let mut records = Vec::new();
    for result in csv.records() {
        let row = result.map_err(|e| invalid_row(error_line(&e), &e.to_string()))?;
        let line = row.position().map_or(0, |p| p.line());
        let record: TagRecord = row
            .deserialize(Some(&headers))
            .map_err(|e| invalid_row(line, &e.to_string()))?;

        let errors = validate_tag(&record.name, &record.color, &record.slug);
        if !errors.is_empty() {
            return Err(invalid_row(line, &errors.to_string()));
        }

        records.push(record);
    }

    Ok(records)
}

/// Inserts ingredients not yet in the catalog. Returns how many rows were inserted.
pub async fn import_ingredients(
    records: &[IngredientRecord],
    pool: &Pool<Postgres>,
) -> Result<u64, Error> {
    let mut seen = HashSet::new();
    let unique: Vec<&IngredientRecord> = records
        .iter()
        .filter(|record| seen.insert((record.name.as_str(), record.measurement_unit.as_str())))
        .collect();

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in unique.chunks(IMPORT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        query_builder.push_values(chunk, |mut b, record| {
            b.push_bind(record.name.to_owned())
                .push_bind(record.measurement_unit.to_owned());
        });
        query_builder.push(" ON CONFLICT (name, measurement_unit) DO NOTHING");

        inserted += query_builder.build().execute(&mut *tr).await?.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!(
        "Imported {inserted} ingredients ({} rows, {} unique)",
        records.len(),
        unique.len()
    );
    Ok(inserted)
}

/// Inserts tags, skipping any that clash with an existing name, color or slug.
pub async fn import_tags(records: &[TagRecord], pool: &Pool<Postgres>) -> Result<u64, Error> {
    let mut seen = HashSet::new();
    let unique: Vec<&TagRecord> = records
        .iter()
        .filter(|record| seen.insert(record.slug.as_str()))
        .collect();

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in unique.chunks(IMPORT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO tags (name, color, slug) ");
        query_builder.push_values(chunk, |mut b, record| {
            b.push_bind(record.name.to_owned())
                .push_bind(record.color.to_owned())
                .push_bind(record.slug.to_owned());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        inserted += query_builder.build().execute(&mut *tr).await?.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Imported {inserted} tags ({} rows)", records.len());
    Ok(inserted)
}

fn error_line(e: &csv::Error) -> u64 {
    e.position().map_or(0, |p| p.line())
}

fn invalid_row(line: u64, reason: &str) -> Error {
    TypeError::new(&format!("Invalid CSV row at line {line}: {reason}")).into()
}
