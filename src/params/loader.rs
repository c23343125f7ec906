//! CSV-based array loader
//!
//! Demographic and ability arrays are supplied by external collaborators as
//! small CSV files with a header row. `omega.csv`, `rho.csv` and
//! `imm_rates.csv` are `age,value` rows, `lambdas.csv` is a single `value`
//! column, and `e.csv` has an `age` column followed by one column per
//! ability type.

use crate::error::{ModelError, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::path::Path;

/// Default directory holding the parameter arrays
pub const DEFAULT_ARRAYS_PATH: &str = "data/params";

fn parse_value(field: &str, what: &str) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|_| ModelError::Parse {
        what: what.to_string(),
        value: field.to_string(),
    })
}

fn parse_index(field: &str, what: &str) -> Result<usize> {
    field.trim().parse::<usize>().map_err(|_| ModelError::Parse {
        what: what.to_string(),
        value: field.to_string(),
    })
}

/// Load an age-indexed profile (`age,value`)
/// Returns Vec<f64> indexed by age
pub fn load_age_profile(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows: Vec<(usize, f64)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let age = parse_index(&record[0], "age")?;
        let value = parse_value(&record[1], "profile value")?;
        rows.push((age, value));
    }

    let len = rows.iter().map(|(age, _)| age + 1).max().unwrap_or(0);
    if rows.len() != len {
        return Err(ModelError::dimension(&path.display().to_string(), len, rows.len()));
    }
    let mut values = vec![0.0; len];
    for (age, value) in rows {
        values[age] = value;
    }
    Ok(values)
}

/// Load the ability-productivity grid (`age,j0,j1,...`)
pub fn load_ability_grid(path: &Path) -> Result<DMatrix<f64>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = record
            .iter()
            .skip(1)
            .map(|field| parse_value(field, "ability productivity"))
            .collect::<Result<Vec<f64>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(ModelError::dimension("ability grid columns", first.len(), row.len()));
            }
        }
        rows.push(row);
    }

    let ncols = rows.first().map_or(0, |r| r.len());
    Ok(DMatrix::from_fn(rows.len(), ncols, |s, j| rows[s][j]))
}

/// Load a plain numeric vector (single `value` column)
pub fn load_vector(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result?;
        values.push(parse_value(&record[0], "value")?);
    }
    Ok(values)
}

/// Load a square matrix without an index column (e.g. a covariance matrix)
pub fn load_square_matrix(path: &Path) -> Result<DMatrix<f64>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(file);

    let mut entries = Vec::new();
    let mut nrows = 0;
    for result in reader.records() {
        let record = result?;
        for field in record.iter() {
            entries.push(parse_value(field, "matrix entry")?);
        }
        nrows += 1;
    }
    if entries.len() != nrows * nrows {
        return Err(ModelError::dimension("square matrix entries", nrows * nrows, entries.len()));
    }
    Ok(DMatrix::from_row_slice(nrows, nrows, &entries))
}

/// All arrays loaded from one directory
#[derive(Debug, Clone)]
pub struct LoadedArrays {
    pub omega: Vec<f64>,
    pub rho: Vec<f64>,
    pub imm_rates: Vec<f64>,
    pub lambdas: Vec<f64>,
    pub e: DMatrix<f64>,
}

impl LoadedArrays {
    /// Load `omega.csv`, `rho.csv`, `imm_rates.csv`, `lambdas.csv` and `e.csv`
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self {
            omega: load_age_profile(&path.join("omega.csv"))?,
            rho: load_age_profile(&path.join("rho.csv"))?,
            imm_rates: load_age_profile(&path.join("imm_rates.csv"))?,
            lambdas: load_vector(&path.join("lambdas.csv"))?,
            e: load_ability_grid(&path.join("e.csv"))?,
        })
    }
}
