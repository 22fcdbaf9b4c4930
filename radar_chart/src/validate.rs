use crate::columns::ColumnMapping;
use crate::metrics::{FieldKey, AXIS_COUNT};
use crate::table::{coerce_numeric, RawTable};
use crate::RadarError;

/// One athlete's raw metric values in axis order.
#[derive(Clone, Debug, PartialEq)]
pub struct AthleteRow {
    pub athlete_name: String,
    pub values: [f64; AXIS_COUNT],
}

/// A table that passed validation: every row has a name and five numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedTable {
    pub mapping: ColumnMapping,
    pub rows: Vec<AthleteRow>,
}

/// Check the mapped columns exist and hold usable values.
///
/// All problems are gathered before failing so a single error names every
/// offending column. A table with no rows passes; emptiness is reported by
/// the percentile engine.
pub fn validate(table: &RawTable, mapping: &ColumnMapping) -> Result<ValidatedTable, RadarError> {
    let mut problems = Vec::new();
    let mut indices = Vec::with_capacity(FieldKey::REQUIRED.len());
    for field in FieldKey::REQUIRED {
        let column = mapping.column(field);
        match table.column_index(column) {
            Some(idx) => indices.push(idx),
            None => problems.push(format!("Missing column: {column}")),
        }
    }
    if !problems.is_empty() {
        return Err(RadarError::Validation { problems });
    }

    let name_col = indices[0];
    let blank_names = table.column(name_col).filter(|c| c.is_none()).count();
    if blank_names > 0 {
        problems.push(format!(
            "Missing athlete name values in column: {} ({} of {} rows)",
            mapping.athlete_name,
            blank_names,
            table.len()
        ));
    }
    for (field, &col) in FieldKey::REQUIRED.iter().zip(&indices).skip(1) {
        let bad = table
            .column(col)
            .filter(|c| coerce_numeric(*c).is_none())
            .count();
        if bad > 0 {
            problems.push(format!(
                "Non-numeric or missing values in column: {} ({} of {} rows)",
                mapping.column(*field),
                bad,
                table.len()
            ));
        }
    }
    if !problems.is_empty() {
        return Err(RadarError::Validation { problems });
    }

    let rows = (0..table.len())
        .map(|row| {
            let mut values = [0.0; AXIS_COUNT];
            for (slot, &col) in values.iter_mut().zip(&indices[1..]) {
                *slot = coerce_numeric(table.cell(row, col)).unwrap_or_default();
            }
            AthleteRow {
                athlete_name: table.cell(row, name_col).unwrap_or_default().trim().to_string(),
                values,
            }
        })
        .collect();

    Ok(ValidatedTable {
        mapping: mapping.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::detect_mapping;

    const HEADER: &str = "Name,Jump Height (in),Peak Power / BM,RSI-modified,\
        Eccentric Peak Power / BM,Eccentric Deceleration RFD / BM";

    fn load(body: &str) -> (RawTable, ColumnMapping) {
        let table = RawTable::from_reader(format!("{HEADER}\n{body}").as_bytes()).unwrap();
        let detected = detect_mapping(&table.headers);
        let mapping = ColumnMapping::from_partial(&detected.mapping).unwrap();
        (table, mapping)
    }

    #[test]
    fn clean_table_yields_typed_rows() {
        let (table, mapping) = load("Ana,12.5,50,0.45,20,300\nBo,14,55,0.5,22,320\n");
        let validated = validate(&table, &mapping).unwrap();
        assert_eq!(validated.rows.len(), 2);
        assert_eq!(validated.rows[0].athlete_name, "Ana");
        assert_eq!(validated.rows[1].values, [14.0, 55.0, 0.5, 22.0, 320.0]);
    }

    #[test]
    fn collects_every_problem() {
        let (table, mapping) = load(",12.5,50,0.45,20,300\nBo,n/a,55,abc,22,320\n");
        let err = validate(&table, &mapping).unwrap_err();
        let RadarError::Validation { problems } = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            problems,
            vec![
                "Missing athlete name values in column: Name (1 of 2 rows)",
                "Non-numeric or missing values in column: Jump Height (in) (1 of 2 rows)",
                "Non-numeric or missing values in column: RSI-modified (1 of 2 rows)",
            ]
        );
    }

    #[test]
    fn missing_columns_reported_first() {
        let (table, mut mapping) = load("Ana,12.5,50,0.45,20,300\n");
        mapping.metrics[1] = "Power".into();
        let err = validate(&table, &mapping).unwrap_err();
        assert_eq!(err.to_string(), "validation failed: Missing column: Power");
    }

    #[test]
    fn empty_table_passes() {
        let (table, mapping) = load("");
        assert!(validate(&table, &mapping).unwrap().rows.is_empty());
    }
}
