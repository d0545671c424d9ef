//! Column statistics over a sheet's full row history
//!
//! A column is numeric only when every row's cell in it reads as a number;
//! a single empty or non-numeric cell excludes the whole column.

use crate::sheet::CellValue;

/// A numeric column with its values in row order
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub header: String,
    pub index: usize,
    pub values: Vec<f64>,
}

/// Population mean and standard deviation (divisor = row count)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// None for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Whether `value` lies at least `threshold` standard deviations from the mean
    ///
    /// A column without spread has no anomalies. The boundary is inclusive:
    /// a lone outlier among n-1 equal values sits exactly at sqrt(n-1)
    /// standard deviations, so with five rows and a threshold of 2 it only
    /// counts when equality does.
    pub fn is_anomaly(&self, value: f64, threshold: f64) -> bool {
        self.std_dev > 0.0 && (value - self.mean).abs() >= threshold * self.std_dev
    }
}

/// Columns whose every cell is numeric
///
/// With no rows there is nothing to aggregate, so no column qualifies.
pub fn numeric_columns(headers: &[String], rows: &[Vec<CellValue>]) -> Vec<NumericColumn> {
    if rows.is_empty() {
        return Vec::new();
    }

    headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            let values = rows
                .iter()
                .map(|row| row.get(index).and_then(CellValue::as_number))
                .collect::<Option<Vec<f64>>>()?;

            Some(NumericColumn {
                header: header.clone(),
                index,
                values,
            })
        })
        .collect()
}

/// Arithmetic mean per numeric column, in header order
pub fn averages(columns: &[NumericColumn]) -> Vec<(String, f64)> {
    columns
        .iter()
        .filter_map(|col| {
            ColumnStats::from_values(&col.values).map(|stats| (col.header.clone(), stats.mean))
        })
        .collect()
}

/// Every anomalous value per numeric column, in row order
///
/// Columns without anomalies are still listed, with no values.
pub fn anomalies(columns: &[NumericColumn], threshold: f64) -> Vec<(String, Vec<f64>)> {
    columns
        .iter()
        .filter_map(|col| {
            let stats = ColumnStats::from_values(&col.values)?;
            let flagged = col
                .values
                .iter()
                .copied()
                .filter(|&x| stats.is_anomaly(x, threshold))
                .collect();
            Some((col.header.clone(), flagged))
        })
        .collect()
}

/// Test only the most recent row of each numeric column
///
/// Returns `"{header} ({value})"` for every column whose last value is anomalous.
pub fn quick_anomalies(columns: &[NumericColumn], threshold: f64) -> Vec<String> {
    columns
        .iter()
        .filter_map(|col| {
            let stats = ColumnStats::from_values(&col.values)?;
            let last = *col.values.last()?;
            stats
                .is_anomaly(last, threshold)
                .then(|| format!("{} ({})", col.header, last))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn column(values: &[f64]) -> NumericColumn {
        NumericColumn {
            header: "score".to_string(),
            index: 0,
            values: values.to_vec(),
        }
    }

    fn rows_of(values: &[&[CellValue]]) -> Vec<Vec<CellValue>> {
        values.iter().map(|row| row.to_vec()).collect()
    }

    #[test]
    fn test_population_stats() {
        let stats = ColumnStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
        assert!(ColumnStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_single_outlier_is_flagged() {
        let found = anomalies(&[column(&[1.0, 1.0, 1.0, 1.0, 100.0])], 2.0);
        assert_eq!(found, vec![("score".to_string(), vec![100.0])]);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // mean 2, std dev 2: both values sit exactly one deviation out
        let found = anomalies(&[column(&[0.0, 4.0])], 1.0);
        assert_eq!(found[0].1, vec![0.0, 4.0]);

        let found = anomalies(&[column(&[0.0, 4.0])], 1.0001);
        assert_eq!(found[0].1, Vec::<f64>::new());
    }

    #[test]
    fn test_evenly_spread_values_are_not_flagged() {
        let found = anomalies(&[column(&[1.0, 2.0, 3.0, 4.0, 5.0])], 2.0);
        assert_eq!(found, vec![("score".to_string(), vec![])]);
    }

    #[test]
    fn test_constant_column_has_no_anomalies() {
        let found = anomalies(&[column(&[3.0, 3.0, 3.0])], 2.0);
        assert_eq!(found[0].1, Vec::<f64>::new());
        assert!(quick_anomalies(&[column(&[3.0, 3.0, 3.0])], 2.0).is_empty());
    }

    #[test]
    fn test_numeric_detection_is_all_or_nothing() {
        let h = headers(&["age", "name", "score", "sparse"]);
        let rows = rows_of(&[
            &[
                CellValue::Number(30.0),
                CellValue::Text("Ann".into()),
                CellValue::Text("4.5".into()),
                CellValue::Number(1.0),
            ],
            &[
                CellValue::Number(40.0),
                CellValue::Text("12".into()),
                CellValue::Text(" 5.5 ".into()),
                CellValue::Empty,
            ],
        ]);

        let numeric = numeric_columns(&h, &rows);
        let names: Vec<&str> = numeric.iter().map(|c| c.header.as_str()).collect();

        assert_eq!(names, vec!["age", "score"]);
        assert_eq!(numeric[1].index, 2);
        assert_eq!(numeric[1].values, vec![4.5, 5.5]);
    }

    #[test]
    fn test_no_rows_means_no_numeric_columns() {
        assert!(numeric_columns(&headers(&["a"]), &[]).is_empty());
    }

    #[test]
    fn test_averages() {
        let cols = vec![
            NumericColumn {
                header: "a".into(),
                index: 0,
                values: vec![1.0, 2.0, 3.0],
            },
            NumericColumn {
                header: "b".into(),
                index: 1,
                values: vec![10.0, 20.0, 30.0],
            },
        ];

        assert_eq!(
            averages(&cols),
            vec![("a".to_string(), 2.0), ("b".to_string(), 20.0)]
        );
    }

    #[test]
    fn test_quick_anomalies_check_last_value_only() {
        let outlier_last = column(&[1.0, 1.0, 1.0, 1.0, 100.0]);
        let outlier_first = column(&[100.0, 1.0, 1.0, 1.0, 1.0]);

        assert_eq!(
            quick_anomalies(&[outlier_last], 2.0),
            vec!["score (100)".to_string()]
        );
        assert!(quick_anomalies(&[outlier_first], 2.0).is_empty());
    }
}
