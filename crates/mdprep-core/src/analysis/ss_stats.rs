use crate::core::models::matrix::{LegendEntry, StructureMatrix};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, instrument};

pub const OTHER_LABEL: &str = "other";
pub const OTHER_COLOR: &str = "black";

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Column {column} has no x-axis tick")]
    MissingTick { column: usize },
    #[error("Tick '{value}' of column {column} is not a numeric time")]
    InvalidTick { column: usize, value: String },
    #[error("Unknown secondary-structure category '{0}'")]
    UnknownCategory(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A legend code that was kept, or the synthetic bucket for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Code(char),
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Code(c) => write!(f, "{}", c),
            Category::Other => f.write_str(OTHER_LABEL),
        }
    }
}

fn parse_time(column: usize, tick: &str) -> Result<i64, StatsError> {
    if let Ok(t) = tick.parse::<i64>() {
        return Ok(t);
    }
    match tick.parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(t.trunc() as i64),
        _ => Err(StatsError::InvalidTick {
            column,
            value: tick.to_string(),
        }),
    }
}

/// Per-time-bucket tallies of secondary-structure codes.
#[derive(Debug, Clone, Default)]
pub struct SsStats {
    counts: BTreeMap<i64, BTreeMap<char, usize>>,
    legend: BTreeMap<char, LegendEntry>,
}

impl SsStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<I: IntoIterator<Item = char>>(&mut self, time: i64, codes: I) {
        let bucket = self.counts.entry(time).or_default();
        for code in codes {
            *bucket.entry(code).or_insert(0) += 1;
        }
    }

    /// Adds every column of `matrix` to the bucket named by its x tick and
    /// merges the matrix legend.
    #[instrument(skip_all, fields(cols = matrix.cols(), rows = matrix.rows()))]
    pub fn absorb(&mut self, matrix: &StructureMatrix) -> Result<(), StatsError> {
        for col in matrix.column_indices() {
            let tick = matrix
                .xtick(col)
                .ok_or(StatsError::MissingTick { column: col })?;
            let time = parse_time(col, tick)?;
            if let Some(codes) = matrix.column(col) {
                self.update(time, codes);
            }
        }
        self.legend
            .extend(matrix.legend().iter().map(|(c, e)| (*c, e.clone())));
        debug!("{} time buckets after absorbing matrix", self.counts.len());
        Ok(())
    }

    pub fn counts(&self) -> &BTreeMap<i64, BTreeMap<char, usize>> {
        &self.counts
    }

    pub fn legend(&self) -> &BTreeMap<char, LegendEntry> {
        &self.legend
    }

    /// Resolves legend category names (e.g. `B-Sheet`) to their codes.
    pub fn codes_for_names<I, S>(&self, names: I) -> Result<BTreeSet<char>, StatsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.legend
                    .iter()
                    .find(|(_, e)| e.name == name)
                    .map(|(c, _)| *c)
                    .ok_or_else(|| StatsError::UnknownCategory(name.to_string()))
            })
            .collect()
    }

    /// Folds every code outside `keep` into [`Category::Other`].
    pub fn collapse(&self, keep: &BTreeSet<char>) -> CollapsedStats {
        let buckets = self
            .counts
            .iter()
            .map(|(time, info)| {
                let mut bucket: BTreeMap<Category, usize> = BTreeMap::new();
                for (code, count) in info {
                    let category = if keep.contains(code) {
                        Category::Code(*code)
                    } else {
                        Category::Other
                    };
                    *bucket.entry(category).or_insert(0) += count;
                }
                (*time, bucket)
            })
            .collect();

        let mut legend: BTreeMap<Category, LegendEntry> = self
            .legend
            .iter()
            .filter(|(c, _)| keep.contains(c))
            .map(|(c, e)| (Category::Code(*c), e.clone()))
            .collect();
        legend.insert(Category::Other, LegendEntry::new(OTHER_COLOR, OTHER_LABEL));

        CollapsedStats { buckets, legend }
    }
}

/// Tallies after collapsing unkept codes into `other`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedStats {
    buckets: BTreeMap<i64, BTreeMap<Category, usize>>,
    legend: BTreeMap<Category, LegendEntry>,
}

impl CollapsedStats {
    pub fn buckets(&self) -> &BTreeMap<i64, BTreeMap<Category, usize>> {
        &self.buckets
    }

    pub fn legend(&self) -> &BTreeMap<Category, LegendEntry> {
        &self.legend
    }

    /// Every category that occurs in at least one bucket.
    pub fn categories(&self) -> BTreeSet<Category> {
        self.buckets
            .values()
            .flat_map(|b| b.keys().copied())
            .collect()
    }

    /// Human-readable name of a category, falling back to the raw code.
    pub fn label(&self, category: Category) -> String {
        self.legend
            .get(&category)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| category.to_string())
    }

    pub fn totals(&self) -> BTreeMap<i64, usize> {
        self.buckets
            .iter()
            .map(|(t, b)| (*t, b.values().sum()))
            .collect()
    }

    pub fn percentages(&self) -> BTreeMap<i64, BTreeMap<Category, f64>> {
        self.buckets
            .iter()
            .map(|(t, b)| {
                let total: usize = b.values().sum();
                let perc = b
                    .iter()
                    .map(|(c, n)| (*c, 100.0 * *n as f64 / total as f64))
                    .collect();
                (*t, perc)
            })
            .collect()
    }

    /// Writes one row per time bucket: time, total count, then the percentage
    /// of each category.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), StatsError> {
        let categories: Vec<Category> = self.categories().into_iter().collect();
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = vec!["time".to_string(), "total".to_string()];
        header.extend(categories.iter().map(|c| self.label(*c)));
        csv.write_record(&header)?;

        let totals = self.totals();
        for (time, perc) in self.percentages() {
            let mut record = vec![time.to_string(), totals[&time].to_string()];
            record.extend(
                categories
                    .iter()
                    .map(|c| format!("{:.2}", perc.get(c).copied().unwrap_or(0.0))),
            );
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::matrix::AxisName;

    fn matrix() -> StructureMatrix {
        let mut m = StructureMatrix::new(3, 2);
        m.set_row(0, "ABC").unwrap();
        m.set_row(1, "ACC").unwrap();
        m.axis_mut(AxisName::X).extend(["0", "0", "10"]).unwrap();
        m.insert_legend('A', LegendEntry::new("#FF0000", "A-Helix"));
        m.insert_legend('B', LegendEntry::new("#00FF00", "B-Sheet"));
        m.insert_legend('C', LegendEntry::new("#FFFFFF", "Coil"));
        m
    }

    #[test]
    fn absorb_groups_columns_by_time() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        let counts = stats.counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&0][&'A'], 2);
        assert_eq!(counts[&0][&'B'], 1);
        assert_eq!(counts[&0][&'C'], 1);
        assert_eq!(counts[&10][&'C'], 2);
        assert_eq!(stats.legend().len(), 3);
    }

    #[test]
    fn absorb_accumulates_across_matrices() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        stats.absorb(&matrix()).unwrap();
        assert_eq!(stats.counts()[&0][&'A'], 4);
    }

    #[test]
    fn collapse_folds_unkept_codes_into_other() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        let keep = BTreeSet::from(['A']);
        let collapsed = stats.collapse(&keep);

        let bucket = &collapsed.buckets()[&0];
        assert_eq!(bucket[&Category::Code('A')], 2);
        assert_eq!(bucket[&Category::Other], 2);
        assert_eq!(bucket.len(), 2);
        assert_eq!(collapsed.buckets()[&10][&Category::Other], 2);

        let other = &collapsed.legend()[&Category::Other];
        assert_eq!(other.color, OTHER_COLOR);
        assert_eq!(other.name, OTHER_LABEL);
        assert_eq!(collapsed.label(Category::Code('A')), "A-Helix");
    }

    #[test]
    fn percentages_and_totals_per_bucket() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        let collapsed = stats.collapse(&BTreeSet::from(['A']));
        assert_eq!(collapsed.totals()[&0], 4);
        let perc = collapsed.percentages();
        assert_eq!(perc[&0][&Category::Code('A')], 50.0);
        assert_eq!(perc[&10][&Category::Other], 100.0);
    }

    #[test]
    fn codes_for_names_resolves_legend() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        assert_eq!(
            stats.codes_for_names(["B-Sheet", "Coil"]).unwrap(),
            BTreeSet::from(['B', 'C'])
        );
        assert!(matches!(
            stats.codes_for_names(["Turn"]),
            Err(StatsError::UnknownCategory(_))
        ));
    }

    #[test]
    fn missing_or_bad_ticks_fail() {
        let mut m = StructureMatrix::new(1, 1);
        m.set_row(0, "A").unwrap();
        assert!(matches!(
            SsStats::new().absorb(&m),
            Err(StatsError::MissingTick { column: 0 })
        ));
        m.axis_mut(AxisName::X).extend(["t0"]).unwrap();
        assert!(matches!(
            SsStats::new().absorb(&m),
            Err(StatsError::InvalidTick { .. })
        ));
    }

    #[test]
    fn fractional_ticks_truncate() {
        assert_eq!(parse_time(0, "12.9").unwrap(), 12);
        assert_eq!(parse_time(0, "-3").unwrap(), -3);
    }

    #[test]
    fn csv_has_one_row_per_bucket() {
        let mut stats = SsStats::new();
        stats.absorb(&matrix()).unwrap();
        let mut out = Vec::new();
        stats
            .collapse(&BTreeSet::from(['A']))
            .write_csv(&mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "time,total,A-Helix,other\n0,4,50.00,50.00\n10,2,0.00,100.00\n"
        );
    }
}
